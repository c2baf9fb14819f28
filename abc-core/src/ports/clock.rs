// abc-core/src/ports/clock.rs

use chrono::{DateTime, Utc};

/// Wall clock, injectable so manifest timestamps are testable.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}
