// abc-core/src/ports/mod.rs

pub mod clock;
pub mod downloader;
pub mod prompter;

pub use clock::Clock;
pub use downloader::{DownloadMeta, DownloadRequest, Downloader, GitProtocol};
pub use prompter::Prompter;
