// abc-core/src/application/golden/record.rs

use std::path::Path;
use tracing::info;

use crate::AbcError;
use crate::application::golden::{
    DATA_DIR, TestCase, aggregate, find_templates, list_test_cases, render_test, transform_output,
};
use crate::infrastructure::fs::{self as afs, DirTracker};
use crate::ports::Clock;

pub struct RecordParams<'a> {
    pub location: &'a Path,
    pub test_names: &'a [String],
    pub is_release_build: bool,
    pub clock: &'a dyn Clock,
}

/// Renders every selected test case and replaces its recorded `data/`
/// tree with the fresh output. Failures do not stop the remaining cases.
pub fn record(params: &RecordParams<'_>) -> Result<(), AbcError> {
    let mut failures = Vec::new();
    for template_dir in find_templates(params.location)? {
        let cases = list_test_cases(&template_dir, params.test_names, params.is_release_build)?;
        for case in cases {
            let label = format!("{}:{}", template_dir.display(), case.name);
            match record_one(&template_dir, &case, params) {
                Ok(()) => println!("✅ recorded {}", label),
                Err(e) => failures.push((label, e.to_string())),
            }
        }
    }
    aggregate(failures)
}

fn record_one(
    template_dir: &Path,
    case: &TestCase,
    params: &RecordParams<'_>,
) -> Result<(), AbcError> {
    let mut tracker = DirTracker::new(false);
    let out_dir = tracker.track("abc-golden-record-")?;

    let stdout = render_test(
        template_dir,
        case,
        &out_dir,
        params.clock,
        params.is_release_build,
    )?;
    transform_output(&out_dir, &stdout, &case.test.features)?;

    // Swap the recorded tree only after the render fully succeeded.
    let data_dir = case.dir.join(DATA_DIR);
    if data_dir.exists() {
        std::fs::remove_dir_all(&data_dir).map_err(AbcError::from)?;
    }
    copy_tree(&out_dir, &data_dir)?;
    info!(test = %case.name, "golden data replaced");
    Ok(())
}

pub(crate) fn copy_tree(src: &Path, dst: &Path) -> Result<(), AbcError> {
    afs::ensure_dir(dst)?;
    for entry in walkdir::WalkDir::new(src).follow_links(false) {
        let entry =
            entry.map_err(|e| AbcError::InternalError(format!("walking {}: {}", src.display(), e)))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| AbcError::InternalError(e.to_string()))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let dst_path = dst.join(rel);
        if entry.file_type().is_dir() {
            afs::ensure_dir(&dst_path)?;
        } else {
            afs::copy_file_preserving_mode(entry.path(), &dst_path)?;
        }
    }
    Ok(())
}
