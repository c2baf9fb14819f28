// abc-core/src/application/golden/verify.rs

use std::path::Path;

use crate::AbcError;
use crate::application::golden::{
    DATA_DIR, STDOUT_FILE, TestCase, aggregate, find_templates, list_test_cases, render_test,
    transform_output, tree_files,
};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::exec::unified_diff;
use crate::infrastructure::fs::DirTracker;
use crate::ports::Clock;

pub struct VerifyParams<'a> {
    pub location: &'a Path,
    pub test_names: &'a [String],
    pub is_release_build: bool,
    pub clock: &'a dyn Clock,
}

/// Re-renders every selected test case into a sandbox and compares it to
/// the recorded tree. A failing case does not abort the remaining cases;
/// the combined report fails the command.
pub fn verify(params: &VerifyParams<'_>) -> Result<(), AbcError> {
    let mut failures = Vec::new();
    for template_dir in find_templates(params.location)? {
        let cases = list_test_cases(&template_dir, params.test_names, params.is_release_build)?;
        for case in cases {
            let label = format!("{}:{}", template_dir.display(), case.name);
            match verify_one(&template_dir, &case, params) {
                Ok(problems) if problems.is_empty() => println!("✅ verified {}", label),
                Ok(problems) => failures.push((label, problems.join("\n"))),
                Err(e) => failures.push((label, e.to_string())),
            }
        }
    }
    aggregate(failures)
}

fn verify_one(
    template_dir: &Path,
    case: &TestCase,
    params: &VerifyParams<'_>,
) -> Result<Vec<String>, AbcError> {
    let recorded = case.dir.join(DATA_DIR);
    if !recorded.is_dir() {
        return Err(InfrastructureError::ConfigError(format!(
            "test {:?} has no recorded data; run `abc golden-test record` first",
            case.name
        ))
        .into());
    }

    let mut tracker = DirTracker::new(false);
    let sandbox = tracker.track("abc-golden-verify-")?;
    let stdout = render_test(
        template_dir,
        case,
        &sandbox,
        params.clock,
        params.is_release_build,
    )?;
    transform_output(&sandbox, &stdout, &case.test.features)?;

    compare_trees(&recorded, &sandbox)
}

/// Compares the recorded tree (a) against the fresh render (b).
fn compare_trees(recorded: &Path, actual: &Path) -> Result<Vec<String>, AbcError> {
    let recorded_files = tree_files(recorded)?;
    let actual_files = tree_files(actual)?;

    let mut all: Vec<&String> = recorded_files.iter().chain(actual_files.iter()).collect();
    all.sort();
    all.dedup();

    let mut problems = Vec::new();
    for rel in all {
        let in_recorded = recorded_files.contains(rel);
        let in_actual = actual_files.contains(rel);

        if rel == STDOUT_FILE {
            let old = in_recorded.then(|| recorded.join(rel));
            let new = in_actual.then(|| actual.join(rel));
            let diff = unified_diff(old.as_deref(), new.as_deref(), rel, false)?;
            if !diff.is_empty() {
                problems.push(format!(
                    "the printed messages differ between the recorded golden output and the actual output\n{}",
                    diff
                ));
            }
            continue;
        }

        match (in_recorded, in_actual) {
            // The render produced a file the recording does not know.
            (false, true) => {
                problems.push(format!("[{}] expected, however missing", rel));
            }
            // The recording names a file the render did not produce.
            (true, false) => {
                problems.push(format!("[{}] generated, however not recorded in test data", rel));
            }
            (true, true) => {
                let diff = unified_diff(
                    Some(&recorded.join(rel)),
                    Some(&actual.join(rel)),
                    rel,
                    false,
                )?;
                if !diff.is_empty() {
                    problems.push(format!("[{}] file content mismatch\n{}", rel, diff));
                }
            }
            (false, false) => {}
        }
    }
    Ok(problems)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::golden::record::{RecordParams, record};
    use crate::application::golden::testutil::greeting_template;
    use crate::application::golden::TESTDATA_GOLDEN;
    use crate::infrastructure::adapters::FixedClock;
    use chrono::TimeZone;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn clock() -> FixedClock {
        FixedClock(chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn recorded_template() -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        greeting_template(dir.path());
        let clock = clock();
        record(&RecordParams {
            location: dir.path(),
            test_names: &[],
            is_release_build: true,
            clock: &clock,
        })
        .unwrap();
        let data = dir.path().join(TESTDATA_GOLDEN).join("basic").join("data");
        (dir, data)
    }

    fn run_verify(location: &Path) -> Result<(), AbcError> {
        let clock = clock();
        verify(&VerifyParams {
            location,
            test_names: &[],
            is_release_build: true,
            clock: &clock,
        })
    }

    #[test]
    fn test_record_then_verify_round_trips() {
        let (dir, _) = recorded_template();
        run_verify(dir.path()).unwrap();
    }

    #[test]
    fn test_mutated_file_reports_content_mismatch() {
        let (dir, data) = recorded_template();
        let mut content = fs::read_to_string(data.join("file.txt")).unwrap();
        content.push('\n');
        fs::write(data.join("file.txt"), content).unwrap();

        let err = run_verify(dir.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("[file.txt] file content mismatch"), "{}", msg);
        assert!(msg.contains("--- a/file.txt"), "{}", msg);
    }

    #[test]
    fn test_deleted_recorded_file_reports_expected_missing() {
        let (dir, data) = recorded_template();
        fs::remove_file(data.join("file.txt")).unwrap();

        let err = run_verify(dir.path()).unwrap_err();
        assert!(err.to_string().contains("[file.txt] expected, however missing"));
    }

    #[test]
    fn test_extraneous_recorded_file_reports_not_generated() {
        let (dir, data) = recorded_template();
        fs::write(data.join("extra.txt"), "surprise").unwrap();

        let err = run_verify(dir.path()).unwrap_err();
        assert!(
            err.to_string()
                .contains("[extra.txt] generated, however not recorded in test data")
        );
    }

    #[test]
    fn test_stdout_mismatch_has_dedicated_message() {
        let (dir, data) = recorded_template();
        fs::write(data.join(STDOUT_FILE), "Hello, Mallory!\n").unwrap();

        let err = run_verify(dir.path()).unwrap_err();
        assert!(
            err.to_string()
                .contains("the printed messages differ between the recorded golden output and the actual output")
        );
    }
}
