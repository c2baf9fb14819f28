// abc-core/src/application/golden/mod.rs
//
// Golden tests: recorded expected-output trees under
// <template>/testdata/golden/<test_name>/, each with a test.yaml pinning
// inputs and builtins so renders are deterministic.

pub mod record;
pub mod verify;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::AbcError;
use crate::application::render::{RenderParams, render};
use crate::domain::api::GoldenTest;
use crate::domain::features::Features;
use crate::infrastructure::adapters::LocalDownloader;
use crate::infrastructure::decode;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs as afs;
use crate::ports::{Clock, GitProtocol};

pub const TESTDATA_GOLDEN: &str = "testdata/golden";
pub const DATA_DIR: &str = "data";
pub const ABC_INTERNAL_DIR: &str = ".abc";
pub const STDOUT_FILE: &str = ".abc/stdout";
pub const RENAME_SUFFIX: &str = ".abc_renamed";
pub const GITKEEP: &str = ".gitkeep";
pub const TEST_YAML: &str = "test.yaml";
pub const SPEC_YAML: &str = "spec.yaml";

#[derive(Debug)]
pub struct TestCase {
    pub name: String,
    /// `<template>/testdata/golden/<name>`.
    pub dir: PathBuf,
    pub test: GoldenTest,
}

/// Enumerates the test cases of one template, optionally filtered by
/// name. Non-directory entries under testdata/golden/ are errors.
pub fn list_test_cases(
    template_dir: &Path,
    filter: &[String],
    is_release_build: bool,
) -> Result<Vec<TestCase>, AbcError> {
    let golden_dir = template_dir.join(TESTDATA_GOLDEN);
    if !golden_dir.is_dir() {
        return Err(InfrastructureError::ConfigError(format!(
            "no golden tests found: {} does not exist",
            golden_dir.display()
        ))
        .into());
    }

    let mut cases = Vec::new();
    let mut entries: Vec<_> = std::fs::read_dir(&golden_dir)
        .map_err(AbcError::from)?
        .collect::<Result<_, _>>()
        .map_err(AbcError::from)?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        if !entry.path().is_dir() {
            return Err(InfrastructureError::ConfigError(format!(
                "unexpected file {} in golden test directory; only test directories may live here",
                entry.path().display()
            ))
            .into());
        }
        if !filter.is_empty() && !filter.contains(&name) {
            continue;
        }
        let test = decode::load_golden_test(&entry.path().join(TEST_YAML), is_release_build)?;
        cases.push(TestCase {
            name,
            dir: entry.path(),
            test,
        });
    }

    if !filter.is_empty() {
        for wanted in filter {
            if !cases.iter().any(|c| &c.name == wanted) {
                return Err(InfrastructureError::ConfigError(format!(
                    "no such test case {:?} under {}",
                    wanted,
                    golden_dir.display()
                ))
                .into());
            }
        }
    }
    Ok(cases)
}

/// Finds every template under `location`: a directory containing both a
/// spec.yaml and testdata/golden/. Found templates are not recursed into
/// (no templates within templates).
pub fn find_templates(location: &Path) -> Result<Vec<PathBuf>, AbcError> {
    if is_template(location) {
        return Ok(vec![location.to_path_buf()]);
    }

    let mut templates = Vec::new();
    let mut it = WalkDir::new(location)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();
    while let Some(entry) = it.next() {
        let entry = entry.map_err(|e| {
            InfrastructureError::ConfigError(format!("walking {}: {}", location.display(), e))
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if is_template(entry.path()) {
            templates.push(entry.path().to_path_buf());
            it.skip_current_dir();
        }
    }
    if templates.is_empty() {
        return Err(InfrastructureError::ConfigError(format!(
            "no templates with golden tests found under {}",
            location.display()
        ))
        .into());
    }
    Ok(templates)
}

fn is_template(dir: &Path) -> bool {
    dir.join(SPEC_YAML).is_file() && dir.join(TESTDATA_GOLDEN).is_dir()
}

/// Renders one test case into `out_dir` with the exact same logic that
/// `abc render` uses, capturing printed output.
pub(crate) fn render_test(
    template_dir: &Path,
    case: &TestCase,
    out_dir: &Path,
    clock: &dyn Clock,
    is_release_build: bool,
) -> Result<Vec<u8>, AbcError> {
    let inputs: BTreeMap<String, String> = case
        .test
        .inputs
        .iter()
        .map(|v| (v.name.value.clone(), v.value.value.clone()))
        .collect();

    let mut stdout = Vec::new();
    render(RenderParams {
        cwd: template_dir,
        source: &template_dir.display().to_string(),
        dest: out_dir,
        spec_rel: SPEC_YAML,
        flag_inputs: inputs,
        input_files: Vec::new(),
        builtin_overrides: case.test.builtin_vars.clone(),
        force_overwrite: true,
        keep_temp_dirs: false,
        skip_input_validation: false,
        prompt: false,
        accept_defaults: true,
        upgrade_channel: String::new(),
        git_protocol: GitProtocol::Https,
        allow_non_git_dest: true,
        debug_scratch_contents: false,
        debug_step_diffs: false,
        write_manifest: false,
        is_release_build,
        downloader: &LocalDownloader,
        prompter: None,
        clock,
        stdout: &mut stdout,
    })?;
    Ok(stdout)
}

/// Applies the recording transforms to a rendered tree: capture stdout
/// under .abc/stdout, rename files git would treat specially, and keep
/// the .abc dir visible to git.
pub(crate) fn transform_output(
    out_dir: &Path,
    stdout: &[u8],
    features: &Features,
) -> Result<(), AbcError> {
    if !features.skip_abc_renamed {
        rename_git_files(out_dir)?;
    }

    if !features.skip_stdout && !stdout.is_empty() {
        let abc_dir = out_dir.join(ABC_INTERNAL_DIR);
        afs::ensure_dir(&abc_dir)?;
        afs::write_file(&out_dir.join(STDOUT_FILE), stdout, None)?;
        afs::write_file(&abc_dir.join(GITKEEP), b"", None)?;
    }
    Ok(())
}

/// Files named `.git*` confuse the host git when committed as test data;
/// they are recorded with a suffix instead.
fn rename_git_files(out_dir: &Path) -> Result<(), AbcError> {
    let mut renames = Vec::new();
    for entry in WalkDir::new(out_dir).follow_links(false) {
        let entry =
            entry.map_err(|e| AbcError::InternalError(format!("walking output: {}", e)))?;
        let name = entry.file_name().to_string_lossy();
        if name.starts_with(".git") && !name.ends_with(RENAME_SUFFIX) {
            renames.push(entry.path().to_path_buf());
        }
    }
    // Deepest first so directory renames do not invalidate child paths.
    renames.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
    for path in renames {
        let Some(name) = path.file_name() else {
            continue;
        };
        let new_path = path.with_file_name(format!("{}{}", name.to_string_lossy(), RENAME_SUFFIX));
        debug!(from = %path.display(), to = %new_path.display(), "renaming git-colliding file");
        std::fs::rename(&path, &new_path).map_err(AbcError::from)?;
    }
    Ok(())
}

/// Sorted dest-relative files of a recorded/rendered tree, `.gitkeep`
/// markers excluded.
pub(crate) fn tree_files(root: &Path) -> Result<Vec<String>, AbcError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry =
            entry.map_err(|e| AbcError::InternalError(format!("walking {}: {}", root.display(), e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| AbcError::InternalError(e.to_string()))?
            .to_string_lossy()
            .to_string();
        if rel.ends_with(GITKEEP) {
            continue;
        }
        files.push(rel);
    }
    Ok(files)
}

/// Aggregates per-case failures: every case runs even when earlier ones
/// fail; the combined error reports them all.
pub(crate) fn aggregate(failures: Vec<(String, String)>) -> Result<(), AbcError> {
    if failures.is_empty() {
        return Ok(());
    }
    let combined = failures
        .into_iter()
        .map(|(name, problem)| format!("[{}]\n{}", name, problem))
        .collect::<Vec<_>>()
        .join("\n\n");
    Err(AbcError::GoldenTestMismatch(combined))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testutil {
    use super::*;
    use std::fs;

    pub const GREETING_SPEC: &str = r#"
api_version: 'abc.dev/v1'
kind: 'Template'
desc: 'greeting'
inputs:
  - name: 'person_name'
    desc: 'who'
steps:
  - desc: 'include files'
    action: 'include'
    params:
      paths:
        - paths: ['file.txt']
  - desc: 'expand'
    action: 'go_template'
    params:
      paths: ['file.txt']
  - desc: 'greet'
    action: 'print'
    params:
      message: 'Hello, {{.person_name}}!'
"#;

    pub const GREETING_TEST: &str = r#"
api_version: 'abc.dev/v1'
kind: 'GoldenTest'
inputs:
  - name: 'person_name'
    value: 'Bob'
"#;

    /// Builds a template with one golden test (not yet recorded).
    pub fn greeting_template(root: &Path) {
        fs::write(root.join(SPEC_YAML), GREETING_SPEC).unwrap();
        fs::write(root.join("file.txt"), "greeting for {{.person_name}}\n").unwrap();
        let case_dir = root.join(TESTDATA_GOLDEN).join("basic");
        fs::create_dir_all(&case_dir).unwrap();
        fs::write(case_dir.join(TEST_YAML), GREETING_TEST).unwrap();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_list_test_cases_and_filter() {
        let dir = tempdir().unwrap();
        testutil::greeting_template(dir.path());
        let more = dir.path().join(TESTDATA_GOLDEN).join("another");
        fs::create_dir_all(&more).unwrap();
        fs::write(more.join(TEST_YAML), testutil::GREETING_TEST).unwrap();

        let all = list_test_cases(dir.path(), &[], true).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "another");

        let filtered = list_test_cases(dir.path(), &["basic".to_string()], true).unwrap();
        assert_eq!(filtered.len(), 1);

        let err = list_test_cases(dir.path(), &["nope".to_string()], true).unwrap_err();
        assert!(err.to_string().contains("no such test case"));
    }

    #[test]
    fn test_stray_file_in_golden_dir_is_an_error() {
        let dir = tempdir().unwrap();
        testutil::greeting_template(dir.path());
        fs::write(dir.path().join(TESTDATA_GOLDEN).join("stray.txt"), "x").unwrap();
        let err = list_test_cases(dir.path(), &[], true).unwrap_err();
        assert!(err.to_string().contains("unexpected file"));
    }

    #[test]
    fn test_find_templates_crawls_without_nesting() {
        let root = tempdir().unwrap();
        let t1 = root.path().join("group/t1");
        fs::create_dir_all(&t1).unwrap();
        testutil::greeting_template(&t1);

        // A template nested under another template is not discovered.
        let nested = t1.join("inner");
        fs::create_dir_all(&nested).unwrap();
        testutil::greeting_template(&nested);

        let t2 = root.path().join("t2");
        fs::create_dir_all(&t2).unwrap();
        testutil::greeting_template(&t2);

        let found = find_templates(root.path()).unwrap();
        assert_eq!(found, vec![t1, t2]);
    }

    #[test]
    fn test_transform_renames_git_files() {
        let out = tempdir().unwrap();
        fs::write(out.path().join(".gitignore"), "target\n").unwrap();
        fs::write(out.path().join("normal.txt"), "x").unwrap();

        transform_output(out.path(), b"", &Features::default()).unwrap();
        assert!(out.path().join(".gitignore.abc_renamed").is_file());
        assert!(!out.path().join(".gitignore").exists());
        assert!(out.path().join("normal.txt").is_file());

        // Under skip_abc_renamed the name is left alone.
        let out2 = tempdir().unwrap();
        fs::write(out2.path().join(".gitignore"), "target\n").unwrap();
        let features = Features {
            skip_abc_renamed: true,
            ..Default::default()
        };
        transform_output(out2.path(), b"", &features).unwrap();
        assert!(out2.path().join(".gitignore").is_file());
    }

    #[test]
    fn test_transform_stdout_capture_respects_feature() {
        let out = tempdir().unwrap();
        transform_output(out.path(), b"printed\n", &Features::default()).unwrap();
        assert_eq!(
            fs::read_to_string(out.path().join(STDOUT_FILE)).unwrap(),
            "printed\n"
        );

        let out2 = tempdir().unwrap();
        let features = Features {
            skip_stdout: true,
            ..Default::default()
        };
        transform_output(out2.path(), b"printed\n", &features).unwrap();
        assert!(!out2.path().join(ABC_INTERNAL_DIR).exists());
    }
}
