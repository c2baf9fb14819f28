// abc/tests/golden_tests.rs
//
// Golden-test lifecycle against the real binary: new-test, record,
// verify, and the mismatch reports.

use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

struct GoldenEnv {
    _tmp: TempDir,
    template: PathBuf,
}

impl GoldenEnv {
    fn new() -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let template = tmp.path().join("template");
        fs::create_dir_all(&template)?;
        fs::write(
            template.join("spec.yaml"),
            r#"
api_version: 'abc.dev/v1'
kind: 'Template'
desc: 'greeting'
inputs:
  - name: 'person_name'
    desc: 'who'
steps:
  - desc: 'include the file'
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
"#,
        )?;
        fs::write(template.join("file.txt"), "greeting for {{.person_name}}\n")?;
        Ok(Self {
            _tmp: tmp,
            template,
        })
    }

    fn with_test(self) -> Result<Self> {
        let case = self.template.join("testdata/golden/basic");
        fs::create_dir_all(&case)?;
        fs::write(
            case.join("test.yaml"),
            r#"
api_version: 'abc.dev/v1'
kind: 'GoldenTest'
inputs:
  - name: 'person_name'
    value: 'Bob'
"#,
        )?;
        Ok(self)
    }

    fn abc(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("abc"));
        cmd.arg("golden-test").arg(subcommand).arg(&self.template);
        cmd
    }

    fn data(&self) -> PathBuf {
        self.template.join("testdata/golden/basic/data")
    }
}

#[test]
fn test_record_then_verify_succeeds() -> Result<()> {
    let env = GoldenEnv::new()?.with_test()?;
    env.abc("record").assert().success();

    assert_eq!(
        fs::read_to_string(env.data().join("file.txt"))?,
        "greeting for Bob\n"
    );
    assert_eq!(
        fs::read_to_string(env.data().join(".abc/stdout"))?,
        "Hello, Bob!\n"
    );

    env.abc("verify").assert().success();
    Ok(())
}

#[test]
fn test_verify_reports_content_mismatch() -> Result<()> {
    let env = GoldenEnv::new()?.with_test()?;
    env.abc("record").assert().success();

    let recorded = env.data().join("file.txt");
    let mut content = fs::read_to_string(&recorded)?;
    content.push('\n');
    fs::write(&recorded, content)?;

    env.abc("verify")
        .assert()
        .failure()
        .stderr(predicate::str::contains("[file.txt] file content mismatch"))
        .stderr(predicate::str::contains("a/file.txt"));
    Ok(())
}

#[test]
fn test_verify_reports_deleted_and_extraneous_files() -> Result<()> {
    let env = GoldenEnv::new()?.with_test()?;
    env.abc("record").assert().success();

    fs::remove_file(env.data().join("file.txt"))?;
    env.abc("verify")
        .assert()
        .failure()
        .stderr(predicate::str::contains("[file.txt] expected, however missing"));

    env.abc("record").assert().success();
    fs::write(env.data().join("extra.txt"), "surprise")?;
    env.abc("verify").assert().failure().stderr(predicate::str::contains(
        "[extra.txt] generated, however not recorded in test data",
    ));
    Ok(())
}

#[test]
fn test_verify_reports_stdout_mismatch() -> Result<()> {
    let env = GoldenEnv::new()?.with_test()?;
    env.abc("record").assert().success();

    fs::write(env.data().join(".abc/stdout"), "Hello, Mallory!\n")?;
    env.abc("verify").assert().failure().stderr(predicate::str::contains(
        "the printed messages differ between the recorded golden output and the actual output",
    ));
    Ok(())
}

#[test]
fn test_test_name_filter_selects_cases() -> Result<()> {
    let env = GoldenEnv::new()?.with_test()?;
    env.abc("record")
        .arg("--test-name")
        .arg("basic")
        .assert()
        .success();

    env.abc("verify")
        .arg("--test-name")
        .arg("nope")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no such test case"));
    Ok(())
}

#[test]
fn test_new_test_records_initial_data() -> Result<()> {
    let env = GoldenEnv::new()?;
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("abc"));
    cmd.arg("golden-test")
        .arg("new-test")
        .arg("fresh")
        .arg(&env.template)
        .arg("--input")
        .arg("person_name=Ada");
    cmd.assert().success();

    let case = env.template.join("testdata/golden/fresh");
    assert!(case.join("test.yaml").is_file());
    assert_eq!(
        fs::read_to_string(case.join("data/file.txt"))?,
        "greeting for Ada\n"
    );

    env.abc("verify").assert().success();
    Ok(())
}

#[test]
fn test_record_over_template_tree() -> Result<()> {
    // Two templates under one root; record discovers both.
    let tmp = tempfile::tempdir()?;
    let t1 = tmp.path().join("t1");
    fs::create_dir_all(&t1)?;
    fs::write(
        t1.join("spec.yaml"),
        r#"
api_version: 'abc.dev/v1'
kind: 'Template'
desc: 'one file'
steps:
  - desc: 'include'
    action: 'include'
    params:
      paths:
        - paths: ['file.txt']
"#,
    )?;
    fs::write(t1.join("file.txt"), "content of t1\n")?;
    let case = t1.join("testdata/golden/case");
    fs::create_dir_all(&case)?;
    fs::write(
        case.join("test.yaml"),
        "api_version: 'abc.dev/v1'\nkind: 'GoldenTest'\n",
    )?;

    // t2 is a copy of t1 with different content.
    let t2 = tmp.path().join("t2");
    fs::create_dir_all(&t2)?;
    let mut options = fs_extra::dir::CopyOptions::new();
    options.content_only = true;
    fs_extra::dir::copy(&t1, &t2, &options).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    fs::write(t2.join("file.txt"), "content of t2\n")?;

    let mut record = Command::new(assert_cmd::cargo::cargo_bin!("abc"));
    record.arg("golden-test").arg("record").arg(tmp.path());
    record.assert().success();

    for name in ["t1", "t2"] {
        assert_eq!(
            fs::read_to_string(
                tmp.path()
                    .join(name)
                    .join("testdata/golden/case/data/file.txt")
            )?,
            format!("content of {}\n", name)
        );
    }

    let mut verify = Command::new(assert_cmd::cargo::cargo_bin!("abc"));
    verify.arg("golden-test").arg("verify").arg(tmp.path());
    verify.assert().success();
    Ok(())
}
