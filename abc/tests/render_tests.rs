// abc/tests/render_tests.rs
//
// End-to-end render scenarios against the real binary.

use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// One isolated template + destination pair.
struct RenderEnv {
    _tmp: TempDir,
    template: PathBuf,
    dest: PathBuf,
}

impl RenderEnv {
    fn new(spec: &str) -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let template = tmp.path().join("template");
        let dest = tmp.path().join("dest");
        fs::create_dir_all(&template)?;
        fs::create_dir_all(&dest)?;
        fs::write(template.join("spec.yaml"), spec)?;
        Ok(Self {
            _tmp: tmp,
            template,
            dest,
        })
    }

    fn write_template(&self, rel: &str, content: &str) -> Result<()> {
        let path = self.template.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn abc(&self) -> Command {
        Command::new(assert_cmd::cargo::cargo_bin!("abc"))
    }

    fn render(&self, extra: &[&str]) -> Command {
        let mut cmd = self.abc();
        cmd.arg("render")
            .arg("--dest")
            .arg(&self.dest)
            .arg("--allow-non-git-dest")
            .args(extra)
            .arg(&self.template);
        cmd
    }

    fn dest_file(&self, rel: &str) -> String {
        fs::read_to_string(self.dest.join(rel)).unwrap_or_default()
    }

    fn dest_entries(&self) -> usize {
        fs::read_dir(&self.dest).map(|d| d.count()).unwrap_or(0)
    }
}

const PRINT_SPEC: &str = r#"
api_version: 'abc.dev/v1'
kind: 'Template'
desc: 'greeting'
inputs:
  - name: 'person_name'
    desc: 'who to greet'
steps:
  - desc: 'say hi'
    action: 'print'
    params:
      message: 'Hello, {{.person_name}}!'
"#;

#[test]
fn test_print_renders_to_stdout_and_leaves_dest_alone() -> Result<()> {
    let env = RenderEnv::new(PRINT_SPEC)?;
    env.render(&["--input", "person_name=Bob"])
        .assert()
        .success()
        .stdout(predicate::eq("Hello, Bob!\n"));
    assert_eq!(env.dest_entries(), 0);
    Ok(())
}

#[test]
fn test_missing_input_fails_with_name() -> Result<()> {
    let env = RenderEnv::new(PRINT_SPEC)?;
    env.render(&[])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing input(s): person_name"));
    Ok(())
}

#[test]
fn test_unknown_input_fails_with_name() -> Result<()> {
    let env = RenderEnv::new(PRINT_SPEC)?;
    env.render(&["--input", "person_name=Bob", "--input", "extra=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown input(s): extra"));
    Ok(())
}

const INCLUDE_SPEC: &str = r#"
api_version: 'abc.dev/v1'
kind: 'Template'
desc: 'two files'
steps:
  - desc: 'include all'
    action: 'include'
    params:
      paths:
        - paths: ['.']
"#;

#[test]
fn test_include_materializes_files_and_manifest() -> Result<()> {
    let env = RenderEnv::new(INCLUDE_SPEC)?;
    env.write_template("a.txt", "A")?;
    env.write_template("b.txt", "B")?;

    env.render(&[]).assert().success();
    assert_eq!(env.dest_file("a.txt"), "A");
    assert_eq!(env.dest_file("b.txt"), "B");
    assert!(env.dest.join(".abc/manifest.yaml").is_file());

    let manifest = env.dest_file(".abc/manifest.yaml");
    assert!(manifest.contains("file: a.txt"));
    assert!(manifest.contains("template_dirhash: h1:"));
    Ok(())
}

#[test]
fn test_rerender_conflicts_need_force_overwrite() -> Result<()> {
    let env = RenderEnv::new(INCLUDE_SPEC)?;
    env.write_template("a.txt", "A")?;

    env.render(&[]).assert().success();
    // Identical rerender is fine.
    env.render(&[]).assert().success();

    // Diverged dest file: refuse without force, keep dest intact.
    fs::write(env.dest.join("a.txt"), "edited")?;
    env.render(&[])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force-overwrite"));
    assert_eq!(env.dest_file("a.txt"), "edited");

    env.render(&["--force-overwrite"])
        .assert()
        .success()
        .stderr(predicate::str::contains("backed up"));
    assert_eq!(env.dest_file("a.txt"), "A");
    Ok(())
}

const FOR_EACH_SPEC: &str = r#"
api_version: 'abc.dev/v1'
kind: 'Template'
desc: 'loop'
steps:
  - desc: 'loop envs'
    action: 'for_each'
    params:
      iterator:
        key: 'env'
        values: ['dev', 'prod']
      steps:
        - desc: 'greet'
          action: 'print'
          params:
            message: 'Hello, {{.env}}'
"#;

#[test]
fn test_for_each_prints_both_lines_in_order() -> Result<()> {
    let env = RenderEnv::new(FOR_EACH_SPEC)?;
    env.render(&[])
        .assert()
        .success()
        .stdout(predicate::eq("Hello, dev\nHello, prod\n"));
    Ok(())
}

const TRAVERSAL_SPEC: &str = r#"
api_version: 'abc.dev/v1'
kind: 'Template'
desc: 'escape attempt'
steps:
  - desc: 'include parent'
    action: 'include'
    params:
      paths:
        - paths: ['../secret']
"#;

#[test]
fn test_path_traversal_is_rejected() -> Result<()> {
    let env = RenderEnv::new(TRAVERSAL_SPEC)?;
    env.render(&[])
        .assert()
        .failure()
        .stderr(predicate::str::contains("traversal"));
    Ok(())
}

#[test]
fn test_input_file_and_flag_precedence() -> Result<()> {
    let env = RenderEnv::new(PRINT_SPEC)?;
    let input_file = env.template.parent().unwrap().join("inputs.yaml");
    fs::write(&input_file, "person_name: 'FromFile'\n")?;

    env.render(&["--input-file", input_file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::eq("Hello, FromFile!\n"));

    env.render(&[
        "--input-file",
        input_file.to_str().unwrap(),
        "--input",
        "person_name=FromFlag",
    ])
    .assert()
    .success()
    .stdout(predicate::eq("Hello, FromFlag!\n"));
    Ok(())
}

#[test]
fn test_old_api_version_still_renders() -> Result<()> {
    let env = RenderEnv::new(&PRINT_SPEC.replace("abc.dev/v1", "abc.dev/v1alpha1"))?;
    env.render(&["--input", "person_name=Bob"])
        .assert()
        .success()
        .stdout(predicate::eq("Hello, Bob!\n"));
    Ok(())
}

#[test]
fn test_unknown_action_reports_choices() -> Result<()> {
    let env = RenderEnv::new(
        r#"
api_version: 'abc.dev/v1'
kind: 'Template'
desc: 'bad'
steps:
  - desc: 'nope'
    action: 'teleport'
    params:
      to: 'mars'
"#,
    )?;
    env.render(&[])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown action kind"));
    Ok(())
}

#[test]
fn test_describe_prints_inputs_table() -> Result<()> {
    let env = RenderEnv::new(
        r#"
api_version: 'abc.dev/v1'
kind: 'Template'
desc: 'demo template'
inputs:
  - name: 'region'
    desc: 'target region'
  - name: 'suffix'
    desc: 'optional suffix'
    default: ''
steps:
  - desc: 'p'
    action: 'print'
    params:
      message: 'hi'
"#,
    )?;
    let mut cmd = env.abc();
    cmd.arg("describe").arg(&env.template);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("demo template"))
        .stdout(predicate::str::contains("region"))
        .stdout(predicate::str::contains("(required)"))
        .stdout(predicate::str::contains("\"\""));
    Ok(())
}

#[test]
fn test_legacy_templates_command_tree() -> Result<()> {
    let env = RenderEnv::new(PRINT_SPEC)?;
    let mut cmd = env.abc();
    cmd.arg("templates")
        .arg("render")
        .arg("--dest")
        .arg(&env.dest)
        .arg("--allow-non-git-dest")
        .arg("--input")
        .arg("person_name=Bob")
        .arg(&env.template);
    cmd.assert()
        .success()
        .stdout(predicate::eq("Hello, Bob!\n"));
    Ok(())
}

#[test]
fn test_non_git_dest_refused_without_flag() -> Result<()> {
    let env = RenderEnv::new(PRINT_SPEC)?;
    let mut cmd = env.abc();
    cmd.arg("render")
        .arg("--dest")
        .arg(&env.dest)
        .arg("--input")
        .arg("person_name=Bob")
        .arg(&env.template);
    // The temp dir is not a git workspace.
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--allow-non-git-dest"));
    Ok(())
}

#[test]
fn test_replace_pipeline_end_to_end() -> Result<()> {
    let env = RenderEnv::new(
        r#"
api_version: 'abc.dev/v1'
kind: 'Template'
desc: 'service scaffold'
inputs:
  - name: 'service'
    desc: 'service name'
  - name: 'port'
    desc: 'listen port'
    default: '8080'
steps:
  - desc: 'bring in sources'
    action: 'include'
    params:
      paths:
        - paths: ['src']
  - desc: 'fill the config template'
    action: 'go_template'
    params:
      paths: ['src/config.ini']
  - desc: 'rename the placeholder'
    action: 'string_replace'
    params:
      paths: ['src/main.txt']
      replacements:
        - to_replace: 'SERVICE_NAME'
          with: '{{.service}}'
  - desc: 'bump the port'
    action: 'regex_replace'
    params:
      paths: ['src/config.ini']
      replacements:
        - regex: 'port=(?P<p>[0-9]+)'
          subgroup_to_replace: 'p'
          with: '{{.port}}'
"#,
    )?;
    env.write_template("src/main.txt", "starting SERVICE_NAME\n")?;
    env.write_template("src/config.ini", "name={{.service}}\nport=0\n")?;

    env.render(&["--input", "service=billing"]).assert().success();
    assert_eq!(env.dest_file("src/main.txt"), "starting billing\n");
    assert_eq!(env.dest_file("src/config.ini"), "name=billing\nport=8080\n");
    Ok(())
}
