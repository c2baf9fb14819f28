// abc-core/src/application/describe.rs
//
// `abc describe <source>`: download the template and summarize its
// description and inputs. Formatting (the table) is the CLI's job.

use std::path::Path;

use crate::AbcError;
use crate::application::golden::SPEC_YAML;
use crate::infrastructure::decode;
use crate::infrastructure::fs::DirTracker;
use crate::ports::{DownloadRequest, Downloader, GitProtocol};

pub struct InputSummary {
    pub name: String,
    pub desc: String,
    /// `None` means required; `Some("")` prints as `""`.
    pub default: Option<String>,
    pub rules: Vec<String>,
}

pub struct TemplateSummary {
    pub desc: String,
    pub inputs: Vec<InputSummary>,
}

pub fn describe(
    cwd: &Path,
    source: &str,
    git_protocol: GitProtocol,
    downloader: &dyn Downloader,
    is_release_build: bool,
) -> Result<TemplateSummary, AbcError> {
    let mut tracker = DirTracker::new(false);
    let template_dir = tracker.track("abc-describe-")?;
    downloader.download(&DownloadRequest {
        cwd,
        source,
        git_protocol,
        dest: &template_dir,
    })?;

    let template = decode::load_spec(&template_dir.join(SPEC_YAML), is_release_build)?;
    Ok(TemplateSummary {
        desc: template.desc.value.clone(),
        inputs: template
            .inputs
            .iter()
            .map(|i| InputSummary {
                name: i.name.value.clone(),
                desc: i.desc.value.clone(),
                default: i.default.as_ref().map(|d| d.value.clone()),
                rules: i.rules.iter().map(|r| r.rule.value.clone()).collect(),
            })
            .collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::LocalDownloader;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_describe_distinguishes_required_and_empty_default() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("spec.yaml"),
            r#"
api_version: 'abc.dev/v1'
kind: 'Template'
desc: 'demo template'
inputs:
  - name: 'required_one'
    desc: 'no default'
  - name: 'empty_default'
    desc: 'defaults to empty'
    default: ''
    rules:
      - rule: 'empty_default != "forbidden"'
steps:
  - desc: 'p'
    action: 'print'
    params:
      message: 'hi'
"#,
        )
        .unwrap();

        let summary = describe(dir.path(), ".", GitProtocol::Https, &LocalDownloader, true).unwrap();
        assert_eq!(summary.desc, "demo template");
        assert_eq!(summary.inputs[0].default, None);
        assert_eq!(summary.inputs[1].default, Some(String::new()));
        assert_eq!(summary.inputs[1].rules.len(), 1);
    }
}
