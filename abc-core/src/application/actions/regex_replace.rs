// abc-core/src/application/actions/regex_replace.rs

use regex::Regex;

use crate::AbcError;
use crate::application::actions::{StepContext, files_under};
use crate::domain::api::template::{RegexReplace, RegexReplacement};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs as afs;

pub(crate) fn run(params: &RegexReplace, ctx: &mut StepContext<'_>) -> Result<(), AbcError> {
    let vars = ctx.scope.flatten();

    let mut compiled = Vec::with_capacity(params.replacements.len());
    for r in &params.replacements {
        let re = Regex::new(&r.regex.value).map_err(|e| {
            InfrastructureError::ConfigError(format!(
                "{}invalid regex {:?}: {}",
                r.regex.pos.prefix(),
                r.regex.value,
                e
            ))
        })?;
        if let Some(sub) = &r.subgroup_to_replace
            && !re.capture_names().flatten().any(|n| n == sub.value)
        {
            return Err(InfrastructureError::ConfigError(format!(
                "{}regex {:?} has no subgroup named {:?}",
                sub.pos.prefix(),
                r.regex.value,
                sub.value
            ))
            .into());
        }
        // `with` is template-expanded; capture references (${1}, ${name})
        // expand per match afterwards.
        let with = ctx.renderer.render(&r.with.value, &vars)?;
        compiled.push((re, with, r));
    }

    for raw in &params.paths {
        for file in files_under(ctx, raw)? {
            let mode = afs::file_mode(&file)?;
            let mut content = afs::read_to_string(&file)?;
            for (re, with, r) in &compiled {
                content = apply(re, with, r, &content);
            }
            afs::write_file(&file, content.as_bytes(), mode)?;
        }
    }
    Ok(())
}

fn apply(re: &Regex, with: &str, r: &RegexReplacement, content: &str) -> String {
    match &r.subgroup_to_replace {
        None => re.replace_all(content, with).into_owned(),
        Some(sub) => {
            // Replace only the named subgroup's span within each match.
            let mut out = String::with_capacity(content.len());
            let mut last = 0;
            for caps in re.captures_iter(content) {
                if let Some(m) = caps.name(&sub.value) {
                    let mut expanded = String::new();
                    caps.expand(with, &mut expanded);
                    out.push_str(&content[last..m.start()]);
                    out.push_str(&expanded);
                    last = m.end();
                }
            }
            out.push_str(&content[last..]);
            out
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::application::actions::testutil::{ActionHarness, step};

    #[test]
    fn test_numbered_and_named_groups() {
        let mut h = ActionHarness::new(&[]);
        h.write_scratch("a.txt", "port=8080");
        let s = step(
            r#"
desc: 'rewrite'
action: 'regex_replace'
params:
  paths: ['a.txt']
  replacements:
    - regex: 'port=(?P<num>[0-9]+)'
      with: 'port=${num} # was ${1}'
"#,
        );
        h.run(&s).unwrap();
        assert_eq!(h.scratch_file("a.txt"), "port=8080 # was 8080");
    }

    #[test]
    fn test_subgroup_to_replace_scopes_the_edit() {
        let mut h = ActionHarness::new(&[("version", "2")]);
        h.write_scratch("a.txt", "api_version: 1\nother: 1\n");
        let s = step(
            r#"
desc: 'bump'
action: 'regex_replace'
params:
  paths: ['a.txt']
  replacements:
    - regex: 'api_version: (?P<ver>[0-9]+)'
      subgroup_to_replace: 'ver'
      with: '{{.version}}'
"#,
        );
        h.run(&s).unwrap();
        assert_eq!(h.scratch_file("a.txt"), "api_version: 2\nother: 1\n");
    }

    #[test]
    fn test_invalid_regex_is_reported() {
        let mut h = ActionHarness::new(&[]);
        h.write_scratch("a.txt", "x");
        let s = step(
            r#"
desc: 'bad'
action: 'regex_replace'
params:
  paths: ['a.txt']
  replacements:
    - regex: '([unclosed'
      with: 'y'
"#,
        );
        let err = h.run(&s).unwrap_err();
        assert!(err.to_string().contains("invalid regex"));
    }

    #[test]
    fn test_missing_subgroup_is_reported() {
        let mut h = ActionHarness::new(&[]);
        h.write_scratch("a.txt", "x");
        let s = step(
            r#"
desc: 'bad'
action: 'regex_replace'
params:
  paths: ['a.txt']
  replacements:
    - regex: '(?P<a>x)'
      subgroup_to_replace: 'b'
      with: 'y'
"#,
        );
        let err = h.run(&s).unwrap_err();
        assert!(err.to_string().contains("no subgroup named"));
    }
}
