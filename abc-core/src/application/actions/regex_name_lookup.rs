// abc-core/src/application/actions/regex_name_lookup.rs
//
// Each named capture group's span is replaced by the input variable of
// the same name.

use regex::Regex;

use crate::AbcError;
use crate::application::actions::{StepContext, files_under};
use crate::domain::DomainError;
use crate::domain::api::template::RegexNameLookup;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs as afs;

pub(crate) fn run(params: &RegexNameLookup, ctx: &mut StepContext<'_>) -> Result<(), AbcError> {
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
        if re.capture_names().flatten().next().is_none() {
            return Err(InfrastructureError::ConfigError(format!(
                "{}regex {:?} has no named capture groups to look up",
                r.regex.pos.prefix(),
                r.regex.value
            ))
            .into());
        }
        compiled.push(re);
    }

    for raw in &params.paths {
        for file in files_under(ctx, raw)? {
            let mode = afs::file_mode(&file)?;
            let mut content = afs::read_to_string(&file)?;
            for re in &compiled {
                content = apply(re, ctx, &content)?;
            }
            afs::write_file(&file, content.as_bytes(), mode)?;
        }
    }
    Ok(())
}

fn apply(re: &Regex, ctx: &StepContext<'_>, content: &str) -> Result<String, AbcError> {
    let mut spans: Vec<(usize, usize, String)> = Vec::new();
    for caps in re.captures_iter(content) {
        for name in re.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                let value = ctx.scope.get(name).ok_or_else(|| DomainError::UnknownVar {
                    name: name.to_string(),
                })?;
                spans.push((m.start(), m.end(), value.to_string()));
            }
        }
    }
    spans.sort_by_key(|(start, _, _)| *start);

    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for (start, end, value) in spans {
        if start < last {
            continue; // overlapping (nested) groups: first one wins
        }
        out.push_str(&content[last..start]);
        out.push_str(&value);
        last = end;
    }
    out.push_str(&content[last..]);
    Ok(out)
}
