// abc-core/src/application/builtins.rs
//
// Builtin vars: underscore-prefixed names whose values come from the
// engine (render flags, git info), not the user. Golden tests pin them
// through `builtin_vars` so recorded output is deterministic.

use std::collections::BTreeMap;
use std::path::Path;

use crate::AbcError;
use crate::domain::DomainError;
use crate::domain::api::VarValue;
use crate::domain::features::Features;
use crate::infrastructure::git;

pub const FLAG_DEST: &str = "_flag_dest";
pub const FLAG_SOURCE: &str = "_flag_source";
pub const GIT_TAG: &str = "_git_tag";
pub const GIT_SHA: &str = "_git_sha";
pub const GIT_SHORT_SHA: &str = "_git_short_sha";

/// The builtin names available under the given feature set.
pub fn known_names(features: &Features) -> Vec<&'static str> {
    let mut names = vec![FLAG_DEST, FLAG_SOURCE];
    if !features.skip_git_vars {
        names.extend([GIT_TAG, GIT_SHA, GIT_SHORT_SHA]);
    }
    names
}

pub struct BuiltinSources<'a> {
    pub template_dir: &'a Path,
    pub dest: &'a Path,
    pub source: &'a str,
}

/// Computes the builtin var map, then applies test overrides. Overriding
/// a name the current api_version does not recognize is an error.
pub fn resolve(
    features: &Features,
    sources: &BuiltinSources<'_>,
    overrides: &[VarValue],
) -> Result<BTreeMap<String, String>, AbcError> {
    let known = known_names(features);

    let mut unknown: Vec<String> = overrides
        .iter()
        .map(|o| o.name.value.clone())
        .filter(|name| !known.contains(&name.as_str()))
        .collect();
    if !unknown.is_empty() {
        unknown.sort();
        return Err(DomainError::UnknownBuiltinOverrides(unknown).into());
    }

    let mut vars = BTreeMap::new();
    vars.insert(FLAG_DEST.to_string(), sources.dest.display().to_string());
    vars.insert(FLAG_SOURCE.to_string(), sources.source.to_string());

    if !features.skip_git_vars {
        // Only shell out when no override pins every git var.
        let overridden = |name: &str| overrides.iter().any(|o| o.name.value == name);
        if !(overridden(GIT_TAG) && overridden(GIT_SHA) && overridden(GIT_SHORT_SHA)) {
            let git_vars = git::git_vars(sources.template_dir);
            vars.insert(GIT_TAG.to_string(), git_vars.tag.unwrap_or_default());
            vars.insert(GIT_SHA.to_string(), git_vars.sha.unwrap_or_default());
            vars.insert(
                GIT_SHORT_SHA.to_string(),
                git_vars.short_sha.unwrap_or_default(),
            );
        } else {
            vars.insert(GIT_TAG.to_string(), String::new());
            vars.insert(GIT_SHA.to_string(), String::new());
            vars.insert(GIT_SHORT_SHA.to_string(), String::new());
        }
    }

    for o in overrides {
        vars.insert(o.name.value.clone(), o.value.value.clone());
    }
    Ok(vars)
}
