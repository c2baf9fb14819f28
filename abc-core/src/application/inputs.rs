// abc-core/src/application/inputs.rs
//
// Input resolution. Precedence, highest first: --input flags, --input-file
// YAML files, template defaults, interactive prompt. Rules run after
// resolution against the full scope (inputs + builtins).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::AbcError;
use crate::domain::DomainError;
use crate::domain::api::template::Input;
use crate::domain::error::RuleFailure;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs as afs;
use crate::infrastructure::jinja::JinjaRenderer;
use crate::ports::Prompter;

pub struct ResolveParams<'a, 'p> {
    pub spec_inputs: &'a [Input],
    pub flag_inputs: &'a BTreeMap<String, String>,
    pub input_files: &'a [PathBuf],
    pub prompt: bool,
    pub accept_defaults: bool,
    pub skip_validation: bool,
    pub prompter: Option<&'p mut dyn Prompter>,
    pub renderer: &'a JinjaRenderer,
    pub builtins: &'a BTreeMap<String, String>,
}

/// Resolves every declared input to a string value, or explains what is
/// missing/unknown/invalid.
pub fn resolve(mut params: ResolveParams<'_, '_>) -> Result<BTreeMap<String, String>, AbcError> {
    let file_inputs = load_input_files(params.input_files)?;

    reject_unknown(params.spec_inputs, params.flag_inputs, &file_inputs)?;

    let mut resolved = BTreeMap::new();
    let mut missing = Vec::new();
    let mut prompter = std::mem::take(&mut params.prompter);

    for input in params.spec_inputs {
        let name = &input.name.value;
        let default = input.default.as_ref().map(|d| d.value.clone());

        let value = if let Some(v) = params.flag_inputs.get(name) {
            Some(v.clone())
        } else if let Some(v) = file_inputs.get(name) {
            Some(v.clone())
        } else if params.accept_defaults || !params.prompt {
            default.clone()
        } else {
            None
        };

        let value = match value {
            Some(v) => Some(v),
            None if params.prompt => {
                prompt_for(&mut prompter, input, default.as_deref())?
            }
            None => None,
        };

        match value {
            Some(v) => {
                debug!(input = %name, "input resolved");
                resolved.insert(name.clone(), v);
            }
            None => missing.push(name.clone()),
        }
    }

    if !missing.is_empty() {
        missing.sort();
        return Err(DomainError::MissingRequiredInputs(missing).into());
    }

    if !params.skip_validation {
        check_rules(params.spec_inputs, &resolved, params.builtins, params.renderer)?;
    }

    Ok(resolved)
}

/// Each --input-file is a flat mapping of name → scalar. Later files win
/// over earlier ones; flags win over all files.
fn load_input_files(paths: &[PathBuf]) -> Result<BTreeMap<String, String>, AbcError> {
    let mut merged = BTreeMap::new();
    for path in paths {
        let src = afs::read_to_string(path)?;
        let parsed: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(&src)
            .map_err(InfrastructureError::YamlError)?;
        for (name, value) in parsed {
            let value = scalar_string(path, &name, &value)?;
            merged.insert(name, value);
        }
    }
    Ok(merged)
}

fn scalar_string(
    file: &Path,
    name: &str,
    value: &serde_yaml::Value,
) -> Result<String, AbcError> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        _ => Err(InfrastructureError::ConfigError(format!(
            "input {:?} in {} must be a scalar",
            name,
            file.display()
        ))
        .into()),
    }
}

fn reject_unknown(
    spec_inputs: &[Input],
    flags: &BTreeMap<String, String>,
    files: &BTreeMap<String, String>,
) -> Result<(), AbcError> {
    let declared: Vec<&str> = spec_inputs.iter().map(|i| i.name.value.as_str()).collect();
    let mut unknown: Vec<String> = flags
        .keys()
        .chain(files.keys())
        .filter(|name| !declared.contains(&name.as_str()))
        .cloned()
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort();
    unknown.dedup();
    Err(DomainError::UnknownInputs(unknown).into())
}

fn prompt_for(
    prompter: &mut Option<&mut dyn Prompter>,
    input: &Input,
    default: Option<&str>,
) -> Result<Option<String>, AbcError> {
    let Some(prompter) = prompter.as_deref_mut() else {
        return Ok(None);
    };
    if !prompter.is_interactive() {
        return Ok(None);
    }

    let mut message = format!(
        "\nInput name:   {}\nDescription:  {}\n",
        input.name.value, input.desc.value
    );
    match default {
        Some(d) => message.push_str(&format!("Default:      {:?}\n\nEnter value, or leave empty to accept the default: ", d)),
        None => message.push_str("\nEnter value: "),
    }

    let response = prompter.prompt(&message)?;
    if response.is_empty() {
        Ok(default.map(str::to_string))
    } else {
        Ok(Some(response))
    }
}

fn check_rules(
    spec_inputs: &[Input],
    resolved: &BTreeMap<String, String>,
    builtins: &BTreeMap<String, String>,
    renderer: &JinjaRenderer,
) -> Result<(), AbcError> {
    let mut scope = resolved.clone();
    for (k, v) in builtins {
        scope.entry(k.clone()).or_insert_with(|| v.clone());
    }

    let mut failures = Vec::new();
    for input in spec_inputs {
        for rule in &input.rules {
            let ok = renderer
                .eval_bool(&rule.rule.value, &scope)
                .map_err(|e| {
                    InfrastructureError::ConfigError(format!(
                        "{}rule for input {:?} failed to evaluate: {}",
                        rule.rule.pos.prefix(),
                        input.name.value,
                        e
                    ))
                })?;
            if !ok {
                failures.push(RuleFailure {
                    input: input.name.value.clone(),
                    rule: rule.rule.value.clone(),
                    message: rule.message.as_ref().map(|m| m.value.clone()),
                    pos: rule.rule.pos.clone(),
                });
            }
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(DomainError::RuleViolations(failures).into())
    }
}
