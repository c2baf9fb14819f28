// abc-core/src/domain/api/template.rs
//
// Newest Template model (abc.dev/v1). Older api versions upgrade into this
// form before the render pipeline ever sees them.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;

use crate::domain::api::{PosLookup, Seg, ann, ann_opt, de_scalar_opt, seg};
use crate::domain::error::Violations;
use crate::domain::features::Features;
use crate::domain::position::Spanned;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Template {
    #[serde(default, alias = "apiVersion")]
    pub api_version: Spanned<String>,
    #[serde(default)]
    pub kind: Spanned<String>,
    #[serde(default)]
    pub desc: Spanned<String>,
    #[serde(default)]
    pub inputs: Vec<Input>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub features: Features,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Input {
    #[serde(default)]
    pub name: Spanned<String>,
    #[serde(default)]
    pub desc: Spanned<String>,
    /// Absent (`None`) differs from an explicit empty string: an absent
    /// default makes the input required.
    #[serde(default, deserialize_with = "de_scalar_opt")]
    pub default: Option<Spanned<String>>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    #[serde(default)]
    pub rule: Spanned<String>,
    #[serde(default)]
    pub message: Option<Spanned<String>>,
}

/// One pipeline step: a tagged variant keyed by the `action` scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub desc: Spanned<String>,
    pub action: Spanned<String>,
    /// Skip the step when this expression evaluates to false.
    pub cond: Option<Spanned<String>>,
    pub params: Action,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Include(Include),
    Print(Print),
    Append(Append),
    GoTemplate(GoTemplate),
    StringReplace(StringReplace),
    RegexReplace(RegexReplace),
    RegexNameLookup(RegexNameLookup),
    ForEach(ForEach),
}

pub const ACTION_NAMES: &[&str] = &[
    "append",
    "for_each",
    "go_template",
    "include",
    "print",
    "regex_name_lookup",
    "regex_replace",
    "string_replace",
];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Include {
    #[serde(default)]
    pub paths: Vec<IncludePath>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncludePath {
    #[serde(default)]
    pub paths: Vec<Spanned<String>>,
    /// Renames each copied path; must match `paths` in length.
    #[serde(default, rename = "as")]
    pub as_: Vec<Spanned<String>>,
    #[serde(default)]
    pub skip: Vec<Spanned<String>>,
    /// Only `"destination"` is accepted: pull files from the user's dest
    /// dir instead of the template.
    #[serde(default)]
    pub from: Option<Spanned<String>>,
    #[serde(default)]
    pub strip_prefix: Option<Spanned<String>>,
    #[serde(default)]
    pub add_prefix: Option<Spanned<String>>,
}

impl IncludePath {
    pub fn from_destination(&self) -> bool {
        self.from.as_ref().is_some_and(|f| f.value == "destination")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Print {
    #[serde(default)]
    pub message: Spanned<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Append {
    #[serde(default)]
    pub paths: Vec<Spanned<String>>,
    #[serde(default)]
    pub with: Spanned<String>,
    /// When false, a single `\n` is guaranteed between the existing
    /// content and the appended text.
    #[serde(default)]
    pub skip_ensure_newline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoTemplate {
    #[serde(default)]
    pub paths: Vec<Spanned<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringReplace {
    #[serde(default)]
    pub paths: Vec<Spanned<String>>,
    #[serde(default)]
    pub replacements: Vec<StringReplacement>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringReplacement {
    #[serde(default)]
    pub to_replace: Spanned<String>,
    #[serde(default)]
    pub with: Spanned<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexReplace {
    #[serde(default)]
    pub paths: Vec<Spanned<String>>,
    #[serde(default)]
    pub replacements: Vec<RegexReplacement>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexReplacement {
    #[serde(default)]
    pub regex: Spanned<String>,
    #[serde(default)]
    pub with: Spanned<String>,
    /// Scope the replacement to one named subgroup of the regex.
    #[serde(default)]
    pub subgroup_to_replace: Option<Spanned<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexNameLookup {
    #[serde(default)]
    pub paths: Vec<Spanned<String>>,
    #[serde(default)]
    pub replacements: Vec<RegexNameLookupEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexNameLookupEntry {
    #[serde(default)]
    pub regex: Spanned<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForEach {
    #[serde(default)]
    pub iterator: ForEachIterator,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForEachIterator {
    #[serde(default)]
    pub key: Spanned<String>,
    #[serde(default)]
    pub values: Option<Vec<Spanned<String>>>,
    /// Expression returning a list of strings.
    #[serde(default)]
    pub values_from: Option<Spanned<String>>,
}

// --- STEP DECODING (tagged by `action`) ---

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StepRaw {
    #[serde(default)]
    desc: Spanned<String>,
    #[serde(default)]
    action: Spanned<String>,
    #[serde(rename = "if", default)]
    cond: Option<Spanned<String>>,
    #[serde(default)]
    params: serde_yaml::Value,
}

pub(crate) fn decode_params<'de, T, D>(params: serde_yaml::Value, action: &str) -> Result<T, D::Error>
where
    T: serde::de::DeserializeOwned,
    D: Deserializer<'de>,
{
    if params.is_null() {
        return Err(D::Error::custom(format!(
            "action {:?} requires params",
            action
        )));
    }
    serde_yaml::from_value(params).map_err(|e| {
        D::Error::custom(format!("invalid params for action {:?}: {}", action, e))
    })
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = StepRaw::deserialize(d)?;
        let params = match raw.action.as_str() {
            "include" => Action::Include(decode_params::<_, D>(raw.params, "include")?),
            "print" => Action::Print(decode_params::<_, D>(raw.params, "print")?),
            "append" => Action::Append(decode_params::<_, D>(raw.params, "append")?),
            "go_template" => Action::GoTemplate(decode_params::<_, D>(raw.params, "go_template")?),
            "string_replace" => {
                Action::StringReplace(decode_params::<_, D>(raw.params, "string_replace")?)
            }
            "regex_replace" => {
                Action::RegexReplace(decode_params::<_, D>(raw.params, "regex_replace")?)
            }
            "regex_name_lookup" => {
                Action::RegexNameLookup(decode_params::<_, D>(raw.params, "regex_name_lookup")?)
            }
            "for_each" => Action::ForEach(decode_params::<_, D>(raw.params, "for_each")?),
            other => {
                return Err(D::Error::custom(format!(
                    "unknown action kind {:?}; valid choices are [{}]",
                    other,
                    ACTION_NAMES.join(", ")
                )));
            }
        };
        Ok(Step {
            desc: raw.desc,
            action: raw.action,
            cond: raw.cond,
            params,
        })
    }
}

// --- VALIDATION ---

/// `subgroup_to_replace` must be a letter followed by alphanumerics.
pub fn is_group_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

impl Template {
    pub fn validate(&self, out: &mut Violations) {
        if self.desc.value.trim().is_empty() {
            out.push(&self.desc.pos, "the template \"desc\" field is required");
        }
        let mut seen = HashSet::new();
        for input in &self.inputs {
            input.validate(out);
            if !input.name.value.is_empty() && !seen.insert(input.name.value.clone()) {
                out.push(
                    &input.name.pos,
                    format!("input name {:?} appears more than once", input.name.value),
                );
            }
        }
        if self.steps.is_empty() {
            out.push(&self.kind.pos, "\"steps\" must contain at least one step");
        }
        validate_steps(&self.steps, out);
    }

    pub fn annotate(&mut self, idx: &dyn PosLookup) {
        ann(&mut self.api_version, idx, &[Seg::K("api_version")]);
        ann(&mut self.kind, idx, &[Seg::K("kind")]);
        ann(&mut self.desc, idx, &[Seg::K("desc")]);
        for (i, input) in self.inputs.iter_mut().enumerate() {
            input.annotate(idx, &[Seg::K("inputs"), Seg::I(i)]);
        }
        annotate_steps(&mut self.steps, idx, &[Seg::K("steps")]);
    }
}

impl Input {
    fn validate(&self, out: &mut Violations) {
        if self.name.value.is_empty() {
            out.push(&self.name.pos, "input \"name\" is required");
        } else if self.name.value.starts_with('_') {
            out.push(
                &self.name.pos,
                format!(
                    "input name {:?} is reserved: names beginning with _ are for builtins",
                    self.name.value
                ),
            );
        }
        if self.desc.value.trim().is_empty() {
            out.push(&self.desc.pos, "input \"desc\" is required");
        }
        for rule in &self.rules {
            if rule.rule.value.trim().is_empty() {
                out.push(&rule.rule.pos, "input rule expression must not be empty");
            }
        }
    }

    fn annotate(&mut self, idx: &dyn PosLookup, p: &[Seg]) {
        ann(&mut self.name, idx, &seg(p, &[Seg::K("name")]));
        ann(&mut self.desc, idx, &seg(p, &[Seg::K("desc")]));
        ann_opt(&mut self.default, idx, &seg(p, &[Seg::K("default")]));
        for (j, rule) in self.rules.iter_mut().enumerate() {
            let rp = seg(p, &[Seg::K("rules"), Seg::I(j)]);
            ann(&mut rule.rule, idx, &seg(&rp, &[Seg::K("rule")]));
            ann_opt(&mut rule.message, idx, &seg(&rp, &[Seg::K("message")]));
        }
    }
}

pub(crate) fn validate_steps(steps: &[Step], out: &mut Violations) {
    for step in steps {
        if step.desc.value.trim().is_empty() {
            out.push(&step.action.pos, "step \"desc\" is required");
        }
        match &step.params {
            Action::Include(p) => validate_include(p, &step.action, out),
            Action::Print(p) => {
                if p.message.value.is_empty() {
                    out.push(&p.message.pos, "print \"message\" is required");
                }
            }
            Action::Append(p) => require_paths(&p.paths, &step.action, out),
            Action::GoTemplate(p) => require_paths(&p.paths, &step.action, out),
            Action::StringReplace(p) => {
                require_paths(&p.paths, &step.action, out);
                if p.replacements.is_empty() {
                    out.push(&step.action.pos, "\"replacements\" must not be empty");
                }
                for r in &p.replacements {
                    if r.to_replace.value.is_empty() {
                        out.push(&r.to_replace.pos, "\"to_replace\" is required");
                    }
                }
            }
            Action::RegexReplace(p) => {
                require_paths(&p.paths, &step.action, out);
                if p.replacements.is_empty() {
                    out.push(&step.action.pos, "\"replacements\" must not be empty");
                }
                for r in &p.replacements {
                    if r.regex.value.is_empty() {
                        out.push(&r.regex.pos, "\"regex\" is required");
                    }
                    if let Some(sub) = &r.subgroup_to_replace
                        && !is_group_ident(&sub.value)
                    {
                        out.push(
                            &sub.pos,
                            format!(
                                "subgroup name {:?} is invalid: must be a letter followed by letters and digits",
                                sub.value
                            ),
                        );
                    }
                }
            }
            Action::RegexNameLookup(p) => {
                require_paths(&p.paths, &step.action, out);
                if p.replacements.is_empty() {
                    out.push(&step.action.pos, "\"replacements\" must not be empty");
                }
                for r in &p.replacements {
                    if r.regex.value.is_empty() {
                        out.push(&r.regex.pos, "\"regex\" is required");
                    }
                }
            }
            Action::ForEach(p) => {
                if p.iterator.key.value.is_empty() {
                    out.push(&p.iterator.key.pos, "for_each iterator \"key\" is required");
                }
                match (&p.iterator.values, &p.iterator.values_from) {
                    (Some(_), Some(vf)) => out.push(
                        &vf.pos,
                        "exactly one of \"values\" or \"values_from\" may be set, not both",
                    ),
                    (None, None) => out.push(
                        &p.iterator.key.pos,
                        "one of \"values\" or \"values_from\" is required",
                    ),
                    _ => {}
                }
                if p.steps.is_empty() {
                    out.push(&step.action.pos, "for_each \"steps\" must not be empty");
                }
                validate_steps(&p.steps, out);
            }
        }
    }
}

fn validate_include(p: &Include, action: &Spanned<String>, out: &mut Violations) {
    if p.paths.is_empty() {
        out.push(&action.pos, "include \"paths\" must not be empty");
    }
    for ip in &p.paths {
        if ip.paths.is_empty() {
            out.push(&action.pos, "include \"paths\" entry needs at least one path");
        }
        if !ip.as_.is_empty() {
            if ip.as_.len() != ip.paths.len() {
                out.push(
                    &action.pos,
                    format!(
                        "\"as\" length ({}) must match \"paths\" length ({})",
                        ip.as_.len(),
                        ip.paths.len()
                    ),
                );
            }
            if ip.strip_prefix.is_some() || ip.add_prefix.is_some() {
                out.push(
                    &action.pos,
                    "\"as\" may not be combined with \"strip_prefix\" or \"add_prefix\"",
                );
            }
        }
        if let Some(from) = &ip.from
            && from.value != "destination"
        {
            out.push(
                &from.pos,
                format!("\"from\" must be \"destination\" if set, got {:?}", from.value),
            );
        }
    }
}

fn require_paths(paths: &[Spanned<String>], action: &Spanned<String>, out: &mut Violations) {
    if paths.is_empty() {
        out.push(&action.pos, "\"paths\" must not be empty");
    }
}

// --- POSITION ANNOTATION ---

fn ann_vec(v: &mut [Spanned<String>], idx: &dyn PosLookup, p: &[Seg], key: &'static str) {
    for (i, s) in v.iter_mut().enumerate() {
        s.pos = idx.lookup(&seg(p, &[Seg::K(key), Seg::I(i)]));
    }
}

pub(crate) fn annotate_steps(steps: &mut [Step], idx: &dyn PosLookup, base: &[Seg]) {
    for (i, step) in steps.iter_mut().enumerate() {
        let p = seg(base, &[Seg::I(i)]);
        ann(&mut step.desc, idx, &seg(&p, &[Seg::K("desc")]));
        ann(&mut step.action, idx, &seg(&p, &[Seg::K("action")]));
        ann_opt(&mut step.cond, idx, &seg(&p, &[Seg::K("if")]));
        let pp = seg(&p, &[Seg::K("params")]);
        match &mut step.params {
            Action::Include(a) => {
                for (j, ip) in a.paths.iter_mut().enumerate() {
                    let ipp = seg(&pp, &[Seg::K("paths"), Seg::I(j)]);
                    ann_vec(&mut ip.paths, idx, &ipp, "paths");
                    ann_vec(&mut ip.as_, idx, &ipp, "as");
                    ann_vec(&mut ip.skip, idx, &ipp, "skip");
                    ann_opt(&mut ip.from, idx, &seg(&ipp, &[Seg::K("from")]));
                    ann_opt(&mut ip.strip_prefix, idx, &seg(&ipp, &[Seg::K("strip_prefix")]));
                    ann_opt(&mut ip.add_prefix, idx, &seg(&ipp, &[Seg::K("add_prefix")]));
                }
            }
            Action::Print(a) => ann(&mut a.message, idx, &seg(&pp, &[Seg::K("message")])),
            Action::Append(a) => {
                ann_vec(&mut a.paths, idx, &pp, "paths");
                ann(&mut a.with, idx, &seg(&pp, &[Seg::K("with")]));
            }
            Action::GoTemplate(a) => ann_vec(&mut a.paths, idx, &pp, "paths"),
            Action::StringReplace(a) => {
                ann_vec(&mut a.paths, idx, &pp, "paths");
                for (j, r) in a.replacements.iter_mut().enumerate() {
                    let rp = seg(&pp, &[Seg::K("replacements"), Seg::I(j)]);
                    ann(&mut r.to_replace, idx, &seg(&rp, &[Seg::K("to_replace")]));
                    ann(&mut r.with, idx, &seg(&rp, &[Seg::K("with")]));
                }
            }
            Action::RegexReplace(a) => {
                ann_vec(&mut a.paths, idx, &pp, "paths");
                for (j, r) in a.replacements.iter_mut().enumerate() {
                    let rp = seg(&pp, &[Seg::K("replacements"), Seg::I(j)]);
                    ann(&mut r.regex, idx, &seg(&rp, &[Seg::K("regex")]));
                    ann(&mut r.with, idx, &seg(&rp, &[Seg::K("with")]));
                    ann_opt(
                        &mut r.subgroup_to_replace,
                        idx,
                        &seg(&rp, &[Seg::K("subgroup_to_replace")]),
                    );
                }
            }
            Action::RegexNameLookup(a) => {
                ann_vec(&mut a.paths, idx, &pp, "paths");
                for (j, r) in a.replacements.iter_mut().enumerate() {
                    let rp = seg(&pp, &[Seg::K("replacements"), Seg::I(j)]);
                    ann(&mut r.regex, idx, &seg(&rp, &[Seg::K("regex")]));
                }
            }
            Action::ForEach(a) => {
                let itp = seg(&pp, &[Seg::K("iterator")]);
                ann(&mut a.iterator.key, idx, &seg(&itp, &[Seg::K("key")]));
                if let Some(values) = &mut a.iterator.values {
                    ann_vec(values, idx, &itp, "values");
                }
                ann_opt(
                    &mut a.iterator.values_from,
                    idx,
                    &seg(&itp, &[Seg::K("values_from")]),
                );
                annotate_steps(&mut a.steps, idx, &seg(&pp, &[Seg::K("steps")]));
            }
        }
    }
}
