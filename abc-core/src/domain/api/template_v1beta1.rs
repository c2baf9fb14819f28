// abc-core/src/domain/api/template_v1beta1.rs
//
// Template model for abc.dev/v1beta1. Structurally the newest model minus
// the include prefix rewrites (`strip_prefix` / `add_prefix`), which arrived
// in v1 together with globs, git vars, and the `.abc_renamed` convention.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;

use crate::domain::api::template::{
    self, ACTION_NAMES, Append, ForEachIterator, GoTemplate, Input, Print, RegexNameLookup,
    RegexReplace, StringReplace, decode_params,
};
use crate::domain::api::{API_V1, PosLookup, Seg, ann, ann_opt, seg};
use crate::domain::error::Violations;
use crate::domain::features::Features;
use crate::domain::position::Spanned;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateV1Beta1 {
    #[serde(default, alias = "apiVersion")]
    pub api_version: Spanned<String>,
    #[serde(default)]
    pub kind: Spanned<String>,
    #[serde(default)]
    pub desc: Spanned<String>,
    #[serde(default)]
    pub inputs: Vec<Input>,
    #[serde(default)]
    pub steps: Vec<StepV1Beta1>,
    #[serde(default)]
    pub features: Features,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepV1Beta1 {
    pub desc: Spanned<String>,
    pub action: Spanned<String>,
    pub cond: Option<Spanned<String>>,
    pub params: ActionV1Beta1,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionV1Beta1 {
    Include(IncludeV1Beta1),
    Print(Print),
    Append(Append),
    GoTemplate(GoTemplate),
    StringReplace(StringReplace),
    RegexReplace(RegexReplace),
    RegexNameLookup(RegexNameLookup),
    ForEach(ForEachV1Beta1),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncludeV1Beta1 {
    #[serde(default)]
    pub paths: Vec<IncludePathV1Beta1>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncludePathV1Beta1 {
    #[serde(default)]
    pub paths: Vec<Spanned<String>>,
    #[serde(default, rename = "as")]
    pub as_: Vec<Spanned<String>>,
    #[serde(default)]
    pub skip: Vec<Spanned<String>>,
    #[serde(default)]
    pub from: Option<Spanned<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForEachV1Beta1 {
    #[serde(default)]
    pub iterator: ForEachIterator,
    #[serde(default)]
    pub steps: Vec<StepV1Beta1>,
}

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

impl<'de> Deserialize<'de> for StepV1Beta1 {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = StepRaw::deserialize(d)?;
        let params = match raw.action.as_str() {
            "include" => ActionV1Beta1::Include(decode_params::<_, D>(raw.params, "include")?),
            "print" => ActionV1Beta1::Print(decode_params::<_, D>(raw.params, "print")?),
            "append" => ActionV1Beta1::Append(decode_params::<_, D>(raw.params, "append")?),
            "go_template" => {
                ActionV1Beta1::GoTemplate(decode_params::<_, D>(raw.params, "go_template")?)
            }
            "string_replace" => {
                ActionV1Beta1::StringReplace(decode_params::<_, D>(raw.params, "string_replace")?)
            }
            "regex_replace" => {
                ActionV1Beta1::RegexReplace(decode_params::<_, D>(raw.params, "regex_replace")?)
            }
            "regex_name_lookup" => ActionV1Beta1::RegexNameLookup(decode_params::<_, D>(
                raw.params,
                "regex_name_lookup",
            )?),
            "for_each" => ActionV1Beta1::ForEach(decode_params::<_, D>(raw.params, "for_each")?),
            other => {
                return Err(D::Error::custom(format!(
                    "unknown action kind {:?}; valid choices are [{}]",
                    other,
                    ACTION_NAMES.join(", ")
                )));
            }
        };
        Ok(StepV1Beta1 {
            desc: raw.desc,
            action: raw.action,
            cond: raw.cond,
            params,
        })
    }
}

impl TemplateV1Beta1 {
    pub fn validate(&self, out: &mut Violations) {
        // Shared invariants are checked on the upgraded form during
        // decode_validate_upgrade; here we check what is visible at this
        // version.
        if self.desc.value.trim().is_empty() {
            out.push(&self.desc.pos, "the template \"desc\" field is required");
        }
        let mut seen = HashSet::new();
        for input in &self.inputs {
            if input.name.value.is_empty() {
                out.push(&input.name.pos, "input \"name\" is required");
            } else if input.name.value.starts_with('_') {
                out.push(
                    &input.name.pos,
                    format!(
                        "input name {:?} is reserved: names beginning with _ are for builtins",
                        input.name.value
                    ),
                );
            }
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
        // Upgrade is pure structure mapping, so validating the lifted steps
        // covers the per-action invariants at the right positions.
        let lifted: Vec<template::Step> = self.steps.iter().cloned().map(upgrade_step).collect();
        template::validate_steps(&lifted, out);
    }

    pub fn annotate(&mut self, idx: &dyn PosLookup) {
        ann(&mut self.api_version, idx, &[Seg::K("api_version")]);
        ann(&mut self.kind, idx, &[Seg::K("kind")]);
        ann(&mut self.desc, idx, &[Seg::K("desc")]);
        for (i, input) in self.inputs.iter_mut().enumerate() {
            let p = [Seg::K("inputs"), Seg::I(i)];
            ann(&mut input.name, idx, &seg(&p, &[Seg::K("name")]));
            ann(&mut input.desc, idx, &seg(&p, &[Seg::K("desc")]));
            ann_opt(&mut input.default, idx, &seg(&p, &[Seg::K("default")]));
            for (j, rule) in input.rules.iter_mut().enumerate() {
                let rp = seg(&p, &[Seg::K("rules"), Seg::I(j)]);
                ann(&mut rule.rule, idx, &seg(&rp, &[Seg::K("rule")]));
                ann_opt(&mut rule.message, idx, &seg(&rp, &[Seg::K("message")]));
            }
        }
        annotate_steps(&mut self.steps, idx, &[Seg::K("steps")]);
    }

    /// v1beta1 → v1. Globs, git vars, and `.abc_renamed` postdate this
    /// version, so the upgrade turns those semantics off.
    pub fn upgrade(self) -> template::Template {
        template::Template {
            api_version: Spanned::at(API_V1.to_string(), self.api_version.pos),
            kind: self.kind,
            desc: self.desc,
            inputs: self.inputs,
            steps: self.steps.into_iter().map(upgrade_step).collect(),
            features: self.features.merge(&Features {
                skip_globs: true,
                skip_git_vars: true,
                skip_abc_renamed: true,
                ..Default::default()
            }),
        }
    }
}

fn annotate_steps(steps: &mut [StepV1Beta1], idx: &dyn PosLookup, base: &[Seg]) {
    for (i, step) in steps.iter_mut().enumerate() {
        let p = seg(base, &[Seg::I(i)]);
        ann(&mut step.desc, idx, &seg(&p, &[Seg::K("desc")]));
        ann(&mut step.action, idx, &seg(&p, &[Seg::K("action")]));
        ann_opt(&mut step.cond, idx, &seg(&p, &[Seg::K("if")]));
        if let ActionV1Beta1::ForEach(a) = &mut step.params {
            let pp = seg(&p, &[Seg::K("params")]);
            annotate_steps(&mut a.steps, idx, &seg(&pp, &[Seg::K("steps")]));
        }
    }
}

fn upgrade_step(step: StepV1Beta1) -> template::Step {
    let params = match step.params {
        ActionV1Beta1::Include(p) => template::Action::Include(template::Include {
            paths: p
                .paths
                .into_iter()
                .map(|ip| template::IncludePath {
                    paths: ip.paths,
                    as_: ip.as_,
                    skip: ip.skip,
                    from: ip.from,
                    strip_prefix: None,
                    add_prefix: None,
                })
                .collect(),
        }),
        ActionV1Beta1::Print(p) => template::Action::Print(p),
        ActionV1Beta1::Append(p) => template::Action::Append(p),
        ActionV1Beta1::GoTemplate(p) => template::Action::GoTemplate(p),
        ActionV1Beta1::StringReplace(p) => template::Action::StringReplace(p),
        ActionV1Beta1::RegexReplace(p) => template::Action::RegexReplace(p),
        ActionV1Beta1::RegexNameLookup(p) => template::Action::RegexNameLookup(p),
        ActionV1Beta1::ForEach(p) => template::Action::ForEach(template::ForEach {
            iterator: p.iterator,
            steps: p.steps.into_iter().map(upgrade_step).collect(),
        }),
    };
    template::Step {
        desc: step.desc,
        action: step.action,
        cond: step.cond,
        params,
    }
}
