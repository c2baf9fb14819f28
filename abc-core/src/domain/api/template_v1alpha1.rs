// abc-core/src/domain/api/template_v1alpha1.rs
//
// Template model for abc.dev/v1alpha1, the oldest schema. No input rules,
// no conditional steps, no regex actions, no for_each; include is a bare
// path list. Golden-test stdout capture postdates this version.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;

use crate::domain::api::template::{Append, GoTemplate, Print, StringReplace, decode_params};
use crate::domain::api::template_v1beta1::{
    ActionV1Beta1, IncludePathV1Beta1, IncludeV1Beta1, StepV1Beta1, TemplateV1Beta1,
};
use crate::domain::api::{API_V1BETA1, PosLookup, Seg, ann, ann_opt, de_scalar_opt, seg};
use crate::domain::error::Violations;
use crate::domain::features::Features;
use crate::domain::position::Spanned;

const ALPHA1_ACTIONS: &[&str] = &["append", "go_template", "include", "print", "string_replace"];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateV1Alpha1 {
    #[serde(default, alias = "apiVersion")]
    pub api_version: Spanned<String>,
    #[serde(default)]
    pub kind: Spanned<String>,
    #[serde(default)]
    pub desc: Spanned<String>,
    #[serde(default)]
    pub inputs: Vec<InputV1Alpha1>,
    #[serde(default)]
    pub steps: Vec<StepV1Alpha1>,
    #[serde(default)]
    pub features: Features,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputV1Alpha1 {
    #[serde(default)]
    pub name: Spanned<String>,
    #[serde(default)]
    pub desc: Spanned<String>,
    #[serde(default, deserialize_with = "de_scalar_opt")]
    pub default: Option<Spanned<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepV1Alpha1 {
    pub desc: Spanned<String>,
    pub action: Spanned<String>,
    pub params: ActionV1Alpha1,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionV1Alpha1 {
    Include(IncludeV1Alpha1),
    Print(Print),
    Append(Append),
    GoTemplate(GoTemplate),
    StringReplace(StringReplace),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncludeV1Alpha1 {
    #[serde(default)]
    pub paths: Vec<Spanned<String>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StepRaw {
    #[serde(default)]
    desc: Spanned<String>,
    #[serde(default)]
    action: Spanned<String>,
    #[serde(default)]
    params: serde_yaml::Value,
}

impl<'de> Deserialize<'de> for StepV1Alpha1 {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = StepRaw::deserialize(d)?;
        let params = match raw.action.as_str() {
            "include" => ActionV1Alpha1::Include(decode_params::<_, D>(raw.params, "include")?),
            "print" => ActionV1Alpha1::Print(decode_params::<_, D>(raw.params, "print")?),
            "append" => ActionV1Alpha1::Append(decode_params::<_, D>(raw.params, "append")?),
            "go_template" => {
                ActionV1Alpha1::GoTemplate(decode_params::<_, D>(raw.params, "go_template")?)
            }
            "string_replace" => {
                ActionV1Alpha1::StringReplace(decode_params::<_, D>(raw.params, "string_replace")?)
            }
            other => {
                return Err(D::Error::custom(format!(
                    "unknown action kind {:?}; valid choices are [{}]",
                    other,
                    ALPHA1_ACTIONS.join(", ")
                )));
            }
        };
        Ok(StepV1Alpha1 {
            desc: raw.desc,
            action: raw.action,
            params,
        })
    }
}

impl TemplateV1Alpha1 {
    pub fn validate(&self, out: &mut Violations) {
        if self.desc.value.trim().is_empty() {
            out.push(&self.desc.pos, "the template \"desc\" field is required");
        }
        let mut seen = HashSet::new();
        for input in &self.inputs {
            if input.name.value.is_empty() {
                out.push(&input.name.pos, "input \"name\" is required");
            } else if !seen.insert(input.name.value.clone()) {
                out.push(
                    &input.name.pos,
                    format!("input name {:?} appears more than once", input.name.value),
                );
            }
            if input.desc.value.trim().is_empty() {
                out.push(&input.desc.pos, "input \"desc\" is required");
            }
        }
        if self.steps.is_empty() {
            out.push(&self.kind.pos, "\"steps\" must contain at least one step");
        }
        for step in &self.steps {
            if step.desc.value.trim().is_empty() {
                out.push(&step.action.pos, "step \"desc\" is required");
            }
            if let ActionV1Alpha1::Include(p) = &step.params
                && p.paths.is_empty()
            {
                out.push(&step.action.pos, "include \"paths\" must not be empty");
            }
        }
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
        }
        for (i, step) in self.steps.iter_mut().enumerate() {
            let p = [Seg::K("steps"), Seg::I(i)];
            ann(&mut step.desc, idx, &seg(&p, &[Seg::K("desc")]));
            ann(&mut step.action, idx, &seg(&p, &[Seg::K("action")]));
        }
    }

    /// v1alpha1 → v1beta1. Stdout capture postdates this version.
    pub fn upgrade(self) -> TemplateV1Beta1 {
        TemplateV1Beta1 {
            api_version: Spanned::at(API_V1BETA1.to_string(), self.api_version.pos),
            kind: self.kind,
            desc: self.desc,
            inputs: self
                .inputs
                .into_iter()
                .map(|i| crate::domain::api::template::Input {
                    name: i.name,
                    desc: i.desc,
                    default: i.default,
                    rules: Vec::new(),
                })
                .collect(),
            steps: self.steps.into_iter().map(upgrade_step).collect(),
            features: self.features.merge(&Features {
                skip_stdout: true,
                ..Default::default()
            }),
        }
    }
}

fn upgrade_step(step: StepV1Alpha1) -> StepV1Beta1 {
    let params = match step.params {
        ActionV1Alpha1::Include(p) => ActionV1Beta1::Include(IncludeV1Beta1 {
            paths: vec![IncludePathV1Beta1 {
                paths: p.paths,
                as_: Vec::new(),
                skip: Vec::new(),
                from: None,
            }],
        }),
        ActionV1Alpha1::Print(p) => ActionV1Beta1::Print(p),
        ActionV1Alpha1::Append(p) => ActionV1Beta1::Append(p),
        ActionV1Alpha1::GoTemplate(p) => ActionV1Beta1::GoTemplate(p),
        ActionV1Alpha1::StringReplace(p) => ActionV1Beta1::StringReplace(p),
    };
    StepV1Beta1 {
        desc: step.desc,
        action: step.action,
        cond: None,
        params,
    }
}
