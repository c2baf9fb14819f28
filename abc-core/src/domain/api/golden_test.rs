// abc-core/src/domain/api/golden_test.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::api::{API_V1, PosLookup, Seg, ann, de_scalar, seg};
use crate::domain::error::Violations;
use crate::domain::features::Features;
use crate::domain::position::Spanned;

/// One `name: value` pair in a test.yaml (or a manifest).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VarValue {
    #[serde(default)]
    pub name: Spanned<String>,
    #[serde(default, deserialize_with = "de_scalar")]
    pub value: Spanned<String>,
}

impl VarValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Spanned::new(name.into()),
            value: Spanned::new(value.into()),
        }
    }
}

/// Newest GoldenTest model (abc.dev/v1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoldenTest {
    #[serde(default, alias = "apiVersion")]
    pub api_version: Spanned<String>,
    #[serde(default)]
    pub kind: Spanned<String>,
    #[serde(default)]
    pub inputs: Vec<VarValue>,
    /// Overrides for underscore-prefixed builtins, pinned so renders are
    /// deterministic.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub builtin_vars: Vec<VarValue>,
    #[serde(default, skip_serializing_if = "features_is_default")]
    pub features: Features,
}

fn features_is_default(f: &Features) -> bool {
    *f == Features::default()
}

impl GoldenTest {
    pub fn validate(&self, out: &mut Violations) {
        let mut seen = HashSet::new();
        for input in &self.inputs {
            if input.name.value.is_empty() {
                out.push(&input.name.pos, "test input \"name\" is required");
            } else if input.name.value.starts_with('_') {
                out.push(
                    &input.name.pos,
                    format!(
                        "input name {:?} starts with _; set builtins under \"builtin_vars\"",
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
        for bv in &self.builtin_vars {
            if !bv.name.value.starts_with('_') {
                out.push(
                    &bv.name.pos,
                    format!(
                        "builtin var name {:?} must begin with an underscore",
                        bv.name.value
                    ),
                );
            }
        }
    }

    pub fn annotate(&mut self, idx: &dyn PosLookup) {
        ann(&mut self.api_version, idx, &[Seg::K("api_version")]);
        ann(&mut self.kind, idx, &[Seg::K("kind")]);
        annotate_vars(&mut self.inputs, idx, "inputs");
        annotate_vars(&mut self.builtin_vars, idx, "builtin_vars");
    }
}

/// GoldenTest model for abc.dev/v1beta1: no builtin_vars, no features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoldenTestV1Beta1 {
    #[serde(default, alias = "apiVersion")]
    pub api_version: Spanned<String>,
    #[serde(default)]
    pub kind: Spanned<String>,
    #[serde(default)]
    pub inputs: Vec<VarValue>,
}

impl GoldenTestV1Beta1 {
    pub fn validate(&self, out: &mut Violations) {
        let mut seen = HashSet::new();
        for input in &self.inputs {
            if input.name.value.is_empty() {
                out.push(&input.name.pos, "test input \"name\" is required");
            } else if !seen.insert(input.name.value.clone()) {
                out.push(
                    &input.name.pos,
                    format!("input name {:?} appears more than once", input.name.value),
                );
            }
        }
    }

    pub fn annotate(&mut self, idx: &dyn PosLookup) {
        ann(&mut self.api_version, idx, &[Seg::K("api_version")]);
        ann(&mut self.kind, idx, &[Seg::K("kind")]);
        annotate_vars(&mut self.inputs, idx, "inputs");
    }

    /// v1beta1 → v1. The same feature cutoffs as the template chain apply.
    pub fn upgrade(self) -> GoldenTest {
        GoldenTest {
            api_version: Spanned::at(API_V1.to_string(), self.api_version.pos),
            kind: self.kind,
            inputs: self.inputs,
            builtin_vars: Vec::new(),
            features: Features {
                skip_globs: true,
                skip_git_vars: true,
                skip_abc_renamed: true,
                ..Default::default()
            },
        }
    }
}

fn annotate_vars(vars: &mut [VarValue], idx: &dyn PosLookup, key: &'static str) {
    for (i, var) in vars.iter_mut().enumerate() {
        let p = [Seg::K(key), Seg::I(i)];
        ann(&mut var.name, idx, &seg(&p, &[Seg::K("name")]));
        ann(&mut var.value, idx, &seg(&p, &[Seg::K("value")]));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_with_builtin_vars() {
        let g: GoldenTest = serde_yaml::from_str(
            r#"
api_version: 'abc.dev/v1'
kind: 'GoldenTest'
inputs:
  - name: 'person_name'
    value: 'Bob'
builtin_vars:
  - name: '_git_tag'
    value: 'v1.2.3'
"#,
        )
        .unwrap();
        assert_eq!(g.inputs[0].value.value, "Bob");
        assert_eq!(g.builtin_vars[0].name.value, "_git_tag");
    }

    #[test]
    fn test_numeric_values_coerce_to_string() {
        let g: GoldenTest = serde_yaml::from_str(
            r#"
api_version: 'abc.dev/v1'
kind: 'GoldenTest'
inputs:
  - name: 'count'
    value: 7
  - name: 'flag'
    value: true
"#,
        )
        .unwrap();
        assert_eq!(g.inputs[0].value.value, "7");
        assert_eq!(g.inputs[1].value.value, "true");
    }

    #[test]
    fn test_validate_underscore_rules() {
        let g: GoldenTest = serde_yaml::from_str(
            r#"
api_version: 'abc.dev/v1'
kind: 'GoldenTest'
inputs:
  - name: '_oops'
    value: 'x'
builtin_vars:
  - name: 'not_builtin'
    value: 'y'
"#,
        )
        .unwrap();
        let mut out = Violations::default();
        g.validate(&mut out);
        let text = out.to_string();
        assert!(text.contains("starts with _"));
        assert!(text.contains("must begin with an underscore"));
    }

    #[test]
    fn test_v1beta1_upgrade_disables_newer_semantics() {
        let g: GoldenTestV1Beta1 = serde_yaml::from_str(
            r#"
api_version: 'abc.dev/v1beta1'
kind: 'GoldenTest'
inputs:
  - name: 'a'
    value: 'b'
"#,
        )
        .unwrap();
        let up = g.upgrade();
        assert!(up.features.skip_abc_renamed);
        assert!(!up.features.skip_stdout);
        assert!(up.builtin_vars.is_empty());
    }

    #[test]
    fn test_serialize_skips_empty_optionals() {
        let g = GoldenTest {
            api_version: "abc.dev/v1".into(),
            kind: "GoldenTest".into(),
            inputs: vec![VarValue::new("a", "b")],
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&g).unwrap();
        assert!(!yaml.contains("builtin_vars"));
        assert!(!yaml.contains("features"));
    }
}
