// abc-core/src/domain/api/mod.rs
//
// Schema version registry: an ordered list, oldest first, of api versions
// and the kinds each one understands. The decoder picks the concrete model
// from (api_version, kind); the upgrade chain lifts old models into the
// newest in-memory form, flipping feature flags off for behavior the old
// version predates.

pub mod golden_test;
pub mod manifest;
pub mod template;
pub mod template_v1alpha1;
pub mod template_v1beta1;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::fmt;

use crate::domain::error::{DomainError, Violations};
use crate::domain::position::{Position, Spanned};

pub use golden_test::{GoldenTest, GoldenTestV1Beta1, VarValue};
pub use manifest::{Manifest, OutputFile};
pub use template::Template;
pub use template_v1alpha1::TemplateV1Alpha1;
pub use template_v1beta1::TemplateV1Beta1;

// --- API VERSION STRINGS ---

pub const API_V1ALPHA1: &str = "abc.dev/v1alpha1";
pub const API_V1BETA1: &str = "abc.dev/v1beta1";
pub const API_V1: &str = "abc.dev/v1";
pub const API_V2ALPHA1: &str = "abc.dev/v2alpha1";

// --- KINDS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Template,
    GoldenTest,
    Manifest,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Template => write!(f, "Template"),
            Kind::GoldenTest => write!(f, "GoldenTest"),
            Kind::Manifest => write!(f, "Manifest"),
        }
    }
}

impl Kind {
    pub fn parse(s: &str) -> Option<Kind> {
        match s {
            "Template" => Some(Kind::Template),
            "GoldenTest" => Some(Kind::GoldenTest),
            "Manifest" => Some(Kind::Manifest),
            _ => None,
        }
    }
}

// --- REGISTRY ---

#[derive(Debug, Clone, Copy)]
pub struct VersionEntry {
    pub api_version: &'static str,
    /// Selectable only on non-release builds.
    pub unreleased: bool,
    pub kinds: &'static [Kind],
}

/// Ordered oldest first. Kinds only grow across versions.
pub static REGISTRY: &[VersionEntry] = &[
    VersionEntry {
        api_version: API_V1ALPHA1,
        unreleased: false,
        kinds: &[Kind::Template],
    },
    VersionEntry {
        api_version: API_V1BETA1,
        unreleased: false,
        kinds: &[Kind::Template, Kind::GoldenTest],
    },
    VersionEntry {
        api_version: API_V1,
        unreleased: false,
        kinds: &[Kind::Template, Kind::GoldenTest, Kind::Manifest],
    },
    VersionEntry {
        api_version: API_V2ALPHA1,
        unreleased: true,
        kinds: &[Kind::Template, Kind::GoldenTest, Kind::Manifest],
    },
];

pub fn entry_for(api_version: &str) -> Option<&'static VersionEntry> {
    REGISTRY.iter().find(|e| e.api_version == api_version)
}

/// Newest entry selectable for the given build flavor.
pub fn newest(is_release_build: bool) -> &'static VersionEntry {
    // REGISTRY always contains at least one released entry.
    REGISTRY
        .iter()
        .rev()
        .find(|e| !is_release_build || !e.unreleased)
        .unwrap_or(&REGISTRY[0])
}

// --- POSITION LOOKUP (implemented by infrastructure::yamlpos) ---

/// One segment of a YAML path: a mapping key or a sequence index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seg {
    K(&'static str),
    I(usize),
}

/// Resolves a YAML path to a source position. Unknown paths resolve to the
/// default (unknown) position.
pub trait PosLookup {
    fn lookup(&self, path: &[Seg]) -> Position;
}

/// A lookup that knows nothing; every path is unpositioned.
pub struct NoPos;

impl PosLookup for NoPos {
    fn lookup(&self, _path: &[Seg]) -> Position {
        Position::default()
    }
}

pub(crate) fn ann(s: &mut Spanned<String>, idx: &dyn PosLookup, path: &[Seg]) {
    s.pos = idx.lookup(path);
}

pub(crate) fn ann_opt(s: &mut Option<Spanned<String>>, idx: &dyn PosLookup, path: &[Seg]) {
    if let Some(s) = s {
        s.pos = idx.lookup(path);
    }
}

/// Builds `parent + [tail...]` without mutating the parent path.
pub(crate) fn seg(parent: &[Seg], tail: &[Seg]) -> Vec<Seg> {
    let mut v = Vec::with_capacity(parent.len() + tail.len());
    v.extend_from_slice(parent);
    v.extend_from_slice(tail);
    v
}

// --- THE TAGGED UNION OF EVERY DECODABLE MODEL ---

#[derive(Debug, Clone, PartialEq)]
pub enum ApiObject {
    TemplateV1Alpha1(TemplateV1Alpha1),
    TemplateV1Beta1(TemplateV1Beta1),
    Template(Template),
    GoldenTestV1Beta1(GoldenTestV1Beta1),
    GoldenTest(GoldenTest),
    Manifest(Manifest),
}

/// Result of one upgrade hop. `Latest` is the chain's stop sentinel.
pub enum Upgraded {
    Next(ApiObject),
    Latest(ApiObject),
}

impl ApiObject {
    pub fn kind(&self) -> Kind {
        match self {
            ApiObject::TemplateV1Alpha1(_)
            | ApiObject::TemplateV1Beta1(_)
            | ApiObject::Template(_) => Kind::Template,
            ApiObject::GoldenTestV1Beta1(_) | ApiObject::GoldenTest(_) => Kind::GoldenTest,
            ApiObject::Manifest(_) => Kind::Manifest,
        }
    }

    pub fn api_version(&self) -> &str {
        match self {
            ApiObject::TemplateV1Alpha1(t) => t.api_version.as_str(),
            ApiObject::TemplateV1Beta1(t) => t.api_version.as_str(),
            ApiObject::Template(t) => t.api_version.as_str(),
            ApiObject::GoldenTestV1Beta1(g) => g.api_version.as_str(),
            ApiObject::GoldenTest(g) => g.api_version.as_str(),
            ApiObject::Manifest(m) => m.api_version.as_str(),
        }
    }

    /// Fills source positions on every spanned scalar.
    pub fn annotate(&mut self, idx: &dyn PosLookup) {
        match self {
            ApiObject::TemplateV1Alpha1(t) => t.annotate(idx),
            ApiObject::TemplateV1Beta1(t) => t.annotate(idx),
            ApiObject::Template(t) => t.annotate(idx),
            ApiObject::GoldenTestV1Beta1(g) => g.annotate(idx),
            ApiObject::GoldenTest(g) => g.annotate(idx),
            ApiObject::Manifest(m) => m.annotate(idx),
        }
    }

    /// Aggregates every structural violation in the model.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut violations = Violations::default();
        match self {
            ApiObject::TemplateV1Alpha1(t) => t.validate(&mut violations),
            ApiObject::TemplateV1Beta1(t) => t.validate(&mut violations),
            ApiObject::Template(t) => t.validate(&mut violations),
            ApiObject::GoldenTestV1Beta1(g) => g.validate(&mut violations),
            ApiObject::GoldenTest(g) => g.validate(&mut violations),
            ApiObject::Manifest(m) => m.validate(&mut violations),
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation(violations))
        }
    }

    /// One hop along the upgrade chain.
    pub fn upgrade(self) -> Upgraded {
        match self {
            ApiObject::TemplateV1Alpha1(t) => {
                Upgraded::Next(ApiObject::TemplateV1Beta1(t.upgrade()))
            }
            ApiObject::TemplateV1Beta1(t) => Upgraded::Next(ApiObject::Template(t.upgrade())),
            ApiObject::GoldenTestV1Beta1(g) => Upgraded::Next(ApiObject::GoldenTest(g.upgrade())),
            latest => Upgraded::Latest(latest),
        }
    }
}

// --- SCALAR COERCION ---

/// Decodes a YAML scalar of any primitive type into its string form.
/// Mappings and sequences are rejected.
pub(crate) fn de_scalar<'de, D: Deserializer<'de>>(d: D) -> Result<Spanned<String>, D::Error> {
    let value = serde_yaml::Value::deserialize(d)?;
    scalar_to_string(&value)
        .map(Spanned::new)
        .ok_or_else(|| D::Error::custom("expected a scalar value"))
}

pub(crate) fn de_scalar_opt<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Spanned<String>>, D::Error> {
    let value = serde_yaml::Value::deserialize(d)?;
    if value.is_null() {
        return Ok(None);
    }
    scalar_to_string(&value)
        .map(|s| Some(Spanned::new(s)))
        .ok_or_else(|| D::Error::custom("expected a scalar value"))
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
