// abc-core/src/domain/api/manifest.rs
//
// The record of one rendering: exact inputs, template dirhash, and the
// hash of every output file. Written next to the rendered output so a
// later run can verify or upgrade it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use crate::domain::api::{PosLookup, Seg, ann, ann_opt, seg};
use crate::domain::api::golden_test::VarValue;
use crate::domain::error::Violations;
use crate::domain::position::Spanned;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default, alias = "apiVersion")]
    pub api_version: Spanned<String>,
    #[serde(default)]
    pub kind: Spanned<String>,
    #[serde(default)]
    pub template_location: Spanned<String>,
    #[serde(default)]
    pub location_type: Spanned<String>,
    #[serde(default)]
    pub template_dirhash: Spanned<String>,
    #[serde(default, skip_serializing_if = "spanned_is_empty")]
    pub template_version: Spanned<String>,
    #[serde(default, skip_serializing_if = "spanned_is_empty")]
    pub upgrade_channel: Spanned<String>,
    #[serde(default = "epoch")]
    pub creation_time: DateTime<Utc>,
    #[serde(default = "epoch")]
    pub modification_time: DateTime<Utc>,
    #[serde(default)]
    pub inputs: Vec<VarValue>,
    #[serde(default)]
    pub output_files: Vec<OutputFile>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn spanned_is_empty(s: &Spanned<String>) -> bool {
    s.value.is_empty()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputFile {
    #[serde(default)]
    pub file: Spanned<String>,
    #[serde(default)]
    pub hash: Spanned<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Spanned<String>>,
}

/// True when `p` is relative and free of `..` elements.
pub fn is_safe_rel_path(p: &str) -> bool {
    let path = Path::new(p);
    !p.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

impl Manifest {
    pub fn validate(&self, out: &mut Violations) {
        if self.template_dirhash.value.is_empty() {
            out.push(
                &self.template_dirhash.pos,
                "\"template_dirhash\" is required",
            );
        }
        if self.template_location.value.is_empty() {
            out.push(
                &self.template_location.pos,
                "\"template_location\" is required",
            );
        }
        for of in &self.output_files {
            if of.file.value.is_empty() {
                out.push(&of.file.pos, "output file name must not be empty");
            } else if !is_safe_rel_path(&of.file.value) {
                out.push(
                    &of.file.pos,
                    format!(
                        "output file name {:?} must be relative and must not contain \"..\"",
                        of.file.value
                    ),
                );
            }
            if of.hash.value.is_empty() {
                out.push(&of.hash.pos, "output file hash must not be empty");
            }
        }
    }

    pub fn annotate(&mut self, idx: &dyn PosLookup) {
        ann(&mut self.api_version, idx, &[Seg::K("api_version")]);
        ann(&mut self.kind, idx, &[Seg::K("kind")]);
        ann(
            &mut self.template_location,
            idx,
            &[Seg::K("template_location")],
        );
        ann(
            &mut self.template_dirhash,
            idx,
            &[Seg::K("template_dirhash")],
        );
        for (i, of) in self.output_files.iter_mut().enumerate() {
            let p = [Seg::K("output_files"), Seg::I(i)];
            ann(&mut of.file, idx, &seg(&p, &[Seg::K("file")]));
            ann(&mut of.hash, idx, &seg(&p, &[Seg::K("hash")]));
            ann_opt(&mut of.patch, idx, &seg(&p, &[Seg::K("patch")]));
        }
    }
}
