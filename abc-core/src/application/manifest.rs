// abc-core/src/application/manifest.rs
//
// Writes the manifest recording one render: exact inputs, template
// dirhash, and a content hash per output file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::AbcError;
use crate::domain::api::manifest::{Manifest, OutputFile};
use crate::domain::api::{API_V1, VarValue};
use crate::infrastructure::decode;
use crate::infrastructure::fs as afs;
use crate::infrastructure::hash;
use crate::ports::Clock;

pub const MANIFEST_DIR: &str = ".abc";
pub const MANIFEST_NAME: &str = "manifest.yaml";

pub struct ManifestParams<'a> {
    pub dest: &'a Path,
    /// Where the committed files' content can be hashed (the scratch tree,
    /// which is byte-identical to what landed in dest).
    pub content_root: &'a Path,
    pub template_dir: &'a Path,
    pub template_location: &'a str,
    pub location_type: &'a str,
    pub template_version: &'a str,
    pub upgrade_channel: &'a str,
    pub inputs: &'a BTreeMap<String, String>,
    pub output_files: &'a [String],
    pub clock: &'a dyn Clock,
    pub is_release_build: bool,
}

pub fn write_manifest(params: &ManifestParams<'_>) -> Result<PathBuf, AbcError> {
    let now = params.clock.now();
    let path = params.dest.join(MANIFEST_DIR).join(MANIFEST_NAME);

    // A re-render updates modification_time but keeps the original
    // creation_time.
    let creation_time = match decode::load_manifest(&path, params.is_release_build) {
        Ok(existing) if path.exists() => existing.creation_time,
        _ => now,
    };

    let mut output_files = Vec::with_capacity(params.output_files.len());
    for rel in params.output_files {
        let hash = hash::file_hash(&params.content_root.join(rel))?;
        output_files.push(OutputFile {
            file: rel.as_str().into(),
            hash: hash.as_str().into(),
            patch: None,
        });
    }

    let manifest = Manifest {
        api_version: API_V1.into(),
        kind: "Manifest".into(),
        template_location: params.template_location.into(),
        location_type: params.location_type.into(),
        template_dirhash: hash::dir_hash(params.template_dir)?.as_str().into(),
        template_version: params.template_version.into(),
        upgrade_channel: params.upgrade_channel.into(),
        creation_time,
        modification_time: now,
        inputs: params
            .inputs
            .iter()
            .map(|(name, value)| VarValue::new(name.clone(), value.clone()))
            .collect(),
        output_files,
    };

    let yaml = serde_yaml::to_string(&manifest)
        .map_err(crate::infrastructure::error::InfrastructureError::YamlError)?;
    afs::ensure_dir(params.dest.join(MANIFEST_DIR).as_path())?;
    afs::atomic_write(&path, yaml)?;
    debug!(path = %path.display(), "manifest written");
    Ok(path)
}
