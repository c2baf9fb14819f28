// abc-core/src/infrastructure/decode.rs
//
// Multi-version YAML decoder. Sniffs the api_version/kind header, picks the
// matching model from the registry, decodes strictly, annotates positions,
// validates, and (optionally) walks the upgrade chain to the newest model.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::AbcError;
use crate::domain::DomainError;
use crate::domain::api::{
    self, ApiObject, Kind, Upgraded, entry_for, newest,
};
use crate::infrastructure::error::{DecodeError, io_ctx};
use crate::infrastructure::yamlpos::PosIndex;

/// Minimal tolerant header: everything else in the document is ignored at
/// this stage.
#[derive(Debug, Deserialize)]
struct Header {
    api_version: Option<String>,
    #[serde(rename = "apiVersion")]
    api_version_camel: Option<String>,
    kind: Option<String>,
}

fn sniff_header(file: &str, src: &str) -> Result<(String, Kind, String), AbcError> {
    let header: Header = serde_yaml::from_str(src).map_err(|e| DecodeError::Parse {
        file: file.to_string(),
        msg: e.to_string(),
    })?;

    let api_version = match (header.api_version, header.api_version_camel) {
        (Some(_), Some(_)) => {
            return Err(DecodeError::BothApiVersionKeys {
                file: file.to_string(),
            }
            .into());
        }
        (Some(v), None) | (None, Some(v)) => v,
        (None, None) => {
            return Err(DecodeError::MissingField {
                file: file.to_string(),
                field: "api_version",
            }
            .into());
        }
    };

    let kind_str = header.kind.ok_or_else(|| DecodeError::MissingField {
        file: file.to_string(),
        field: "kind",
    })?;

    let kind = Kind::parse(&kind_str).ok_or_else(|| DecodeError::UnknownKind {
        file: file.to_string(),
        kind: kind_str.clone(),
        api_version: api_version.clone(),
    })?;

    Ok((api_version, kind, kind_str))
}

/// Typed strict decode, reshaping serde's unknown-field message into our
/// taxonomy.
fn strict_decode<T: serde::de::DeserializeOwned>(file: &str, src: &str) -> Result<T, AbcError> {
    serde_yaml::from_str(src).map_err(|e| {
        let msg = e.to_string();
        if let Some(err) = reshape_unknown_field(file, &msg) {
            err.into()
        } else {
            DecodeError::Parse {
                file: file.to_string(),
                msg,
            }
            .into()
        }
    })
}

/// `unknown field `x`, expected one of `a`, `b`` → our UnknownField error.
fn reshape_unknown_field(file: &str, msg: &str) -> Option<DecodeError> {
    let rest = msg.split("unknown field `").nth(1)?;
    let (field, tail) = rest.split_once('`')?;
    let choices: Vec<&str> = tail
        .split('`')
        .skip(1)
        .step_by(2)
        .take_while(|c| !c.contains('\n'))
        .collect();
    Some(DecodeError::UnknownField {
        file: file.to_string(),
        field: field.to_string(),
        choices: choices.join(", "),
    })
}

fn decode_as(
    file: &str,
    src: &str,
    api_version: &str,
    kind: Kind,
) -> Result<ApiObject, AbcError> {
    let object = match (api_version, kind) {
        (api::API_V1ALPHA1, Kind::Template) => {
            ApiObject::TemplateV1Alpha1(strict_decode(file, src)?)
        }
        (api::API_V1BETA1, Kind::Template) => ApiObject::TemplateV1Beta1(strict_decode(file, src)?),
        (api::API_V1BETA1, Kind::GoldenTest) => {
            ApiObject::GoldenTestV1Beta1(strict_decode(file, src)?)
        }
        (api::API_V1 | api::API_V2ALPHA1, Kind::Template) => {
            ApiObject::Template(strict_decode(file, src)?)
        }
        (api::API_V1 | api::API_V2ALPHA1, Kind::GoldenTest) => {
            ApiObject::GoldenTest(strict_decode(file, src)?)
        }
        (api::API_V1 | api::API_V2ALPHA1, Kind::Manifest) => {
            ApiObject::Manifest(strict_decode(file, src)?)
        }
        (api_version, kind) => {
            return Err(AbcError::InternalError(format!(
                "no model registered for api_version {:?} kind {:?}",
                api_version, kind
            )));
        }
    };
    Ok(object)
}

/// Decodes one YAML document into its versioned model.
///
/// `require_kind` rejects documents of the wrong kind with a targeted
/// error. `is_release_build` gates api versions marked unreleased.
pub fn decode(
    file: &str,
    src: &str,
    require_kind: Option<Kind>,
    is_release_build: bool,
) -> Result<ApiObject, AbcError> {
    let (api_version, kind, kind_str) = sniff_header(file, src)?;

    if let Some(want) = require_kind
        && kind != want
    {
        return Err(DecodeError::WrongKind {
            file: file.to_string(),
            got: kind_str,
            want: want.to_string(),
        }
        .into());
    }

    let entry = entry_for(&api_version).ok_or_else(|| DecodeError::UnknownApiVersion {
        file: file.to_string(),
        api_version: api_version.clone(),
    })?;
    if entry.unreleased && is_release_build {
        return Err(DecodeError::UnreleasedApiVersion {
            file: file.to_string(),
            api_version: api_version.clone(),
        }
        .into());
    }
    if !entry.kinds.contains(&kind) {
        return Err(DecodeError::UnknownKind {
            file: file.to_string(),
            kind: kind_str,
            api_version: api_version.clone(),
        }
        .into());
    }

    let idx = PosIndex::new(file, src);

    let decoded = decode_as(file, src, &api_version, kind).and_then(|mut object| {
        object.annotate(&idx);
        object.validate()?;
        Ok(object)
    });

    match decoded {
        Ok(object) => Ok(object),
        Err(original) => {
            // Speculative retry: the document may be authored against a
            // newer schema than its api_version claims.
            let newest_entry = newest(is_release_build);
            if newest_entry.api_version != api_version
                && newest_entry.kinds.contains(&kind)
                && let Ok(mut retry) = decode_as(file, src, newest_entry.api_version, kind)
            {
                retry.annotate(&idx);
                if retry.validate().is_ok() {
                    return Err(DecodeError::VersionUpgradeHint {
                        file: file.to_string(),
                        old: api_version,
                        new: newest_entry.api_version.to_string(),
                        original: original.to_string(),
                    }
                    .into());
                }
            }
            Err(original)
        }
    }
}

/// Decode, then walk the upgrade chain to the newest in-memory form,
/// re-validating after each hop. A post-upgrade validation failure is a
/// bug in an `upgrade()` implementation, not a user error.
pub fn decode_validate_upgrade(
    file: &str,
    src: &str,
    require_kind: Option<Kind>,
    is_release_build: bool,
) -> Result<ApiObject, AbcError> {
    let mut object = decode(file, src, require_kind, is_release_build)?;
    loop {
        match object.upgrade() {
            Upgraded::Latest(latest) => return Ok(latest),
            Upgraded::Next(next) => {
                next.validate().map_err(|e| {
                    DomainError::Internal(format!(
                        "model became invalid after upgrading to {}: {}",
                        next.api_version(),
                        e
                    ))
                })?;
                object = next;
            }
        }
    }
}

// --- FILE LOADERS ---

fn read_file(path: &Path) -> Result<String, AbcError> {
    fs::read_to_string(path)
        .map_err(|e| io_ctx("read", path, e).into())
}

/// Finds and decodes a `spec.yaml`, upgraded to the newest Template model.
pub fn load_spec(path: &Path, is_release_build: bool) -> Result<api::Template, AbcError> {
    let src = read_file(path)?;
    let object = decode_validate_upgrade(
        &path.display().to_string(),
        &src,
        Some(Kind::Template),
        is_release_build,
    )?;
    match object {
        ApiObject::Template(t) => Ok(t),
        other => Err(AbcError::InternalError(format!(
            "upgrade chain for {} stopped before the newest Template model ({})",
            path.display(),
            other.api_version()
        ))),
    }
}

/// Decodes a golden `test.yaml`, upgraded to the newest GoldenTest model.
pub fn load_golden_test(path: &Path, is_release_build: bool) -> Result<api::GoldenTest, AbcError> {
    let src = read_file(path)?;
    let object = decode_validate_upgrade(
        &path.display().to_string(),
        &src,
        Some(Kind::GoldenTest),
        is_release_build,
    )?;
    match object {
        ApiObject::GoldenTest(g) => Ok(g),
        other => Err(AbcError::InternalError(format!(
            "upgrade chain for {} stopped before the newest GoldenTest model ({})",
            path.display(),
            other.api_version()
        ))),
    }
}

/// Decodes a `manifest.yaml`.
pub fn load_manifest(path: &Path, is_release_build: bool) -> Result<api::Manifest, AbcError> {
    let src = read_file(path)?;
    let object = decode_validate_upgrade(
        &path.display().to_string(),
        &src,
        Some(Kind::Manifest),
        is_release_build,
    )?;
    match object {
        ApiObject::Manifest(m) => Ok(m),
        other => Err(AbcError::InternalError(format!(
            "upgrade chain for {} stopped before the newest Manifest model ({})",
            path.display(),
            other.api_version()
        ))),
    }
}
