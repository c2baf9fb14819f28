// abc-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while decoding a YAML document into a versioned model.
#[derive(Error, Debug, Diagnostic)]
pub enum DecodeError {
    #[error("error parsing file {file}: {msg}")]
    #[diagnostic(
        code(abc::infra::yaml_parse),
        help("Check your YAML syntax (indentation, types).")
    )]
    Parse { file: String, msg: String },

    #[error("file {file} must set the field {field:?}")]
    #[diagnostic(code(abc::infra::missing_header_field))]
    MissingField { file: String, field: &'static str },

    #[error(
        "file {file} must not set both \"api_version\" and \"apiVersion\"; please use \"api_version\""
    )]
    #[diagnostic(code(abc::infra::duplicate_api_version_key))]
    BothApiVersionKeys { file: String },

    #[error("file {file} has kind {got:?}, but kind {want:?} is required here")]
    #[diagnostic(code(abc::infra::wrong_kind))]
    WrongKind {
        file: String,
        got: String,
        want: String,
    },

    #[error("file {file} has kind {kind:?}, which api_version {api_version:?} does not support")]
    #[diagnostic(code(abc::infra::unknown_kind))]
    UnknownKind {
        file: String,
        kind: String,
        api_version: String,
    },

    #[error(
        "file {file} sets api_version {api_version:?}, which is not known; you might need to upgrade your abc CLI"
    )]
    #[diagnostic(code(abc::infra::unknown_api_version))]
    UnknownApiVersion { file: String, api_version: String },

    #[error(
        "file {file} sets api_version {api_version:?}, which is not available in released builds; you might need to upgrade your abc CLI"
    )]
    #[diagnostic(code(abc::infra::unreleased_api_version))]
    UnreleasedApiVersion { file: String, api_version: String },

    #[error("{file}: unknown field name {field:?}; valid choices are [{choices}]")]
    #[diagnostic(code(abc::infra::unknown_field))]
    UnknownField {
        file: String,
        field: String,
        choices: String,
    },

    #[error(
        "file {file} is not valid under api_version {old:?}, but it will be valid if you change the api_version to {new:?}; the error under {old:?} was: {original}"
    )]
    #[diagnostic(code(abc::infra::api_version_too_old))]
    VersionUpgradeHint {
        file: String,
        old: String,
        new: String,
        original: String,
    },
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DECODING ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Decode(#[from] DecodeError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(abc::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    #[error("failed to {op} {path}: {source}")]
    #[diagnostic(code(abc::infra::io_ctx))]
    IoCtx {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(abc::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    // --- TEMPLATING ---
    #[error("Template Rendering Error: {0}")]
    #[diagnostic(
        code(abc::infra::template),
        help("Check your template syntax ({{ ... }}).")
    )]
    TemplateError(#[from] minijinja::Error),

    // --- EXTERNAL PROCESSES ---
    #[error("command {cmd:?} failed with exit code {code}: {stderr}")]
    #[diagnostic(code(abc::infra::process))]
    Process {
        cmd: String,
        code: i32,
        stderr: String,
    },

    #[error("command {cmd:?} timed out after {secs}s")]
    #[diagnostic(code(abc::infra::process_timeout))]
    ProcessTimeout { cmd: String, secs: u64 },
}

/// Shortcut to wrap an io error with the operation and path it hit.
pub fn io_ctx(op: &'static str, path: &std::path::Path, source: std::io::Error) -> InfrastructureError {
    InfrastructureError::IoCtx {
        op,
        path: path.display().to_string(),
        source,
    }
}
