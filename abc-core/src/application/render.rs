// abc-core/src/application/render.rs
//
// The render driver: download → load spec → resolve inputs → execute
// steps in a scratch dir → dry-run commit → commit → manifest. Nothing
// touches the destination until every step has succeeded.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::AbcError;
use crate::application::actions::{StepContext, execute_one};
use crate::application::scope::Scope;
use crate::application::{builtins, inputs, manifest};
use crate::domain::api::VarValue;
use crate::domain::api::manifest::is_safe_rel_path;
use crate::infrastructure::decode;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::{BackupDir, CopyHint, CopyParams, DirTracker, copy_recursive};
use crate::infrastructure::git::{self, StepDiffer};
use crate::infrastructure::jinja::JinjaRenderer;
use crate::ports::{Clock, DownloadRequest, Downloader, GitProtocol, Prompter};

pub struct RenderParams<'a> {
    pub cwd: &'a Path,
    pub source: &'a str,
    pub dest: &'a Path,
    /// Template-relative path of the spec file (default `spec.yaml`).
    pub spec_rel: &'a str,
    pub flag_inputs: BTreeMap<String, String>,
    pub input_files: Vec<PathBuf>,
    pub builtin_overrides: Vec<VarValue>,
    pub force_overwrite: bool,
    pub keep_temp_dirs: bool,
    pub skip_input_validation: bool,
    pub prompt: bool,
    pub accept_defaults: bool,
    pub upgrade_channel: String,
    pub git_protocol: GitProtocol,
    pub allow_non_git_dest: bool,
    pub debug_scratch_contents: bool,
    pub debug_step_diffs: bool,
    /// Golden-test renders skip the manifest so recorded trees stay clean.
    pub write_manifest: bool,
    pub is_release_build: bool,
    pub downloader: &'a dyn Downloader,
    pub prompter: Option<&'a mut dyn Prompter>,
    pub clock: &'a dyn Clock,
    pub stdout: &'a mut dyn Write,
}

#[derive(Debug)]
pub struct RenderResult {
    /// Dest-relative paths committed, in walk order.
    pub output_files: Vec<String>,
    pub manifest_path: Option<PathBuf>,
    /// Set when pre-existing files were backed up before overwriting.
    pub backup_dir: Option<PathBuf>,
}

pub fn render(params: RenderParams<'_>) -> Result<RenderResult, AbcError> {
    let mut params = params;

    if !is_safe_rel_path(params.spec_rel) {
        return Err(AbcError::UnsafePath(format!(
            "--spec must be a relative path without \"..\", got {:?}",
            params.spec_rel
        )));
    }
    check_git_dest(params.dest, params.allow_non_git_dest)?;

    let mut tracker = DirTracker::new(params.keep_temp_dirs);

    // 1. Materialize the template.
    let template_dir = tracker.track("abc-template-")?;
    let meta = params.downloader.download(&DownloadRequest {
        cwd: params.cwd,
        source: params.source,
        git_protocol: params.git_protocol,
        dest: &template_dir,
    })?;
    info!(source = params.source, "template downloaded");

    // 2. Load and upgrade the spec.
    let spec_path = template_dir.join(params.spec_rel);
    let template = decode::load_spec(&spec_path, params.is_release_build)?;
    debug!(desc = %template.desc.value, "spec loaded");

    // 3. Builtins, then user inputs.
    let builtin_vars = builtins::resolve(
        &template.features,
        &builtins::BuiltinSources {
            template_dir: &template_dir,
            dest: params.dest,
            source: params.source,
        },
        &params.builtin_overrides,
    )?;

    let renderer = JinjaRenderer::new();
    let resolved = inputs::resolve(inputs::ResolveParams {
        spec_inputs: &template.inputs,
        flag_inputs: &params.flag_inputs,
        input_files: &params.input_files,
        prompt: params.prompt,
        accept_defaults: params.accept_defaults,
        skip_validation: params.skip_input_validation,
        prompter: params.prompter.take(),
        renderer: &renderer,
        builtins: &builtin_vars,
    })?;

    // 4. Scratch; every step mutates this tree only.
    let scratch_dir = tracker.track("abc-scratch-")?;

    let mut base_vars = resolved.clone();
    for (k, v) in &builtin_vars {
        base_vars.insert(k.clone(), v.clone());
    }

    let mut differ = if params.debug_step_diffs {
        let repo = tracker.track("abc-stepdiff-")?;
        Some(StepDiffer::new(repo)?)
    } else {
        None
    };

    let mut ctx = StepContext {
        template_dir: &template_dir,
        scratch_dir: &scratch_dir,
        dest_dir: params.dest,
        spec_path: &spec_path,
        renderer: &renderer,
        features: &template.features,
        scope: Scope::new(base_vars),
        included_from_dest: Vec::new(),
        stdout: params.stdout,
    };

    // 5. Steps, in declaration order.
    for (i, step) in template.steps.iter().enumerate() {
        execute_one(step, &mut ctx)?;
        if params.debug_scratch_contents {
            log_scratch_contents(&scratch_dir, i, &step.desc.value)?;
        }
        if let Some(differ) = differ.as_mut() {
            let label = format!("step {}: {}", i, step.desc.value);
            let diff = differ.snapshot(&scratch_dir, &label)?;
            if !diff.is_empty() {
                info!("scratch diff after {}:\n{}", label, diff);
            }
        }
    }
    let included_from_dest = ctx.included_from_dest;

    // 6. Commit: dry run first so a collision leaves dest untouched.
    let mut backups = BackupDir::new(params.clock.now().timestamp());
    let mut output_files = Vec::new();
    for dry_run in [true, false] {
        let mut copy_params = CopyParams {
            src_root: &scratch_dir,
            dst_root: params.dest,
            dry_run,
            backups: &mut backups,
        };
        let force = params.force_overwrite;
        let included = &included_from_dest;
        output_files = copy_recursive(&mut copy_params, &mut |rel: &str| CopyHint {
            overwrite: force || included.iter().any(|p| p.as_str() == rel),
            backup_if_exists: true,
        })?;
    }
    info!(files = output_files.len(), "render committed");

    // 7. Manifest.
    let manifest_path = if params.write_manifest && !output_files.is_empty() {
        Some(manifest::write_manifest(&manifest::ManifestParams {
            dest: params.dest,
            content_root: &scratch_dir,
            template_dir: &template_dir,
            template_location: &meta.canonical_source,
            location_type: &meta.location_type,
            template_version: &meta.version,
            upgrade_channel: &params.upgrade_channel,
            inputs: &resolved,
            output_files: &output_files,
            clock: params.clock,
            is_release_build: params.is_release_build,
        })?)
    } else {
        None
    };

    // 8. Tracked temp dirs vanish here (unless kept for debugging).
    drop(tracker);

    Ok(RenderResult {
        output_files,
        manifest_path,
        backup_dir: backups.root().map(Path::to_path_buf),
    })
}

/// Rendering into a dir outside any git workspace is easy to fat-finger;
/// require an explicit opt-in.
fn check_git_dest(dest: &Path, allow_non_git: bool) -> Result<(), AbcError> {
    if allow_non_git {
        return Ok(());
    }
    let probe = nearest_existing(dest);
    if git::in_git_workspace(&probe) {
        return Ok(());
    }
    Err(InfrastructureError::ConfigError(format!(
        "the destination {} is not inside a git workspace; pass --allow-non-git-dest to render anyway",
        dest.display()
    ))
    .into())
}

fn nearest_existing(path: &Path) -> PathBuf {
    let mut current = path;
    while !current.exists() {
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current.to_path_buf()
}

fn log_scratch_contents(scratch: &Path, step_index: usize, desc: &str) -> Result<(), AbcError> {
    let mut listing = Vec::new();
    for entry in walkdir::WalkDir::new(scratch)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry =
            entry.map_err(|e| AbcError::InternalError(format!("walking scratch: {}", e)))?;
        if entry.file_type().is_file()
            && let Ok(rel) = entry.path().strip_prefix(scratch)
        {
            listing.push(rel.to_string_lossy().to_string());
        }
    }
    info!(
        step = step_index,
        desc, "scratch contents: [{}]",
        listing.join(", ")
    );
    Ok(())
}
