// abc-core/src/application/actions/mod.rs
//
// The eight step executors. Each one has the same shape: resolve its
// parameters against the scope, then mutate the scratch tree.

pub mod append;
pub mod for_each;
pub mod go_template;
pub mod include;
pub mod print;
pub mod regex_name_lookup;
pub mod regex_replace;
pub mod string_replace;

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::AbcError;
use crate::application::scope::Scope;
use crate::domain::api::template::{Action, Step};
use crate::domain::features::Features;
use crate::domain::position::Spanned;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::jinja::JinjaRenderer;

/// Mutable state threaded through every step of one render.
pub struct StepContext<'a> {
    pub template_dir: &'a Path,
    pub scratch_dir: &'a Path,
    pub dest_dir: &'a Path,
    /// Absolute path of the spec file, never copied into the output.
    pub spec_path: &'a Path,
    pub renderer: &'a JinjaRenderer,
    pub features: &'a Features,
    pub scope: Scope,
    /// Scratch-relative paths pulled from the destination; these may
    /// overwrite their origin at commit time.
    pub included_from_dest: Vec<String>,
    /// Where `print` goes; a capture buffer in golden tests.
    pub stdout: &'a mut dyn Write,
}

impl StepContext<'_> {
    /// Renders a path-ish parameter and confines it under the scratch
    /// tree (relative, no `..`).
    pub(crate) fn render_rel_path(&self, raw: &Spanned<String>) -> Result<String, AbcError> {
        let rendered = self.renderer.render(&raw.value, &self.scope.flatten())?;
        if !crate::domain::api::manifest::is_safe_rel_path(&rendered) {
            return Err(AbcError::UnsafePath(format!(
                "{}{:?}",
                raw.pos.prefix(),
                rendered
            )));
        }
        Ok(rendered)
    }
}

/// Runs steps in declaration order, honoring each step's `if`.
pub fn execute_steps(steps: &[Step], ctx: &mut StepContext<'_>) -> Result<(), AbcError> {
    for step in steps {
        execute_one(step, ctx)?;
    }
    Ok(())
}

pub fn execute_one(step: &Step, ctx: &mut StepContext<'_>) -> Result<(), AbcError> {
    if let Some(cond) = &step.cond {
        let truthy = ctx.renderer.eval_bool(&cond.value, &ctx.scope.flatten())?;
        if !truthy {
            debug!(step = %step.desc.value, cond = %cond.value, "skipping step");
            return Ok(());
        }
    }
    debug!(step = %step.desc.value, action = %step.action.value, "executing step");
    match &step.params {
        Action::Include(p) => include::run(p, ctx),
        Action::Print(p) => print::run(p, ctx),
        Action::Append(p) => append::run(p, ctx),
        Action::GoTemplate(p) => go_template::run(p, ctx),
        Action::StringReplace(p) => string_replace::run(p, ctx),
        Action::RegexReplace(p) => regex_replace::run(p, ctx),
        Action::RegexNameLookup(p) => regex_name_lookup::run(p, ctx),
        Action::ForEach(p) => for_each::run(p, ctx),
    }
}

/// Resolves one scratch-relative path to the files it names: the file
/// itself, or every file under it when it is a directory.
pub(crate) fn files_under(
    ctx: &StepContext<'_>,
    raw: &Spanned<String>,
) -> Result<Vec<PathBuf>, AbcError> {
    let rel = ctx.render_rel_path(raw)?;
    let abs = ctx.scratch_dir.join(&rel);
    if abs.is_file() {
        return Ok(vec![abs]);
    }
    if !abs.is_dir() {
        return Err(InfrastructureError::ConfigError(format!(
            "{}path {:?} does not exist in the scratch directory",
            raw.pos.prefix(),
            rel
        ))
        .into());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&abs).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            InfrastructureError::ConfigError(format!("walking {:?}: {}", rel, e))
        })?;
        if entry.file_type().is_file() {
            files.push(entry.path().to_path_buf());
        }
    }
    Ok(files)
}
