// abc-core/src/application/actions/include.rs
//
// Copies files from the template (or, with from=destination, from the
// user's dest dir) into the scratch tree, with optional renaming, skips,
// and prefix rewrites. Globs apply on the newest schema only.

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::AbcError;
use crate::application::actions::StepContext;
use crate::domain::api::template::{Include, IncludePath};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs as afs;

pub(crate) fn run(params: &Include, ctx: &mut StepContext<'_>) -> Result<(), AbcError> {
    for ip in &params.paths {
        run_one(ip, ctx)?;
    }
    Ok(())
}

fn run_one(ip: &IncludePath, ctx: &mut StepContext<'_>) -> Result<(), AbcError> {
    let from_dest = ip.from_destination();
    let base = if from_dest { ctx.dest_dir } else { ctx.template_dir };

    let skips: Vec<String> = ip
        .skip
        .iter()
        .map(|s| ctx.render_rel_path(s))
        .collect::<Result<_, _>>()?;

    let strip_prefix = ip
        .strip_prefix
        .as_ref()
        .map(|p| ctx.render_rel_path(p))
        .transpose()?;
    let add_prefix = ip
        .add_prefix
        .as_ref()
        .map(|p| ctx.render_rel_path(p))
        .transpose()?;

    for (i, raw) in ip.paths.iter().enumerate() {
        let rel = ctx.render_rel_path(raw)?;
        let rename_to = ip.as_.get(i).map(|a| ctx.render_rel_path(a)).transpose()?;

        let matches = expand(base, &rel, ctx, &raw.pos)?;
        for abs_src in matches {
            let match_rel = rel_of(base, &abs_src)?;
            let dst_rel = rewrite(
                &match_rel,
                &rel,
                rename_to.as_deref(),
                strip_prefix.as_deref(),
                add_prefix.as_deref(),
            );
            copy_matched(&abs_src, &dst_rel, ctx, &skips, base, from_dest)?;
        }
    }
    Ok(())
}

/// One path parameter → the absolute sources it names. Under skip_globs
/// the path is literal and must exist; otherwise it is a glob pattern
/// that must match at least one entry.
fn expand(
    base: &Path,
    rel: &str,
    ctx: &StepContext<'_>,
    pos: &crate::domain::Position,
) -> Result<Vec<PathBuf>, AbcError> {
    let literal = base.join(rel);
    if ctx.features.skip_globs {
        if !literal.exists() {
            return Err(InfrastructureError::ConfigError(format!(
                "{}include path {:?} does not exist",
                pos.prefix(),
                rel
            ))
            .into());
        }
        return Ok(vec![literal]);
    }

    // An existing literal path (notably ".") needs no glob machinery.
    if literal.exists() {
        return Ok(vec![literal]);
    }

    let pattern = base.join(rel).display().to_string();
    let mut matches: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| {
            InfrastructureError::ConfigError(format!(
                "{}invalid glob {:?}: {}",
                pos.prefix(),
                rel,
                e
            ))
        })?
        .collect::<Result<_, _>>()
        .map_err(|e| InfrastructureError::ConfigError(format!("glob {:?}: {}", rel, e)))?;
    if matches.is_empty() {
        return Err(InfrastructureError::ConfigError(format!(
            "{}include path {:?} matched no files",
            pos.prefix(),
            rel
        ))
        .into());
    }
    matches.sort();
    Ok(matches)
}

fn rel_of(base: &Path, abs: &Path) -> Result<String, AbcError> {
    let rel = abs
        .strip_prefix(base)
        .map_err(|_| AbcError::UnsafePath(abs.display().to_string()))?;
    let rel = rel.to_string_lossy().to_string();
    if rel.is_empty() {
        // Including "." means the whole base dir lands at the scratch root.
        Ok(".".to_string())
    } else {
        Ok(rel)
    }
}

/// Applies the destination rewrite: `as` replaces the matched path
/// wholesale; otherwise strip_prefix/add_prefix adjust it.
fn rewrite(
    match_rel: &str,
    pattern_rel: &str,
    rename_to: Option<&str>,
    strip_prefix: Option<&str>,
    add_prefix: Option<&str>,
) -> String {
    let mut out = match rename_to {
        // The glob may have matched deeper than the pattern itself; keep
        // the suffix under the new name.
        Some(to) => match match_rel.strip_prefix(pattern_rel) {
            Some(suffix) => format!("{}{}", to, suffix),
            None => to.to_string(),
        },
        None => match_rel.to_string(),
    };
    if let Some(strip) = strip_prefix {
        if let Some(stripped) = out
            .strip_prefix(strip)
            .map(|s| s.trim_start_matches('/').to_string())
        {
            out = stripped;
        }
    }
    if let Some(add) = add_prefix {
        out = format!("{}/{}", add.trim_end_matches('/'), out);
    }
    out
}

fn copy_matched(
    abs_src: &Path,
    dst_rel: &str,
    ctx: &mut StepContext<'_>,
    skips: &[String],
    base: &Path,
    from_dest: bool,
) -> Result<(), AbcError> {
    if abs_src.is_file() {
        if abs_src == ctx.spec_path {
            debug!("not copying the spec file into the output");
            return Ok(());
        }
        let src_rel = rel_of(base, abs_src)?;
        if skipped(&src_rel, skips) {
            return Ok(());
        }
        copy_one(abs_src, dst_rel, ctx, from_dest)?;
        return Ok(());
    }

    for entry in WalkDir::new(abs_src).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            InfrastructureError::ConfigError(format!("walking {}: {}", abs_src.display(), e))
        })?;
        if entry.path_is_symlink() {
            return Err(AbcError::UnsafePath(format!(
                "{} is a symlink; symlinks are not supported in templates",
                entry.path().display()
            )));
        }
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path() == ctx.spec_path {
            debug!("not copying the spec file into the output");
            continue;
        }

        let src_rel = rel_of(base, entry.path())?;
        if skipped(&src_rel, skips) {
            debug!(path = %src_rel, "skipped by include.skip");
            continue;
        }

        let under_match = entry
            .path()
            .strip_prefix(abs_src)
            .map_err(|e| AbcError::InternalError(e.to_string()))?
            .to_string_lossy()
            .to_string();
        let file_dst = if dst_rel == "." {
            under_match.clone()
        } else if under_match.is_empty() {
            dst_rel.to_string()
        } else {
            format!("{}/{}", dst_rel, under_match)
        };
        copy_one(entry.path(), &file_dst, ctx, from_dest)?;
    }
    Ok(())
}

fn copy_one(
    src: &Path,
    dst_rel: &str,
    ctx: &mut StepContext<'_>,
    from_dest: bool,
) -> Result<(), AbcError> {
    let dst = afs::safe_join(ctx.scratch_dir, dst_rel)?;
    afs::copy_file_preserving_mode(src, &dst)?;
    if from_dest {
        ctx.included_from_dest.push(dst_rel.to_string());
    }
    Ok(())
}

fn skipped(rel: &str, skips: &[String]) -> bool {
    skips
        .iter()
        .any(|s| rel == s || rel.starts_with(&format!("{}/", s)))
}
