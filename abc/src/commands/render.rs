// abc/src/commands/render.rs
//
// USE CASE: Render a template into the destination directory.

use std::collections::BTreeMap;
use std::io::Write as _;

use anyhow::Context;
use tracing::debug;

use abc_core::application::{RenderParams, render};
use abc_core::infrastructure::adapters::{LocalDownloader, StdinPrompter, SystemClock};
use abc_core::ports::{GitProtocol, Prompter};

use crate::cli::RenderArgs;
use crate::commands::IS_RELEASE_BUILD;

pub fn execute(args: RenderArgs) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    let git_protocol: GitProtocol = args
        .git_protocol
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let cwd = std::env::current_dir().context("cannot determine the current directory")?;
    debug!(source = %args.source, dest = %args.dest.display(), "starting render");

    // Last --input wins when a name repeats.
    let flag_inputs: BTreeMap<String, String> = args.inputs.into_iter().collect();

    let mut prompter = StdinPrompter;
    let prompter_ref: Option<&mut dyn Prompter> = if args.prompt {
        Some(&mut prompter)
    } else {
        None
    };

    let mut stdout = std::io::stdout();
    let result = render(RenderParams {
        cwd: &cwd,
        source: &args.source,
        dest: &args.dest,
        spec_rel: &args.spec,
        flag_inputs,
        input_files: args.input_files,
        builtin_overrides: Vec::new(),
        force_overwrite: args.force_overwrite,
        keep_temp_dirs: args.keep_temp_dirs,
        skip_input_validation: args.skip_input_validation,
        prompt: args.prompt,
        accept_defaults: args.accept_defaults,
        upgrade_channel: args.upgrade_channel,
        git_protocol,
        allow_non_git_dest: args.allow_non_git_dest,
        debug_scratch_contents: args.debug_scratch_contents,
        debug_step_diffs: args.debug_step_diffs,
        write_manifest: true,
        is_release_build: IS_RELEASE_BUILD,
        downloader: &LocalDownloader,
        prompter: prompter_ref,
        clock: &SystemClock,
        stdout: &mut stdout,
    })
    .with_context(|| format!("failed to render {:?}", args.source))?;
    stdout.flush().ok();

    eprintln!(
        "✨ rendered {} file(s) in {:.2?}",
        result.output_files.len(),
        start.elapsed()
    );
    if let Some(backup) = result.backup_dir {
        eprintln!("   overwritten files were backed up under {}", backup.display());
    }
    Ok(())
}
