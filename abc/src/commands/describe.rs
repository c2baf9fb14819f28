// abc/src/commands/describe.rs
//
// USE CASE: Show a template's description and inputs as a table.

use anyhow::Context;
use comfy_table::{Table, presets::UTF8_FULL};

use abc_core::application::describe;
use abc_core::infrastructure::adapters::LocalDownloader;
use abc_core::ports::GitProtocol;

use crate::cli::DescribeArgs;
use crate::commands::IS_RELEASE_BUILD;

pub fn execute(args: DescribeArgs) -> anyhow::Result<()> {
    let git_protocol: GitProtocol = args
        .git_protocol
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let cwd = std::env::current_dir().context("cannot determine the current directory")?;

    let summary = describe(
        &cwd,
        &args.source,
        git_protocol,
        &LocalDownloader,
        IS_RELEASE_BUILD,
    )
    .with_context(|| format!("failed to describe {:?}", args.source))?;

    println!("Description: {}\n", summary.desc);

    if summary.inputs.is_empty() {
        println!("This template takes no inputs.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Input name", "Description", "Default", "Rules"]);
    for input in &summary.inputs {
        // An absent default makes the input required; an empty-string
        // default prints as "".
        let default = match &input.default {
            None => "(required)".to_string(),
            Some(d) if d.is_empty() => "\"\"".to_string(),
            Some(d) => d.clone(),
        };
        table.add_row([
            input.name.clone(),
            input.desc.clone(),
            default,
            input.rules.join("\n"),
        ]);
    }
    println!("{table}");
    Ok(())
}
