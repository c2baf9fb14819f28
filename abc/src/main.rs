// abc/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, TemplatesCommands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Setup Logging (Tracing)
    // ABC_LOG_LEVEL=debug abc render ... pour voir les détails
    init_logging(&cli);

    // 2. Dispatch. The legacy `templates` tree maps onto the same
    // commands.
    let result = match cli.command {
        Commands::Render(args) | Commands::Templates(TemplatesCommands::Render(args)) => {
            commands::render::execute(args)
        }
        Commands::Describe(args) | Commands::Templates(TemplatesCommands::Describe(args)) => {
            commands::describe::execute(args)
        }
        Commands::GoldenTest(command)
        | Commands::Templates(TemplatesCommands::GoldenTest(command)) => {
            commands::golden_test::execute(command)
        }
    };

    if let Err(e) = result {
        eprintln!("💥 {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else {
        cli.log_level.as_str()
    };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_mode == "pretty" {
        builder.pretty().init();
    } else {
        builder.compact().init();
    }
}
