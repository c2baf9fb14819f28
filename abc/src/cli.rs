// abc/src/cli.rs

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "abc")]
#[command(version)]
#[command(about = "A command-line template rendering engine", long_about = None)]
pub struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, env = "ABC_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Log format: compact or pretty
    #[arg(long, global = true, env = "ABC_LOG_MODE", default_value = "compact")]
    pub log_mode: String,

    /// Shortcut for --log-level=debug
    #[arg(long, global = true, env = "ABC_VERBOSE")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Render a template into the destination directory
    Render(RenderArgs),

    /// 📖 Show a template's description and inputs
    Describe(DescribeArgs),

    /// 🧪 Record and verify golden tests
    #[command(subcommand, name = "golden-test")]
    GoldenTest(GoldenTestCommands),

    /// Legacy spelling: `abc templates <subcommand>`
    #[command(subcommand, hide = true)]
    Templates(TemplatesCommands),
}

/// The older `templates` command tree; kept so existing scripts survive.
#[derive(Subcommand)]
pub enum TemplatesCommands {
    Render(RenderArgs),
    Describe(DescribeArgs),
    #[command(subcommand, name = "golden-test")]
    GoldenTest(GoldenTestCommands),
}

#[derive(Subcommand)]
pub enum GoldenTestCommands {
    /// Create a new golden test and record its initial data
    #[command(name = "new-test")]
    NewTest(NewTestArgs),

    /// Render each test case and replace the recorded output
    Record(LocationArgs),

    /// Render each test case and compare against the recorded output
    Verify(LocationArgs),
}

#[derive(Args)]
pub struct RenderArgs {
    /// Template location (a local directory for now)
    pub source: String,

    /// Template input, repeatable (e.g. --input env=prod)
    #[arg(long = "input", value_parser = parse_key_val)]
    pub inputs: Vec<(String, String)>,

    /// YAML file of input values, repeatable
    #[arg(long = "input-file")]
    pub input_files: Vec<PathBuf>,

    /// Destination directory
    #[arg(long, default_value = ".")]
    pub dest: PathBuf,

    /// Template-relative path of the spec file
    #[arg(long, default_value = "spec.yaml")]
    pub spec: String,

    /// Protocol for remote git sources
    #[arg(long, env = "ABC_GIT_PROTOCOL", default_value = "https")]
    pub git_protocol: String,

    /// Overwrite destination files that differ
    #[arg(long)]
    pub force_overwrite: bool,

    /// Keep temp dirs (template copy, scratch) for debugging
    #[arg(long)]
    pub keep_temp_dirs: bool,

    /// Skip input rule checking
    #[arg(long)]
    pub skip_input_validation: bool,

    /// Interactively ask for missing inputs
    #[arg(long, env = "ABC_PROMPT")]
    pub prompt: bool,

    /// Use declared defaults instead of prompting
    #[arg(long, env = "ABC_ACCEPT_DEFAULTS")]
    pub accept_defaults: bool,

    /// Upgrade channel recorded in the manifest
    #[arg(long, env = "ABC_UPGRADE_CHANNEL", default_value = "")]
    pub upgrade_channel: String,

    /// Log the scratch directory contents after each step
    #[arg(long)]
    pub debug_scratch_contents: bool,

    /// Log a per-step diff of the scratch directory
    #[arg(long)]
    pub debug_step_diffs: bool,

    /// Allow a destination outside any git workspace
    #[arg(long)]
    pub allow_non_git_dest: bool,
}

#[derive(Args)]
pub struct DescribeArgs {
    /// Template location
    pub source: String,

    /// Protocol for remote git sources
    #[arg(long, env = "ABC_GIT_PROTOCOL", default_value = "https")]
    pub git_protocol: String,
}

#[derive(Args)]
pub struct NewTestArgs {
    /// Name of the new test case
    pub test_name: String,

    /// Template directory
    #[arg(default_value = ".")]
    pub location: PathBuf,

    /// Template input, repeatable
    #[arg(long = "input", value_parser = parse_key_val)]
    pub inputs: Vec<(String, String)>,

    /// YAML file of input values, repeatable
    #[arg(long = "input-file")]
    pub input_files: Vec<PathBuf>,

    /// Builtin override, repeatable (e.g. --builtin-var _git_tag=v1.2.3)
    #[arg(long = "builtin-var", value_parser = parse_key_val)]
    pub builtin_vars: Vec<(String, String)>,

    /// Interactively ask for missing inputs
    #[arg(long, env = "ABC_PROMPT")]
    pub prompt: bool,

    /// Replace the test if it already exists
    #[arg(long)]
    pub force_overwrite: bool,
}

#[derive(Args)]
pub struct LocationArgs {
    /// A template directory, or a tree containing several
    #[arg(default_value = ".")]
    pub location: PathBuf,

    /// Only run the named test cases (comma-separated, repeatable)
    #[arg(long = "test-name", value_delimiter = ',')]
    pub test_names: Vec<String>,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {:?}", s))
}
