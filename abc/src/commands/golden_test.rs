// abc/src/commands/golden_test.rs
//
// USE CASE: Create, record, and verify golden tests.

use std::collections::BTreeMap;

use abc_core::application::golden::new_test::{NewTestParams, new_test};
use abc_core::application::golden::record::{RecordParams, record};
use abc_core::application::golden::verify::{VerifyParams, verify};
use abc_core::domain::api::VarValue;
use abc_core::infrastructure::adapters::{StdinPrompter, SystemClock};
use abc_core::ports::Prompter;

use crate::cli::{GoldenTestCommands, LocationArgs, NewTestArgs};
use crate::commands::IS_RELEASE_BUILD;

pub fn execute(command: GoldenTestCommands) -> anyhow::Result<()> {
    match command {
        GoldenTestCommands::NewTest(args) => execute_new_test(args),
        GoldenTestCommands::Record(args) => execute_record(args),
        GoldenTestCommands::Verify(args) => execute_verify(args),
    }
}

fn execute_new_test(args: NewTestArgs) -> anyhow::Result<()> {
    let flag_inputs: BTreeMap<String, String> = args.inputs.into_iter().collect();
    let builtin_overrides: Vec<VarValue> = args
        .builtin_vars
        .into_iter()
        .map(|(name, value)| VarValue::new(name, value))
        .collect();

    let mut prompter = StdinPrompter;
    let prompter_ref: Option<&mut dyn Prompter> = if args.prompt {
        Some(&mut prompter)
    } else {
        None
    };

    new_test(NewTestParams {
        template_dir: &args.location,
        test_name: &args.test_name,
        flag_inputs,
        input_files: args.input_files,
        builtin_overrides,
        prompt: args.prompt,
        force_overwrite: args.force_overwrite,
        is_release_build: IS_RELEASE_BUILD,
        prompter: prompter_ref,
        clock: &SystemClock,
    })?;
    Ok(())
}

fn execute_record(args: LocationArgs) -> anyhow::Result<()> {
    record(&RecordParams {
        location: &args.location,
        test_names: &args.test_names,
        is_release_build: IS_RELEASE_BUILD,
        clock: &SystemClock,
    })?;
    Ok(())
}

fn execute_verify(args: LocationArgs) -> anyhow::Result<()> {
    verify(&VerifyParams {
        location: &args.location,
        test_names: &args.test_names,
        is_release_build: IS_RELEASE_BUILD,
        clock: &SystemClock,
    })?;
    Ok(())
}
