#![warn(rust_2018_idioms, unused_lifetimes)]
#![allow(
    clippy::print_stderr,
    clippy::print_stdout,
    clippy::disallowed_methods,
    clippy::disallowed_types
)]

pub mod handlers;
pub mod models;
pub mod services;

use crate::handlers::{release, run, setup, testing};
use crate::models::args::{AppCommands, Cli, ReleaseAction};

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        AppCommands::Setup {} => setup::setup_project()?,
        AppCommands::Release { action } => match action {
            ReleaseAction::Tag { reference } => release::check_tag(&reference)?,
            ReleaseAction::Env { target } => release::print_env(&target)?,
            ReleaseAction::Verify { dockerfile, cross_config, workflow, target, archive } => {
                let inputs = release::VerifyInputs {
                    dockerfile: &dockerfile,
                    cross_config: &cross_config,
                    workflow: &workflow,
                    archive: archive.as_deref(),
                };
                release::verify(inputs, &target)?;
            },
            ReleaseAction::Build { strategy } => release::build(strategy)?,
            ReleaseAction::Package { binary, out } => release::package(&binary, &out)?,
        },
        AppCommands::Test { project } => testing::run_tests(project.as_deref())?,
        AppCommands::Doctest { project } => testing::run_doctests(project.as_deref())?,
        AppCommands::Run { config } => run::run_node(config.as_deref())?,
    }

    Ok(())
}
