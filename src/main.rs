mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

use crate::config::{Flags, Resolved, Settings};

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub settings: Resolved,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "provctl", &mut io::stdout());
        return Ok(());
    }

    let owner = match &cli.command {
        Command::Provision(args) => args.owner.clone(),
        _ => None,
    };
    let settings = Settings::load()?.resolve(Flags {
        providers_dir: cli.providers_dir,
        state_dir: cli.state_dir,
        terraform: cli.terraform,
        cluster_owner: owner,
    })?;

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        settings,
    };

    let result = match cli.command {
        Command::Provision(args) => commands::provision::run(&ctx, &args),
        Command::Destroy(args) => commands::destroy::run(&ctx, &args),
        Command::Status(args) => commands::status::run(&ctx, &args),
        Command::Providers => commands::providers::run(&ctx),
        Command::Completions { .. } => Ok(()),
    };

    if let Err(err) = &result {
        report_advice(err);
    }
    result
}

/// Print what kind of failure this was and what to do about it.
fn report_advice(err: &anyhow::Error) {
    if let Some((description, advice)) = advice_for(err) {
        ui::error(description);
        ui::dim(advice);
    }
}

/// Category description and advice of the first library error in the chain.
fn advice_for(err: &anyhow::Error) -> Option<(&'static str, &'static str)> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<provision::Error>() {
            let category = e.category();
            Some((category.description(), category.advice()))
        } else if let Some(e) = cause.downcast_ref::<tfkit::Error>() {
            let category = e.category();
            Some((category.description(), category.advice()))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;
    use std::path::PathBuf;

    #[test]
    fn test_advice_for_tool_error() {
        let err = Err::<(), _>(tfkit::Error::TerraformNotFound {
            searched: Some(PathBuf::from("/opt/terraform")),
        })
        .context("Terraform is not available")
        .unwrap_err();
        let category = tfkit::ErrorCategory::NotFound;
        assert_eq!(
            advice_for(&err),
            Some((category.description(), category.advice()))
        );
    }

    #[test]
    fn test_advice_for_provision_error() {
        let err = anyhow::Error::new(provision::Error::InvalidPlan("bad".to_string()));
        let category = provision::ErrorCategory::Configuration;
        assert_eq!(
            advice_for(&err),
            Some((category.description(), category.advice()))
        );
    }

    #[test]
    fn test_advice_for_other_errors() {
        assert_eq!(advice_for(&anyhow::anyhow!("plain failure")), None);
    }
}
