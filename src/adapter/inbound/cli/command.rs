//! Command-line interface definitions.
//!
//! Every subcommand takes the packages of a deployment session in order;
//! `run` and `check` additionally read user inputs from a JSON file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Sequential deployment of infrastructure packages
#[derive(Parser, Debug)]
#[command(name = "tofuhub")]
#[command(version)]
pub struct Cli {
    /// Configuration file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = "tofuhub.toml")]
    pub config: PathBuf,

    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy the packages in order, streaming container output
    Run(SessionArgs),

    /// Check the inputs for name collisions without deploying
    Check(SessionArgs),

    /// Show the session built from the packages
    State(StateArgs),
}

/// Arguments shared by `run` and `check`.
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Package names, deployed in the given order
    #[arg(required = true)]
    pub packages: Vec<String>,

    /// JSON object of input values keyed by variable name
    #[arg(long, short = 'i')]
    pub inputs: Option<PathBuf>,
}

/// Arguments for `state`.
#[derive(Args, Debug)]
pub struct StateArgs {
    /// Package names
    #[arg(required = true)]
    pub packages: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_inputs() {
        let cli = Cli::try_parse_from([
            "tofuhub", "run", "vpc", "cluster", "--inputs", "inputs.json",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.packages, ["vpc", "cluster"]);
        assert_eq!(args.inputs, Some(PathBuf::from("inputs.json")));
        assert_eq!(cli.config, PathBuf::from("tofuhub.toml"));
    }

    #[test]
    fn packages_are_required() {
        assert!(Cli::try_parse_from(["tofuhub", "check"]).is_err());
    }
}
