//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Remove non-required bundled system apps after managed provisioning
#[derive(Parser)]
#[command(
    name = "appcull",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Delete the non-required system apps for a user
    Run(commands::run::RunArgs),

    /// Show the current deletion candidates without deleting anything
    List(commands::list::ListArgs),
}

impl Cli {
    /// Dispatch the parsed command.
    ///
    /// # Errors
    ///
    /// Returns an error when the selected command fails.
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Run(args) => commands::run::execute(args, self.no_color).await,
            Command::List(args) => commands::list::execute(args).await,
        }
    }
}
