//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, OutputFlags, TrustFlags};
use crate::commands;

/// Connect to LXD remotes and establish trust with them
#[derive(Parser)]
#[command(
    name = "lxd-provider",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "LXD_PROVIDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Trust a remote's certificate on first contact
    #[arg(long, global = true)]
    pub accept_remote_certificate: bool,

    /// Create the client certificate pair when it is missing
    #[arg(long, global = true)]
    pub generate_client_certificates: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = FalseyValueParser::new())]
    pub no_color: bool,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Inspect remotes
    #[command(subcommand)]
    Remote(commands::remote::RemoteCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the command fails.
    pub async fn run(self) -> Result<()> {
        let flags = AppFlags {
            output: OutputFlags {
                no_color: self.no_color,
                quiet: self.quiet,
                json: self.json,
            },
            trust: TrustFlags {
                accept_remote_certificate: self.accept_remote_certificate,
                generate_client_certificates: self.generate_client_certificates,
            },
            config: self.config,
        };
        let app = AppContext::new(&flags)?;

        match self.command {
            Command::Remote(cmd) => commands::remote::run(&app, cmd).await,
            Command::Version => commands::version::run(&app),
        }
    }
}
