//! lxd-provider: connect to LXD remotes and establish trust with them

use clap::Parser;

use lxd_provider::app::init_tracing;
use lxd_provider::cli::Cli;
use lxd_provider::output::json::{error_code, format_error};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    if let Err(e) = cli.run().await {
        if json && let Ok(obj) = format_error(&format!("{e:#}"), error_code(&e)) {
            eprintln!("{obj}");
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
}
