//! `lxd-provider remote`: inspect configured remotes and their connections.

use anyhow::Result;
use clap::Subcommand;
use lxd_common::Protocol;

use crate::app::AppContext;
use crate::application::ports::{CertificateStore, ImageServer, InstanceServer};
use crate::application::services::{ServerHandle, WantProtocol};
use crate::domain::trust::certificate_fingerprint;
use crate::domain::{CheckReport, RemoteSummary};

/// Remote subcommands.
#[derive(Subcommand)]
pub enum RemoteCommand {
    /// List configured remotes
    List,
    /// Connect to a remote, establishing trust if needed
    Check {
        /// Remote name (default remote when omitted)
        name: Option<String>,
        /// Require this protocol (any when omitted)
        #[arg(long, value_enum)]
        protocol: Option<Protocol>,
    },
}

/// Run a remote subcommand.
///
/// # Errors
///
/// Returns the connection error for `check`, or a rendering error.
pub async fn run(app: &AppContext, cmd: RemoteCommand) -> Result<()> {
    match cmd {
        RemoteCommand::List => list(app),
        RemoteCommand::Check { name, protocol } => {
            let want = protocol.map_or(WantProtocol::Any, WantProtocol::from);
            check(app, name.as_deref().unwrap_or_default(), want).await
        }
    }
}

fn list(app: &AppContext) -> Result<()> {
    let default_remote = app.cache.default_remote();
    let rows: Vec<RemoteSummary> = app
        .cache
        .remotes()
        .iter()
        .map(|def| RemoteSummary::from_definition(def, &default_remote))
        .collect();
    app.renderer().render_remotes(&rows)
}

async fn check(app: &AppContext, name: &str, want: WantProtocol) -> Result<()> {
    let remote = app.cache.remote(name)?;
    let handle = app.cache.get_server(&remote.name, want).await?;

    let mut report = CheckReport {
        remote: remote.name.clone(),
        protocol: handle.protocol().to_string(),
        ..CheckReport::default()
    };

    match handle {
        ServerHandle::Instance(client) => {
            let server = client.get_server().await?;
            report.address = client.address();
            report.auth = Some(if server.is_trusted() { "trusted" } else { "untrusted" }.to_string());
            report.certificate_fingerprint = app
                .cache
                .bootstrapper()
                .store()
                .load_server_cert(&remote.name)?
                .map(|der| certificate_fingerprint(&der))
                .or_else(|| {
                    Some(server.environment.certificate_fingerprint.clone())
                        .filter(|fp| !fp.is_empty())
                });
            report.server_version = Some(server.environment.server_version);
        }
        ServerHandle::Image(client) => {
            report.address = client.address().to_string();
            report.images = Some(client.image_index().await?.image_count());
        }
    }

    app.renderer().render_check(&report)
}
