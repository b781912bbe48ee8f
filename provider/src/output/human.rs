//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::domain::{CheckReport, RemoteSummary};
use crate::output::OutputContext;

/// Renders reports as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the binary version.
    pub fn render_version(&self, version: &str) {
        if !self.ctx.quiet {
            println!("lxd-provider {version}");
        }
    }

    /// Render configured remotes, one per line, default marked.
    pub fn render_remotes(&self, remotes: &[RemoteSummary]) {
        if self.ctx.quiet {
            return;
        }
        let width = remotes.iter().map(|r| r.name.len()).max().unwrap_or(0);
        for remote in remotes {
            let marker = if remote.default { " (default)" } else { "" };
            println!(
                "  {:<width$}  {:<13}  {}{}",
                remote.name.style(self.ctx.styles.remote),
                remote.protocol,
                remote.address,
                marker.style(self.ctx.styles.marker),
            );
        }
    }

    /// Render a successful connection check.
    pub fn render_check(&self, report: &CheckReport) {
        self.ctx.success(&format!("Connected to remote '{}'", report.remote));
        self.ctx.kv("Protocol:", &report.protocol);
        self.ctx.kv("Address:", &report.address);
        if let Some(version) = &report.server_version {
            self.ctx.kv("Server version:", version);
        }
        if let Some(auth) = &report.auth {
            self.ctx.kv("Auth:", auth);
        }
        if let Some(fp) = &report.certificate_fingerprint {
            self.ctx.kv("Certificate:", fp);
        }
        if let Some(images) = report.images {
            self.ctx.kv("Image streams:", &images.to_string());
        }
    }
}
