//! Output formatting: human and JSON renderers behind one `Renderer`.

pub mod human;
pub mod json;
pub mod styles;

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;
pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use styles::Styles;

use crate::domain::{CheckReport, RemoteSummary};

/// Output context carrying styling and quiet mode.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Colors are used only on a terminal and when neither `--no-color` nor
    /// `NO_COLOR` is set.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let use_colors =
            !no_color && Term::stdout().is_term() && std::env::var_os("NO_COLOR").is_none();
        Self {
            styles: if use_colors { Styles::colored() } else { Styles::default() },
            quiet,
        }
    }

    /// Print a success line prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.ok));
        }
    }

    /// Print an indented `key  value` line. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("    {:<16}{value}", key.style(self.styles.label));
        }
    }
}

/// Renderer selected by the `--json` flag.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// Render the configured remotes.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_remotes(&self, remotes: &[RemoteSummary]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_remotes(remotes);
                Ok(())
            }
            Self::Json(r) => r.render_remotes(remotes),
        }
    }

    /// Render the outcome of a connection check.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_check(&self, report: &CheckReport) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_check(report);
                Ok(())
            }
            Self::Json(r) => r.render_check(report),
        }
    }

    /// Render the binary version.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json(r) => r.render_version(version),
        }
    }
}
