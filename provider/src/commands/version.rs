//! `lxd-provider version`

use anyhow::Result;

use crate::app::AppContext;

/// Run the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run(app: &AppContext) -> Result<()> {
    app.renderer().render_version(env!("CARGO_PKG_VERSION"))
}
