//! Terminal colors for human output.

use owo_colors::Style;

/// Styles applied by [`super::HumanRenderer`]. Plain when colors are off.
#[derive(Default, Clone)]
pub struct Styles {
    /// The `✓` in front of a successful check.
    pub ok: Style,
    /// Keys of key/value lines.
    pub label: Style,
    /// Remote names in listings.
    pub remote: Style,
    /// The `(default)` marker.
    pub marker: Style,
}

impl Styles {
    /// Stylesheet with colors enabled.
    #[must_use]
    pub fn colored() -> Self {
        Self {
            ok: Style::new().green(),
            label: Style::new().dimmed(),
            remote: Style::new().bold().cyan(),
            marker: Style::new().yellow(),
        }
    }
}
