//! Terminal output for the operator console.
//!
//! Status lines go to stderr with a colored glyph. Test output from the
//! browser is printed by [`crate::reporter`], not here.

mod format;
mod messages;

pub use format::{format_duration, format_size};
pub use messages::{error, info, success, warning};

/// Check if colored output should be enabled.
///
/// Respects `NO_COLOR` and `FORCE_COLOR`, then falls back to terminal
/// detection on stderr.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::user_attended_stderr()
}

/// Apply the color decision globally.
///
/// `no_color` from the command line always wins.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    console::set_colors_enabled(enabled);
    console::set_colors_enabled_stderr(enabled);
}
