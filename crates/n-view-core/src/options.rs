//! Viewer options.
//!
//! n-view takes no flags and reads no config files, so these are the
//! built-in defaults. They live in one struct so the session loop and its
//! tests agree on them.
//!
//! | Option     | Default                           |
//! |------------|-----------------------------------|
//! | `quit_key` | Ctrl-Q (`0x11`)                   |
//! | `welcome`  | `n-view -- version <crate version>` |

use n_term::input::Key;

/// Crate version, shown in the welcome banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Settings for a viewing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Key that ends the session.
    pub quit_key: Key,
    /// Banner drawn a third of the way down an empty screen.
    pub welcome: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            quit_key: Key::ctrl(b'q'),
            welcome: welcome_message(),
        }
    }
}

/// The default welcome banner.
#[must_use]
pub fn welcome_message() -> String {
    format!("n-view -- version {VERSION}")
}
