//! Logging facade re-exports and initialization

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from the `RUST_LOG` environment variable.
///
/// Panics if a logger was already installed; use [`try_init`] from code that
/// may run after another initializer (tests, embedding hosts).
pub fn init() {
    env_logger::init();
}

/// Fallible initialization; returns false if a logger was already installed.
pub fn try_init() -> bool {
    env_logger::try_init().is_ok()
}
