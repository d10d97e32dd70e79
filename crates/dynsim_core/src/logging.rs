//! Terminal logging for native hosts.

use crate::settings::LogLevel;
use anyhow::{Context, Result};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

/// Installs a terminal logger at `level`. Fails if a global logger is
/// already set; callers that may initialise twice can ignore the error.
pub fn init_terminal_logger(level: LogLevel) -> Result<()> {
    TermLogger::init(
        level.into(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("A global logger is already installed.")
}

/// Sets the global log level, installing a terminal logger on first use.
///
/// The terminal logger passes every record through, so the facade's max
/// level alone decides what is printed and later calls can move it both ways.
pub fn init_logging(level: LogLevel) {
    if init_terminal_logger(LogLevel::Trace).is_err() {
        log::trace!("Reusing the installed global logger");
    }
    log::set_max_level(level.into());
}
