//! Structured logging for the fixture server
//!
//! ## Usage
//!
//! ```rust
//! use fixture_server::logger::{self, LogTag};
//!
//! logger::error(LogTag::Webserver, "Bind failed");
//! logger::warning(LogTag::Ws, "Client sent invalid JSON");
//! logger::info(LogTag::System, "Fixture server started");
//! logger::debug(LogTag::Correlation, "Waiter registered"); // Only with --debug correlation
//! logger::verbose(LogTag::Faults, "Raw bytes: ..."); // Only with --verbose
//! ```
//!
//! ## Initialization
//!
//! Call once at startup with the parsed CLI flags:
//! ```rust
//! fixture_server::logger::init(&["ws".to_string()], false, false);
//! ```

mod config;
mod core;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger from CLI flags
///
/// Unknown debug keys are reported as a warning rather than rejected.
pub fn init(debug: &[String], verbose: bool, quiet: bool) {
    let (config, unknown) = config::from_flags(debug, verbose, quiet);
    config::set_logger_config(config);

    for key in unknown {
        warning(
            LogTag::System,
            &format!("Unknown debug tag '{}' (known: system, webserver, faults, ws, correlation, all)", key),
        );
    }
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (only when the tag's debug mode is on)
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only with --verbose)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Whether debug lines for `tag` are currently printed
///
/// Use to skip building expensive debug messages.
pub fn is_debug_enabled(tag: LogTag) -> bool {
    config::is_debug_enabled_for_tag(&tag)
}
