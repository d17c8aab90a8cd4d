/// Runtime logger configuration
///
/// Set once at startup from the command line; read on every log call.
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

use super::levels::LogLevel;
use super::tags::LogTag;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Lines above this level are dropped
    pub min_level: LogLevel,

    /// Tags whose debug lines are printed
    pub debug_tags: HashSet<LogTag>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

/// Build a config from CLI flags
///
/// `debug` holds tag keys; `all` enables every tag. Unknown keys are
/// returned so the caller can warn about them.
pub fn from_flags(debug: &[String], verbose: bool, quiet: bool) -> (LoggerConfig, Vec<String>) {
    let mut config = LoggerConfig::default();
    let mut unknown = Vec::new();

    for key in debug {
        if key.eq_ignore_ascii_case("all") {
            config.debug_tags.extend(LogTag::ALL);
            continue;
        }
        match LogTag::from_debug_key(key) {
            Some(tag) => {
                config.debug_tags.insert(tag);
            }
            None => unknown.push(key.clone()),
        }
    }

    if !config.debug_tags.is_empty() {
        config.min_level = LogLevel::Debug;
    }
    if verbose {
        config.min_level = LogLevel::Verbose;
    }
    if quiet {
        config.min_level = LogLevel::Warning;
    }

    (config, unknown)
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().debug_tags.contains(tag)
}
