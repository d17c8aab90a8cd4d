/// Core logging implementation with automatic filtering
use super::config::{get_logger_config, LoggerConfig};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Check if a log message should be displayed
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Anything above the minimum level threshold is dropped
/// 3. Debug level requires the tag's debug mode
pub fn should_log(config: &LoggerConfig, tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }

    if level > config.min_level {
        return false;
    }

    if level == LogLevel::Debug {
        return config.debug_tags.contains(tag);
    }

    true
}

/// Internal logging function with automatic filtering
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&get_logger_config(), &tag, level) {
        return;
    }

    super::format::format_and_log(tag, level, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_always_pass() {
        let config = LoggerConfig {
            min_level: LogLevel::Warning,
            ..Default::default()
        };
        assert!(should_log(&config, &LogTag::Ws, LogLevel::Error));
        assert!(!should_log(&config, &LogTag::Ws, LogLevel::Info));
    }

    #[test]
    fn test_debug_is_gated_per_tag() {
        let mut config = LoggerConfig {
            min_level: LogLevel::Debug,
            ..Default::default()
        };
        config.debug_tags.insert(LogTag::Correlation);

        assert!(should_log(&config, &LogTag::Correlation, LogLevel::Debug));
        assert!(!should_log(&config, &LogTag::Faults, LogLevel::Debug));
        assert!(!should_log(&config, &LogTag::Correlation, LogLevel::Verbose));
    }
}
