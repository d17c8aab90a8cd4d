/// Severity of a log line
///
/// Ordered from most to least severe, so a logger configured with
/// `min_level` prints every level that compares `<=` to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    /// Default threshold
    Info = 2,
    /// Printed only for tags enabled with `--debug <tag>`
    Debug = 3,
    /// `--verbose`
    Verbose = 4,
}

impl LogLevel {
    /// Label printed in the level column
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERBOSE",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
