/// Log tags identify the subsystem a line comes from
///
/// Each tag can have its debug output enabled independently with
/// `--debug <tag>`.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Webserver,
    Faults,
    Ws,
    Correlation,
}

impl LogTag {
    pub const ALL: [LogTag; 5] = [
        LogTag::System,
        LogTag::Webserver,
        LogTag::Faults,
        LogTag::Ws,
        LogTag::Correlation,
    ];

    /// Key used by `--debug <key>`
    pub fn to_debug_key(&self) -> &'static str {
        match self {
            LogTag::System => "system",
            LogTag::Webserver => "webserver",
            LogTag::Faults => "faults",
            LogTag::Ws => "ws",
            LogTag::Correlation => "correlation",
        }
    }

    pub fn from_debug_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        LogTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.to_debug_key() == key)
    }

    /// Fixed-width label printed in front of every line
    pub fn to_plain_string(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Webserver => "WEBSERVER",
            LogTag::Faults => "FAULTS",
            LogTag::Ws => "WS",
            LogTag::Correlation => "CORRELATE",
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
