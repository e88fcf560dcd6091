use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::log::log_level::LogLevel;

/// A single log record on its way to the writer thread.
#[derive(Debug, Clone)]
pub struct LogMsg {
    pub level: LogLevel,
    /// Milliseconds since the UNIX epoch.
    pub ts_ms: u128,
    pub text: String,
    /// Usually `module_path!()` of the call site.
    pub target: &'static str,
}

impl LogMsg {
    pub fn new(level: LogLevel, text: impl Into<String>, target: &'static str, ts_ms: u128) -> Self {
        Self {
            level,
            ts_ms,
            text: text.into(),
            target,
        }
    }

    /// Stamped with the current wall clock.
    pub fn now(level: LogLevel, text: impl Into<String>, target: &'static str) -> Self {
        Self::new(level, text, target, now_millis())
    }
}

/// File line format: `[Level] ts_ms target | text`.
impl fmt::Display for LogMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}] {} {} | {}",
            self.level, self.ts_ms, self.target, self.text
        )
    }
}

pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
