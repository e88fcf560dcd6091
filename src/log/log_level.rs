/// Severity of a log line, least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lines an operator should see without opening the log file.
    pub fn is_alert(self) -> bool {
        self >= Self::Warn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_warn_and_error_alert() {
        assert!(!LogLevel::Info.is_alert());
        assert!(LogLevel::Warn.is_alert());
        assert!(LogLevel::Error.is_alert());
        assert!(LogLevel::Trace < LogLevel::Debug);
    }
}
