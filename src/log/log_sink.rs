use crate::log::log_level::LogLevel;

/// Destination for log lines. Every relay component holds an
/// `Arc<dyn LogSink>`; the `sink_*!` macros call into it.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str);
}
