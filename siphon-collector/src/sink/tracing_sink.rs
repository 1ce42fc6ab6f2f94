use tracing::debug;

use super::LogSink;

/// Target used for forwarded crash entries
pub const CRASH_LOG_TARGET: &str = "crash_log";

/// Writes entries to the application log at debug level
///
/// Enable with `RUST_LOG=crash_log=debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn emit(&self, tag: &str, text: &str) {
        debug!(target: CRASH_LOG_TARGET, tag = %tag, "{}", text);
    }
}
