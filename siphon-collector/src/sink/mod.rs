//! Log sinks
//!
//! A sink is where decoded crash entries end up. The collection job only
//! knows the [`LogSink`] trait; which sink runs is a configuration choice:
//! - [`TracingLogSink`]: application log through `tracing`
//! - [`BufferedLogSink`]: in-memory buffer, drained by the caller
//! - [`JsonLinesSink`]: one JSON record per line in a local file

mod buffered;
mod jsonl;
mod tracing_sink;

use std::sync::Arc;

pub use buffered::BufferedLogSink;
pub use jsonl::JsonLinesSink;
pub use tracing_sink::TracingLogSink;

/// Trait for log sinks
///
/// Emitting is fire-and-forget: a sink that cannot deliver a record reports
/// the problem through its own logging and returns normally.
///
/// # Thread Safety
/// Sinks are shared between the scheduler and the blocking collection
/// thread, so implementations must be Send + Sync.
pub trait LogSink: Send + Sync {
    /// Forward one decoded entry
    ///
    /// # Arguments
    /// * `tag` - The entry tag
    /// * `text` - The decoded payload
    fn emit(&self, tag: &str, text: &str);
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn emit(&self, tag: &str, text: &str) {
        (**self).emit(tag, text)
    }
}
