//! Log sink port.

/// Receives text chunks produced by running subprocesses.
///
/// Implementations must not block; they are called inline from the
/// output pump of a running step.
pub trait LogSink: Send + Sync {
    fn emit(&self, chunk: &str);
}

/// Discards every chunk.
pub struct NullSink;

impl LogSink for NullSink {
    fn emit(&self, _chunk: &str) {}
}
