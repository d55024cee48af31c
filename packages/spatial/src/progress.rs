//! Progress reporting for long-running batch passes.
//!
//! A neighbor-count run over a few hundred thousand incidents takes long
//! enough that callers want to see it move. The engine reports through
//! [`ProgressCallback`] so it stays independent of how (or whether) the
//! progress is rendered.

/// Trait for reporting progress from long-running operations.
///
/// Implementations must be `Send + Sync` so that one callback can be
/// shared by the parallel chunk workers.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}
