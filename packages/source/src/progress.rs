//! Progress reporting for crawls.
//!
//! The crawler reports through the [`ProgressCallback`] trait so it stays
//! independent of how progress is rendered. The CLI plugs in `indicatif`
//! bars; tests and library callers use [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a running crawl.
///
/// Implementations must be `Send + Sync` so one instance can be shared by
/// crawlers running concurrently.
pub trait ProgressCallback: Send + Sync {
    /// Sets the number of rows to be processed.
    fn set_total(&self, total: u64);

    /// Advances by `delta` processed rows.
    fn inc(&self, delta: u64);

    /// Replaces the status message (typically the current crawl stage).
    fn set_message(&self, msg: String);

    /// Marks the crawl complete, leaving a final message.
    fn finish(&self, msg: String);

    /// Removes the indicator without a final message (e.g. after a failed
    /// crawl).
    fn finish_and_clear(&self);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
