//! Observer trait for attempt-level conversion events.
//!
//! Inject an [`Arc<dyn ConversionObserver>`] via
//! [`crate::config::PressConfigBuilder::observer`] to be told which strategy
//! is running. A LibreOffice or browser attempt can take a minute, so a
//! terminal front-end wants to say *what* it is waiting on.
//!
//! # Example
//!
//! ```rust
//! use docpress::{AttemptRecord, ConversionObserver, PressConfig};
//! use std::sync::Arc;
//!
//! struct Logger;
//!
//! impl ConversionObserver for Logger {
//!     fn on_attempt_finished(&self, _source: &std::path::Path, record: &AttemptRecord) {
//!         eprintln!("{} → {}", record.strategy, record.status);
//!     }
//! }
//!
//! let config = PressConfig::builder()
//!     .observer(Arc::new(Logger))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{AttemptRecord, ConversionOutcome};
use std::path::Path;
use std::sync::Arc;

/// Called by the orchestrator as it walks the fallback chain.
///
/// Implementations must be `Send + Sync`: `convert_batch` runs several
/// requests concurrently and they share one observer. All methods default
/// to no-ops.
pub trait ConversionObserver: Send + Sync {
    /// Called once per request before the first strategy.
    fn on_request_start(&self, source: &Path, strategies: usize) {
        let _ = (source, strategies);
    }

    /// Called just before a strategy's `attempt` runs.
    fn on_attempt_start(&self, source: &Path, strategy: &str) {
        let _ = (source, strategy);
    }

    /// Called after a strategy was skipped, failed, or succeeded.
    fn on_attempt_finished(&self, source: &Path, record: &AttemptRecord) {
        let _ = (source, record);
    }

    /// Called once per request with the final outcome.
    fn on_request_complete(&self, source: &Path, outcome: &ConversionOutcome) {
        let _ = (source, outcome);
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopObserver;

impl ConversionObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::PressConfig`].
pub type ObserverHandle = Arc<dyn ConversionObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::AttemptStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        starts: AtomicUsize,
        finished: AtomicUsize,
    }

    impl ConversionObserver for Counting {
        fn on_attempt_start(&self, _source: &Path, _strategy: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_attempt_finished(&self, _source: &Path, _record: &AttemptRecord) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let o = NoopObserver;
        let src = Path::new("paper.tex");
        o.on_request_start(src, 8);
        o.on_attempt_start(src, "pandoc");
        o.on_attempt_finished(
            src,
            &AttemptRecord {
                strategy: "pandoc".into(),
                status: AttemptStatus::Skipped,
                detail: "missing pandoc".into(),
                duration_ms: 0,
            },
        );
    }

    #[test]
    fn arc_dyn_observer_counts() {
        let counting = Arc::new(Counting::default());
        let handle: ObserverHandle = counting.clone();
        let src = Path::new("paper.tex");
        handle.on_attempt_start(src, "tectonic");
        handle.on_attempt_start(src, "latexmk");
        assert_eq!(counting.starts.load(Ordering::SeqCst), 2);
        assert_eq!(counting.finished.load(Ordering::SeqCst), 0);
    }
}
