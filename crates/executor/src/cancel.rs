//! Cancellation and deadlines (§5).
//!
//! The executor checks [`CancellationToken::is_cancelled`] between candidate
//! documents and [`ExecutionContext::deadline_exceeded`] at the same
//! boundary; the script engine receives the same context so a long-running
//! script aborts at its next statement boundary rather than only between
//! documents (§5 "Suspension points").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A shared, cloneable flag a caller can flip to abort an in-flight search.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once [`CancellationToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Per-request execution context: cancellation plus an optional deadline
/// (§5 "Timeouts").
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Cooperative cancellation flag, checked between documents.
    pub cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecutionContext {
    /// A context with no deadline and a fresh cancellation token.
    pub fn new() -> Self {
        ExecutionContext { cancel: CancellationToken::new(), deadline: None }
    }

    /// Attaches a deadline `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// True once the configured deadline (if any) has elapsed.
    pub fn deadline_exceeded(&self) -> bool {
        self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
