//! Cancellation and deadlines for remote calls.
//!
//! A [`RequestContext`] carries a cancellation flag shared by every context
//! derived from it, plus an optional deadline. Deriving a child with
//! [`RequestContext::with_timeout`] never extends the parent's deadline.

use crate::error::{Error, Result};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context with no deadline that is never cancelled unless asked.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derives a child that shares cancellation and expires after `timeout`
    /// or at the parent's deadline, whichever comes first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < candidate => parent,
            _ => candidate,
        };

        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(deadline),
        }
    }

    /// Cancels this context and every context sharing its flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fails if the context was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.remaining() {
            Some(left) if left.is_zero() => Err(Error::Timeout(
                "context deadline exceeded".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
