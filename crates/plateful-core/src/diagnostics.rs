//! Advisory failure channel
//!
//! Some writes are best-effort: the activity event after a like, the level
//! refresh after a review. Their failures must not fail the primary
//! operation, but they must not vanish either. Each one is logged, counted,
//! kept in a bounded ring buffer and broadcast to live subscribers.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

/// A best-effort write that did not happen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisoryFailure {
    /// Operation whose secondary write failed
    pub operation: String,
    /// Who was acting
    pub actor: Option<UserId>,
    /// Document the primary operation touched
    pub subject: String,
    /// Rendered error
    pub error: String,
    /// When it failed
    pub at: DateTime<Utc>,
}

/// Bounded, observable record of advisory failures
#[derive(Debug, Clone)]
pub struct Diagnostics {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    capacity: usize,
    recent: Mutex<VecDeque<AdvisoryFailure>>,
    total: AtomicU64,
    live: broadcast::Sender<AdvisoryFailure>,
}

impl Diagnostics {
    /// Keep at most `capacity` recent failures
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (live, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(Inner {
                capacity,
                recent: Mutex::new(VecDeque::with_capacity(capacity)),
                total: AtomicU64::new(0),
                live,
            }),
        }
    }

    /// Record a failure
    pub fn record(&self, failure: AdvisoryFailure) {
        warn!(
            operation = %failure.operation,
            subject = %failure.subject,
            error = %failure.error,
            "advisory write failed"
        );
        metrics::counter!("plateful.ledger.advisory_failure").increment(1);
        self.inner.total.fetch_add(1, Ordering::Relaxed);
        {
            let mut recent = self.inner.recent.lock();
            if recent.len() == self.inner.capacity {
                recent.pop_front();
            }
            recent.push_back(failure.clone());
        }
        // No subscribers is fine.
        let _ = self.inner.live.send(failure);
    }

    /// Retained failures, oldest first
    #[must_use]
    pub fn recent(&self) -> Vec<AdvisoryFailure> {
        self.inner.recent.lock().iter().cloned().collect()
    }

    /// Failures recorded since creation, including evicted ones
    #[must_use]
    pub fn total(&self) -> u64 {
        self.inner.total.load(Ordering::Relaxed)
    }

    /// Receive failures as they happen
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AdvisoryFailure> {
        self.inner.live.subscribe()
    }

    /// Drop retained failures
    pub fn clear(&self) {
        self.inner.recent.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(n: usize) -> AdvisoryFailure {
        AdvisoryFailure {
            operation: "set_restaurant_like".into(),
            actor: Some(UserId::from("u1")),
            subject: format!("restaurants/r{n}"),
            error: "network error: offline".into(),
            at: Utc::now(),
        }
    }

    #[test]
    fn ring_buffer_evicts_oldest() {
        let diagnostics = Diagnostics::new(2);
        for n in 0..3 {
            diagnostics.record(failure(n));
        }
        let subjects: Vec<_> = diagnostics.recent().into_iter().map(|f| f.subject).collect();
        assert_eq!(subjects, vec!["restaurants/r1", "restaurants/r2"]);
        assert_eq!(diagnostics.total(), 3);

        diagnostics.clear();
        assert!(diagnostics.recent().is_empty());
        assert_eq!(diagnostics.total(), 3);
    }

    #[tokio::test]
    async fn subscribers_receive_live_failures() {
        let diagnostics = Diagnostics::new(4);
        let mut rx = diagnostics.subscribe();
        diagnostics.clone().record(failure(7));
        assert_eq!(rx.recv().await.unwrap().subject, "restaurants/r7");
    }
}
