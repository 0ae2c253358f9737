//! Attempt/outcome reporting.
//!
//! The dispatcher reports every attempt, every deferral and every drain to an
//! injected `AttemptObserver`. `TracingObserver` turns those into log events.

use crate::queue::{DrainSummary, QueueEntry};
use crate::retry::{AttemptOutcome, AttemptRecord};

pub trait AttemptObserver: Send {
    /// Called once per transport attempt, success or failure.
    fn attempt(&self, record: &AttemptRecord);

    /// Called after a request was appended to the deferral queue.
    fn deferred(&self, _entry: &QueueEntry, _queue_len: usize) {}

    /// Called after a drain of a non-empty queue.
    fn drained(&self, _summary: &DrainSummary) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AttemptObserver for NoopObserver {
    fn attempt(&self, _record: &AttemptRecord) {}
}

/// Default observer: structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AttemptObserver for TracingObserver {
    fn attempt(&self, record: &AttemptRecord) {
        let attempt = record.index + 1;
        match record.outcome {
            AttemptOutcome::Success => {
                tracing::info!(attempt, budget = record.budget, "call succeeded");
            }
            AttemptOutcome::Failure(kind) => match record.wait {
                Some(wait) => tracing::warn!(
                    attempt,
                    budget = record.budget,
                    %kind,
                    status = ?record.status,
                    wait_ms = wait.as_millis() as u64,
                    "attempt failed, retrying"
                ),
                None => tracing::error!(
                    attempt,
                    budget = record.budget,
                    %kind,
                    status = ?record.status,
                    "attempt failed, giving up"
                ),
            },
        }
    }

    fn deferred(&self, entry: &QueueEntry, queue_len: usize) {
        tracing::info!(seq = entry.seq, queue_len, "request deferred");
    }

    fn drained(&self, summary: &DrainSummary) {
        if summary.stopped_early {
            tracing::warn!(
                completed = summary.completed,
                failed = summary.failed,
                remaining = summary.remaining,
                "rate limited again while draining deferred requests"
            );
        } else {
            tracing::info!(
                completed = summary.completed,
                failed = summary.failed,
                "deferred requests drained"
            );
        }
    }
}
