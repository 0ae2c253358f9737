//! Deferral queue for requests that ran out of retries while rate limited.
//!
//! Strict FIFO: `enqueue` appends, `drain` consumes from the head and stops at
//! the first entry that is rate limited again, leaving it at the head.
//! `clear` is the only operation that drops entries without attempting them.

use std::collections::VecDeque;
use std::time::Instant;

use crate::request::Request;
use crate::retry::ErrorKind;

/// A deferred request plus the bookkeeping needed to report on it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    /// Monotonic per-queue sequence number; doubles as a log handle so the
    /// prompt itself never has to be logged.
    pub seq: u64,
    pub request: Request,
    pub enqueued_at: Instant,
    /// Why the request was deferred. Always `RateLimited` today.
    pub reason: ErrorKind,
}

/// What a drain did.
#[derive(Debug)]
pub struct DrainReport<T> {
    /// Entries that completed, in the order they were attempted.
    pub completed: Vec<(QueueEntry, T)>,
    /// Entries dropped after a terminal non-rate-limit failure.
    pub failed: Vec<(QueueEntry, ErrorKind)>,
    /// True if the drain hit `RateLimited` and left entries queued.
    pub stopped_early: bool,
    /// Entries still queued after the drain.
    pub remaining: usize,
}

impl<T> DrainReport<T> {
    pub fn summary(&self) -> DrainSummary {
        DrainSummary {
            completed: self.completed.len(),
            failed: self.failed.len(),
            stopped_early: self.stopped_early,
            remaining: self.remaining,
        }
    }
}

/// Counts-only view of a drain, for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    pub completed: usize,
    pub failed: usize,
    pub stopped_early: bool,
    pub remaining: usize,
}

#[derive(Debug, Default)]
pub struct DeferralQueue {
    entries: VecDeque<QueueEntry>,
    next_seq: u64,
}

impl DeferralQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request at the tail and return the entry's sequence number.
    pub fn enqueue(&mut self, request: Request, reason: ErrorKind) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(QueueEntry {
            seq,
            request,
            enqueued_at: Instant::now(),
            reason,
        });
        seq
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at the head, i.e. the next one a drain attempts.
    pub fn front(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    /// Most recently enqueued entry.
    pub fn back(&self) -> Option<&QueueEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    /// Discard every entry. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    /// Attempt entries head-first with `attempt`.
    ///
    /// `Ok` and any `Err` other than `RateLimited` are terminal: the entry is
    /// removed. `Err(RateLimited)` puts the entry back at the head and ends the
    /// drain without touching the entries behind it.
    ///
    /// An entry leaves the queue only after `attempt` returns for it, so a
    /// panicking `attempt` leaves it at the head.
    pub fn drain<T, F>(&mut self, mut attempt: F) -> DrainReport<T>
    where
        F: FnMut(&QueueEntry) -> Result<T, ErrorKind>,
    {
        let mut completed = Vec::new();
        let mut failed = Vec::new();
        let mut stopped_early = false;

        while let Some(head) = self.entries.front() {
            let result = attempt(head);
            if let Err(ErrorKind::RateLimited) = result {
                stopped_early = true;
                break;
            }
            let Some(entry) = self.entries.pop_front() else {
                break;
            };
            match result {
                Ok(value) => completed.push((entry, value)),
                Err(kind) => failed.push((entry, kind)),
            }
        }

        DrainReport {
            completed,
            failed,
            stopped_early,
            remaining: self.entries.len(),
        }
    }
}
