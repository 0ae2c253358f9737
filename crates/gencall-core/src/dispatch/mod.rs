//! Call dispatcher: one logical call at a time.
//!
//! A call first drains the deferral queue (best effort, FIFO, stopping at the
//! first entry that is rate limited again), then runs the retry loop for the
//! caller's own request. A request that exhausts its retries while rate
//! limited is moved to the tail of the queue before the failure is returned.

use std::time::{Duration, Instant};

use crate::observe::{AttemptObserver, TracingObserver};
use crate::queue::{DeferralQueue, QueueEntry};
use crate::request::{Request, Response};
use crate::retry::{
    run_with_retry, CallError, ErrorKind, RetryFailure, RetryOutcome, RetryPolicy, Sleeper,
    ThreadSleeper,
};
use crate::transport::Transport;

/// Cooldown after a drain is rate limited and the service gave no hint.
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// Longest cooldown a dispatcher will record, whatever the hint or config says.
pub const MAX_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

/// A response produced while draining the queue, kept for the caller that
/// originally submitted the request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedDeferral {
    pub seq: u64,
    pub request: Request,
    pub response: Response,
    pub enqueued_at: Instant,
}

pub struct Dispatcher {
    transport: Box<dyn Transport>,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
    observer: Box<dyn AttemptObserver>,
    queue: DeferralQueue,
    /// Earliest instant the next drain may start.
    cooldown_until: Option<Instant>,
    rate_limit_cooldown: Duration,
    completed: Vec<CompletedDeferral>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("policy", &self.policy)
            .field("queue_len", &self.queue.len())
            .field("cooldown_until", &self.cooldown_until)
            .field("completed", &self.completed.len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher with real sleeps and tracing output.
    pub fn new(transport: impl Transport + 'static, policy: RetryPolicy) -> Self {
        Self {
            transport: Box::new(transport),
            policy,
            sleeper: Box::new(ThreadSleeper),
            observer: Box::new(TracingObserver),
            queue: DeferralQueue::new(),
            cooldown_until: None,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
            completed: Vec::new(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn with_observer(mut self, observer: impl AttemptObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn with_rate_limit_cooldown(mut self, cooldown: Duration) -> Self {
        self.rate_limit_cooldown = cooldown;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn queue(&self) -> &DeferralQueue {
        &self.queue
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Time left before the next drain may start, if a cooldown is pending.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        self.cooldown_until
            .map(|until| until.saturating_duration_since(Instant::now()))
    }

    /// Drop all deferred requests and any pending cooldown.
    pub fn clear_queue(&mut self) {
        let dropped = self.queue.clear();
        self.cooldown_until = None;
        tracing::info!(dropped, "deferral queue cleared");
    }

    /// Responses produced by drains since the last call to this method.
    pub fn take_completed(&mut self) -> Vec<CompletedDeferral> {
        std::mem::take(&mut self.completed)
    }

    /// Run one logical call: drain deferred requests, then `request`.
    pub fn call(&mut self, request: Request) -> Result<Response, CallError> {
        self.drain_queue();

        match self.attempt(&request) {
            RetryOutcome::Success { value, .. } => Ok(value),
            RetryOutcome::Failure(failure) => Err(self.fail(request, failure)),
        }
    }

    fn attempt(&self, request: &Request) -> RetryOutcome<Response> {
        let transport = &self.transport;
        run_with_retry(&self.policy, &*self.sleeper, &*self.observer, || {
            transport.send(request)
        })
    }

    /// Turn an exhausted retry loop into the caller's error, deferring the
    /// request first if it was rate limited.
    fn fail(&mut self, request: Request, failure: RetryFailure) -> CallError {
        let queued = failure.kind == ErrorKind::RateLimited;
        if queued {
            let last = failure.attempts.saturating_sub(1);
            let wait = self
                .policy
                .backoff
                .delay(last, failure.kind, failure.retry_after());
            self.set_cooldown(wait);

            self.queue.enqueue(request, ErrorKind::RateLimited);
            if let Some(entry) = self.queue.back() {
                self.observer.deferred(entry, self.queue.len());
            }
        }
        let err = CallError::new(failure.kind, failure.attempts, &failure.error, queued);
        tracing::error!(kind = %err.kind(), attempts = err.attempts(), queued, "call failed: {}", err);
        err
    }

    /// Best-effort FIFO drain. Never fails the caller.
    fn drain_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        self.wait_out_cooldown();
        tracing::info!(queued = self.queue.len(), "processing deferred requests");

        let transport = &self.transport;
        let policy = &self.policy;
        let sleeper = &*self.sleeper;
        let observer = &*self.observer;
        let mut hint: Option<Duration> = None;

        let report = self.queue.drain(|entry: &QueueEntry| {
            let _span = tracing::info_span!("deferred", seq = entry.seq).entered();
            let outcome = run_with_retry(policy, sleeper, observer, || transport.send(&entry.request));
            match outcome {
                RetryOutcome::Success { value, .. } => Ok(value),
                RetryOutcome::Failure(f) if f.kind == ErrorKind::RateLimited => {
                    hint = f.retry_after();
                    Err(f.kind)
                }
                RetryOutcome::Failure(f) => {
                    tracing::error!(kind = %f.kind, attempts = f.attempts, "dropping deferred request: {}", f.error);
                    Err(f.kind)
                }
            }
        });

        if report.stopped_early {
            self.set_cooldown(hint.unwrap_or(self.rate_limit_cooldown));
        }
        self.observer.drained(&report.summary());

        self.completed
            .extend(report.completed.into_iter().map(|(entry, response)| CompletedDeferral {
                seq: entry.seq,
                request: entry.request,
                response,
                enqueued_at: entry.enqueued_at,
            }));
    }

    fn set_cooldown(&mut self, wait: Duration) {
        let wait = wait.min(MAX_COOLDOWN);
        self.cooldown_until = Instant::now().checked_add(wait);
        if self.cooldown_until.is_none() {
            tracing::warn!(wait_ms = wait.as_millis() as u64, "cooldown deadline out of range, not recorded");
        }
    }

    fn wait_out_cooldown(&mut self) {
        if let Some(until) = self.cooldown_until.take() {
            let remaining = until.saturating_duration_since(Instant::now());
            if !remaining.is_zero() {
                tracing::info!(wait_ms = remaining.as_millis() as u64, "waiting for rate limit to clear");
                self.sleeper.sleep(remaining);
            }
        }
    }
}
