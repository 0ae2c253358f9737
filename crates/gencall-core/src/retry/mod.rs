//! Retry and backoff policy.
//!
//! This module encapsulates error classification (network, throttling,
//! client and server faults), the backoff schedule and the retry loop so the
//! dispatcher applies one consistent policy to direct and deferred calls.

mod classify;
mod error;
mod policy;
mod run;
mod sleep;

pub use classify::{classify, classify_curl_error, classify_http_status, describe_curl_error};
pub use error::{CallError, TransportError};
pub use policy::{Backoff, ErrorKind, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, AttemptOutcome, AttemptRecord, RetryFailure, RetryOutcome};
pub use sleep::{RecordingSleeper, Sleeper, ThreadSleeper};
