//! Thread-safe client facade.
//!
//! All dispatch work (drain, retry loop, enqueue) happens under one mutex, so
//! a drain in progress never interleaves with another caller's call and the
//! queue is never touched by two threads at once.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::GencallConfig;
use crate::dispatch::{CompletedDeferral, Dispatcher};
use crate::request::{Request, RequestDefaults, Response};
use crate::retry::CallError;
use crate::transport::CurlTransport;

#[derive(Debug)]
pub struct Client {
    dispatcher: Mutex<Dispatcher>,
    defaults: RequestDefaults,
}

impl Client {
    pub fn new(dispatcher: Dispatcher, defaults: RequestDefaults) -> Self {
        Self {
            dispatcher: Mutex::new(dispatcher),
            defaults,
        }
    }

    /// Client talking to the real service with settings from `cfg`.
    ///
    /// Fails if no API key can be resolved or the base URL is invalid.
    pub fn from_config(cfg: &GencallConfig) -> Result<Self> {
        let api_key = cfg.resolve_api_key()?;
        let http = cfg.http.clone().unwrap_or_default();
        let transport = CurlTransport::new(&cfg.base_url, api_key)
            .context("cannot set up transport")?
            .with_api_version(cfg.api_version.clone())
            .with_timeouts(
                Duration::from_secs(http.connect_timeout_secs),
                Duration::from_secs(http.timeout_secs),
            );
        let backoff = cfg.backoff.clone().unwrap_or_default();
        let dispatcher = Dispatcher::new(transport, cfg.retry_policy())
            .with_rate_limit_cooldown(Duration::from_secs(backoff.rate_limit_cooldown_secs));
        tracing::debug!(
            endpoint = %cfg.base_url,
            max_retries = cfg.max_retries,
            model = %cfg.model,
            "client ready"
        );
        Ok(Self::new(dispatcher, cfg.request_defaults()))
    }

    fn lock(&self) -> MutexGuard<'_, Dispatcher> {
        // The dispatcher holds no half-updated invariants across a panic.
        self.dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    /// Start a request from this client's defaults.
    pub fn request(&self, prompt: impl Into<String>) -> Request {
        self.defaults.request(prompt)
    }

    /// Blocking call with retries; drains deferred requests first.
    pub fn call(&self, request: Request) -> Result<Response, CallError> {
        self.lock().call(request)
    }

    /// `call` with the client's defaults, returning just the text.
    pub fn ask(&self, prompt: impl Into<String>) -> Result<String, CallError> {
        self.call(self.request(prompt)).map(|r| r.text)
    }

    pub fn queue_size(&self) -> usize {
        self.lock().queue_len()
    }

    pub fn clear_queue(&self) {
        self.lock().clear_queue();
    }

    /// Responses for deferred requests that completed during later drains.
    pub fn take_completed(&self) -> Vec<CompletedDeferral> {
        self.lock().take_completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{Backoff, ErrorKind, RecordingSleeper, RetryPolicy, TransportError};
    use crate::transport::Transport;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Rate limits the first `limit` sends, then echoes the prompt.
    struct Throttled {
        limit: usize,
        sent: Arc<AtomicUsize>,
    }

    impl Transport for Throttled {
        fn send(&self, request: &Request) -> Result<Response, TransportError> {
            let n = self.sent.fetch_add(1, Ordering::SeqCst);
            if n < self.limit {
                Err(TransportError::http(429))
            } else {
                Ok(Response::from_text(request.prompt().to_uppercase()))
            }
        }
    }

    fn client(limit: usize) -> (Client, Arc<AtomicUsize>) {
        let sent = Arc::new(AtomicUsize::new(0));
        let transport = Throttled {
            limit,
            sent: Arc::clone(&sent),
        };
        let dispatcher = Dispatcher::new(transport, RetryPolicy::new(2, Backoff::default()))
            .with_sleeper(RecordingSleeper::default());
        (Client::new(dispatcher, RequestDefaults::default()), sent)
    }

    #[test]
    fn client_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Client>();
    }

    #[test]
    fn ask_uses_defaults() {
        let (c, _) = client(0);
        assert_eq!(c.ask("hello").unwrap(), "HELLO");
        assert_eq!(c.request("x").model(), crate::request::DEFAULT_MODEL);
    }

    #[test]
    fn queue_size_and_clear() {
        let (c, _) = client(2);
        assert_eq!(c.queue_size(), 0);
        let err = c.ask("later").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(c.queue_size(), 1);
        c.clear_queue();
        assert_eq!(c.queue_size(), 0);
    }

    #[test]
    fn deferred_response_is_collectable() {
        let (c, _) = client(2);
        c.ask("first").unwrap_err();
        assert_eq!(c.ask("second").unwrap(), "SECOND");
        let done = c.take_completed();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].response.text, "FIRST");
        assert_eq!(c.queue_size(), 0);
    }

    #[test]
    fn concurrent_calls_are_serialized() {
        let (c, sent) = client(0);
        let c = Arc::new(c);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let c = Arc::clone(&c);
                std::thread::spawn(move || c.ask(format!("p{i}")).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sent.load(Ordering::SeqCst), 8);
        assert_eq!(c.queue_size(), 0);
    }
}
