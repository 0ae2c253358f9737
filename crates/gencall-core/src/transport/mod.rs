//! Blocking transport to the Messages API.
//!
//! Uses the curl crate (libcurl): one Easy handle per attempt, JSON body,
//! response headers captured so `retry-after` can steer the backoff.

mod parse;

use std::str;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

use crate::request::{Request, Response};
use crate::retry::TransportError;

pub use parse::{decode_error_message, decode_response, encode_request, parse_retry_after};

pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// One attempt at a request. Implementations must not retry internally.
pub trait Transport: Send {
    fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

/// `POST {base_url}/v1/messages` over libcurl.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    endpoint: Url,
    api_key: String,
    api_version: String,
    connect_timeout: Duration,
    timeout: Duration,
}

impl CurlTransport {
    /// `base_url` must be absolute; `v1/messages` is joined onto it.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("invalid base URL {base_url:?}"))?;
        let endpoint = messages_endpoint(&base)?;
        Ok(Self {
            endpoint,
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(600),
        })
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, total: Duration) -> Self {
        self.connect_timeout = connect;
        self.timeout = total;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Join `v1/messages` onto `base`, tolerating a missing trailing slash.
fn messages_endpoint(base: &Url) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("v1/messages").context("cannot build messages endpoint")
}

impl Transport for CurlTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let body = encode_request(request)?;
        let mut headers: Vec<String> = Vec::new();
        let mut response_body: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(self.endpoint.as_str())?;
        easy.post(true)?;
        easy.post_fields_copy(&body)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;

        let mut list = curl::easy::List::new();
        list.append("content-type: application/json")?;
        list.append(&format!("x-api-key: {}", self.api_key))?;
        list.append(&format!("anthropic-version: {}", self.api_version))?;
        // Suppress `Expect: 100-continue` so the body goes out with the headers.
        list.append("Expect:")?;
        easy.http_headers(list)?;

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    let line = s.trim_end();
                    // A new status line starts a new header block.
                    if line.starts_with("HTTP/") {
                        headers.clear();
                    }
                    headers.push(line.to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                response_body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        if (200..300).contains(&status) {
            return decode_response(&response_body);
        }
        Err(TransportError::Http {
            status,
            retry_after: parse_retry_after(&headers),
            message: decode_error_message(&response_body),
        })
    }
}
