//! Map transport outcomes onto the closed `ErrorKind` set.
//!
//! Pure categorization; whether a kind is retried is the policy's call.

use super::error::TransportError;
use super::policy::ErrorKind;

/// Classify an HTTP status code.
///
/// Total over all codes: anything that is neither 429 nor another 4xx is
/// treated as a service-side fault.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 => ErrorKind::RateLimited,
        400..=499 => ErrorKind::Client,
        _ => ErrorKind::Server,
    }
}

/// Every curl failure is transport-level.
pub fn classify_curl_error(_e: &curl::Error) -> ErrorKind {
    ErrorKind::Network
}

/// Short label for the flavour of network failure, for logs and details.
pub fn describe_curl_error(e: &curl::Error) -> &'static str {
    if e.is_operation_timedout() {
        return "timeout";
    }
    if e.is_couldnt_resolve_host() || e.is_couldnt_resolve_proxy() {
        return "dns";
    }
    if e.is_couldnt_connect() {
        return "connect";
    }
    if e.is_read_error() || e.is_recv_error() || e.is_send_error() || e.is_got_nothing() {
        return "connection";
    }
    "transport"
}

/// Classify an attempt failure into an ErrorKind.
pub fn classify(e: &TransportError) -> ErrorKind {
    match e {
        TransportError::Curl(ce) => classify_curl_error(ce),
        TransportError::Http { status, .. } => classify_http_status(*status),
        TransportError::Decode(_) => ErrorKind::Server,
        TransportError::Encode(_) => ErrorKind::Client,
    }
}
