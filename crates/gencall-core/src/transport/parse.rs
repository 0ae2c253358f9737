//! Messages API wire format and response header parsing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::request::{Request, Response};
use crate::retry::TransportError;

#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: [UserMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Serialize a request as a single-turn Messages API body.
pub fn encode_request(request: &Request) -> Result<Vec<u8>, TransportError> {
    let body = MessagesBody {
        model: request.model(),
        max_tokens: request.max_tokens(),
        temperature: request.temperature(),
        messages: [UserMessage {
            role: "user",
            content: request.prompt(),
        }],
        system: request.system(),
    };
    serde_json::to_vec(&body).map_err(|e| TransportError::Encode(e.to_string()))
}

/// Decode a 2xx body. Text blocks are concatenated; other block types are skipped.
pub fn decode_response(body: &[u8]) -> Result<Response, TransportError> {
    let parsed: MessagesResponse =
        serde_json::from_slice(body).map_err(|e| TransportError::Decode(e.to_string()))?;
    let text = parsed
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .concat();
    Ok(Response {
        text,
        id: parsed.id,
        model: parsed.model,
        stop_reason: parsed.stop_reason,
        input_tokens: parsed.usage.as_ref().map(|u| u.input_tokens),
        output_tokens: parsed.usage.as_ref().map(|u| u.output_tokens),
    })
}

/// Pull `type: message` out of an error body, if it is one.
pub fn decode_error_message(body: &[u8]) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_slice(body).ok()?;
    match (envelope.error.kind, envelope.error.message) {
        (Some(kind), Some(message)) => Some(format!("{kind}: {message}")),
        (None, Some(message)) => Some(message),
        (Some(kind), None) => Some(kind),
        (None, None) => None,
    }
}

/// Largest `retry-after` honored; longer hints are clamped to it.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60 * 60);

/// `retry-after` from collected header lines, in (possibly fractional) seconds.
///
/// Negative, non-finite or unparseable values are ignored.
pub fn parse_retry_after(lines: &[String]) -> Option<Duration> {
    lines.iter().rev().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if !name.trim().eq_ignore_ascii_case("retry-after") {
            return None;
        }
        let secs: f64 = value.trim().parse().ok()?;
        if !secs.is_finite() {
            return None;
        }
        Duration::try_from_secs_f64(secs.min(MAX_RETRY_AFTER.as_secs_f64())).ok()
    })
}
