//! Minimal HTTP/1.1 server that plays back scripted replies for integration tests.
//!
//! Each accepted request consumes the next reply in the script; once the
//! script is exhausted the server answers 200 with a Messages API body that
//! echoes the request's prompt. Requests are captured for assertions.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Reply {
    /// 200 with a single text content block.
    pub fn text(text: &str) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: message_body(text),
        }
    }

    /// Error status with an Anthropic-style error envelope.
    pub fn error(status: u16, kind: &str, message: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: format!(
                r#"{{"type":"error","error":{{"type":"{kind}","message":"{message}"}}}}"#
            ),
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

fn message_body(text: &str) -> String {
    let content = serde_json::json!([{ "type": "text", "text": text }]);
    serde_json::json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-sonnet-20241022",
        "content": content,
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 1, "output_tokens": 1 }
    })
    .to_string()
}

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub header_lines: Vec<String>,
    pub body: serde_json::Value,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_lines.iter().find_map(|line| {
            let (n, v) = line.split_once(':')?;
            n.trim().eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }

    pub fn prompt(&self) -> &str {
        self.body["messages"][0]["content"].as_str().unwrap_or("")
    }
}

pub struct ScriptedServer {
    /// Base URL, e.g. "http://127.0.0.1:12345/".
    pub url: String,
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl ScriptedServer {
    pub fn requests(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests().iter().map(|c| c.prompt().to_string()).collect()
    }
}

/// Starts the server in a background thread. It runs until the process exits.
pub fn start(script: Vec<Reply>) -> ScriptedServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let script = Arc::new(Mutex::new(VecDeque::from(script)));
    let captured = Arc::new(Mutex::new(Vec::new()));
    let server_captured = Arc::clone(&captured);
    thread::spawn(move || {
        // One connection at a time keeps replies in request order.
        for stream in listener.incoming().flatten() {
            handle(stream, &script, &server_captured);
        }
    });
    ScriptedServer {
        url: format!("http://127.0.0.1:{}/", port),
        captured,
    }
}

/// A base URL nothing listens on, for connection-refused tests.
pub fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

fn handle(
    mut stream: TcpStream,
    script: &Mutex<VecDeque<Reply>>,
    captured: &Mutex<Vec<Captured>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some((header_lines, body)) = read_request(&mut stream) else {
        return;
    };
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
    let prompt = body["messages"][0]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();
    captured
        .lock()
        .unwrap()
        .push(Captured { header_lines, body });

    let reply = script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Reply::text(&format!("echo: {prompt}")));

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reason(reply.status),
        reply.body.len()
    );
    for (name, value) in &reply.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(reply.body.as_bytes());
    let _ = stream.flush();
}

/// Reads header lines and a Content-Length body.
fn read_request(stream: &mut TcpStream) -> Option<(Vec<String>, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };
    let head = std::str::from_utf8(&buf[..header_end]).ok()?;
    let header_lines: Vec<String> = head.lines().map(|l| l.to_string()).collect();
    let content_length = header_lines
        .iter()
        .find_map(|line| {
            let (n, v) = line.split_once(':')?;
            n.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| v.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    Some((header_lines, body))
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        529 => "Overloaded",
        _ => "Status",
    }
}
