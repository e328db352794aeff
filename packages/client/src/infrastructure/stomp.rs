//! Minimal STOMP 1.2 frame codec.
//!
//! Only the client side of the frames the seat channel uses is covered:
//! CONNECT, SUBSCRIBE, UNSUBSCRIBE and DISCONNECT going out; CONNECTED,
//! MESSAGE, RECEIPT and ERROR coming in. A WebSocket text message may carry
//! several NUL-terminated frames; a bare newline is a heart-beat.

use thiserror::Error;

pub const CONNECT: &str = "CONNECT";
pub const CONNECTED: &str = "CONNECTED";
pub const SUBSCRIBE: &str = "SUBSCRIBE";
pub const UNSUBSCRIBE: &str = "UNSUBSCRIBE";
pub const DISCONNECT: &str = "DISCONNECT";
pub const MESSAGE: &str = "MESSAGE";
pub const RECEIPT: &str = "RECEIPT";
pub const ERROR: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Frame has no command line")]
    MissingCommand,

    #[error("Malformed header line: {0}")]
    MalformedHeader(String),

    #[error("Invalid escape sequence in header: {0}")]
    InvalidEscape(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header; repeated headers keep the first occurrence.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn connect(host: &str) -> Self {
        Self::new(CONNECT)
            .with_header("accept-version", "1.2")
            .with_header("host", host)
            .with_header("heart-beat", "0,0")
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(SUBSCRIBE)
            .with_header("id", id)
            .with_header("destination", destination)
            .with_header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(UNSUBSCRIBE).with_header("id", id)
    }

    pub fn disconnect(receipt: &str) -> Self {
        Self::new(DISCONNECT).with_header("receipt", receipt)
    }

    /// Serialize to wire text, NUL terminator included.
    pub fn encode(&self) -> String {
        let escape_headers = !matches!(self.command.as_str(), CONNECT | CONNECTED);
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            if escape_headers {
                out.push_str(&escape(name));
                out.push(':');
                out.push_str(&escape(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.header("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

/// Parse every frame in a WebSocket text message. Heart-beats yield nothing.
///
/// Each NUL-terminated frame is parsed on its own; a malformed one is logged
/// and skipped without losing its neighbours.
pub fn parse_frames(text: &str) -> Vec<StompFrame> {
    text.split('\0')
        .map(|chunk| chunk.trim_start_matches(['\r', '\n']))
        .filter(|chunk| !chunk.is_empty())
        .filter_map(|chunk| match parse_frame(chunk) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!("Dropping undecodable STOMP frame: {}", e);
                None
            }
        })
        .collect()
}

/// Parse a single frame without its NUL terminator.
pub fn parse_frame(chunk: &str) -> Result<StompFrame, FrameError> {
    let (head, body) = match chunk.find("\n\n") {
        Some(index) => (&chunk[..index], &chunk[index + 2..]),
        None => match chunk.find("\r\n\r\n") {
            Some(index) => (&chunk[..index], &chunk[index + 4..]),
            None => (chunk, ""),
        },
    };

    let mut lines = head.lines();
    let command = lines
        .next()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .ok_or(FrameError::MissingCommand)?
        .to_string();

    let unescape_headers = !matches!(command.as_str(), CONNECT | CONNECTED);
    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim_end_matches('\r');
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| FrameError::MalformedHeader(line.to_string()))?;
        if unescape_headers {
            headers.push((unescape(name)?, unescape(value)?));
        } else {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    Ok(StompFrame {
        command,
        headers,
        body: body.to_string(),
    })
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(raw: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(FrameError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}
