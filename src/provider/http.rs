//! Shared HTTP client, line framing, SSE parsing, and auth utilities.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::error::DuologueError;

/// Timeout for model listing requests.
pub const LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum silence between two reads of a streaming response.
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
///
/// No total request timeout is set: a long reply may stream for minutes as
/// long as the server keeps sending.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .pool_max_idle_per_host(4)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client");
                reqwest::Client::new()
            })
    })
}

/// Build JSON request headers, with a bearer token when a key is configured.
pub fn json_headers(api_key: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
        if let Ok(val) = HeaderValue::from_str(&format!("Bearer {key}")) {
            headers.insert(AUTHORIZATION, val);
        }
    }
    headers
}

/// Turn a non-success response into an error, keeping the body for context.
pub async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, DuologueError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_to_error(status.as_u16(), &body))
}

/// Map an HTTP status and body to an API error, preferring the server's own
/// error message when the body is JSON.
pub fn status_to_error(status: u16, body: &str) -> DuologueError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            let err = v.get("error")?;
            err.get("message")
                .and_then(|m| m.as_str())
                .or_else(|| err.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());
    DuologueError::api(status, message)
}

/// One classified line of a server-sent event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Event payload.
    Data(&'a str),
    /// The `[DONE]` sentinel.
    Done,
    /// Blank line, comment, or non-data field.
    Skip,
}

/// Classify an SSE line. Servers that omit the `data:` prefix are tolerated.
pub fn parse_sse_line(line: &str) -> SseLine<'_> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }
    let data = match line.strip_prefix("data:") {
        Some(rest) => rest.trim_start(),
        None if ["event:", "id:", "retry:"].iter().any(|f| line.starts_with(f)) => {
            return SseLine::Skip;
        }
        None => line,
    };
    match data {
        "" => SseLine::Skip,
        "[DONE]" => SseLine::Done,
        payload => SseLine::Data(payload),
    }
}

/// Reassembles newline-delimited lines from arbitrarily split byte chunks.
///
/// Bytes are buffered until a full line is available so multi-byte UTF-8
/// sequences split across chunks decode intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Whatever is left after the connection closed, if non-blank.
    pub fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&std::mem::take(&mut self.buf)).into_owned();
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}
