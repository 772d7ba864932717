//! Minimal HTTP/1.0 client pieces: URL splitting and response framing
//!
//! Only what a single `GET` of a calendar needs. Responses must be `200`
//! and must not use chunked transfer encoding (requests are HTTP/1.0).
//! The socket side lives with the board; these types only see bytes.

use hal_abstractions::ChunkSink;
use heapless::Vec;

use crate::error::HttpError;

const DEFAULT_HTTPS_PORT: u16 = 443;

/// Status line plus headers must fit in this many bytes
pub const MAX_HEAD_LEN: usize = 1024;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Parts of an `https://host[:port]/path` URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Url<'a> {
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
}

impl<'a> Url<'a> {
    pub fn parse(url: &'a str) -> Result<Self, HttpError> {
        let rest = url.strip_prefix("https://").ok_or(HttpError::InvalidUrl)?;
        let (authority, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().map_err(|_| HttpError::InvalidUrl)?),
            None => (authority, DEFAULT_HTTPS_PORT),
        };
        if host.is_empty() {
            return Err(HttpError::InvalidUrl);
        }
        Ok(Self { host, port, path })
    }
}

/// Splits a response stream into head and body, forwarding the body
///
/// Feed it whatever each socket read returned; the head terminator and the
/// first body bytes may arrive in any split.
pub struct ResponseReader {
    head: Vec<u8, MAX_HEAD_LEN>,
    /// `None` until the head is complete; then the body bytes still
    /// expected (`None` inside when the length is unknown)
    body: Option<Option<usize>>,
}

impl ResponseReader {
    pub const fn new() -> Self {
        Self {
            head: Vec::new(),
            body: None,
        }
    }

    /// Every advertised body byte has been forwarded
    pub fn is_complete(&self) -> bool {
        matches!(self.body, Some(Some(0)))
    }

    /// Consume the next bytes read from the connection
    pub fn push<S: ChunkSink>(&mut self, data: &[u8], sink: &mut S) -> Result<(), HttpError> {
        if self.body.is_some() {
            self.forward(data, sink);
            return Ok(());
        }

        // Rescan from just before the new bytes so a split terminator is found
        let scan_from = self.head.len().saturating_sub(HEAD_TERMINATOR.len() - 1);
        let old_len = self.head.len();
        let take = data.len().min(MAX_HEAD_LEN - old_len);
        self.head
            .extend_from_slice(&data[..take])
            .map_err(|_| HttpError::MalformedResponse)?;

        match find(&self.head[scan_from..], HEAD_TERMINATOR) {
            Some(pos) => {
                let end = scan_from + pos + HEAD_TERMINATOR.len();
                let content_length = parse_head(&self.head[..end])?;
                self.body = Some(content_length);
                self.forward(&data[end - old_len..], sink);
                Ok(())
            }
            None if self.head.is_full() => {
                warn!("HTTP response head exceeds {} bytes", MAX_HEAD_LEN);
                Err(HttpError::MalformedResponse)
            }
            None => Ok(()),
        }
    }

    /// The connection closed; check that the body arrived whole
    pub fn finish(&self) -> Result<(), HttpError> {
        match self.body {
            None => Err(HttpError::MalformedResponse),
            Some(Some(remaining)) if remaining > 0 => {
                warn!("HTTP body short by {} bytes", remaining);
                Err(HttpError::Truncated)
            }
            Some(_) => Ok(()),
        }
    }

    fn forward<S: ChunkSink>(&mut self, data: &[u8], sink: &mut S) {
        let data = match &mut self.body {
            Some(Some(remaining)) => {
                let n = data.len().min(*remaining);
                *remaining -= n;
                &data[..n]
            }
            _ => data,
        };
        if !data.is_empty() {
            sink.on_chunk(data);
        }
    }
}

impl Default for ResponseReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate the status line and headers; returns the Content-Length
fn parse_head(head: &[u8]) -> Result<Option<usize>, HttpError> {
    let text = core::str::from_utf8(head).map_err(|_| HttpError::MalformedResponse)?;
    let mut lines = text.split("\r\n");

    let status_line = lines.next().ok_or(HttpError::MalformedResponse)?;
    let mut parts = status_line.split(' ');
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::MalformedResponse);
    }
    let status: u16 = parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or(HttpError::MalformedResponse)?;
    if status != 200 {
        warn!("HTTP status {}", status);
        return Err(HttpError::Status(status));
    }

    let mut content_length = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = Some(value.parse().map_err(|_| HttpError::MalformedResponse)?);
        } else if name.eq_ignore_ascii_case("transfer-encoding")
            && !value.eq_ignore_ascii_case("identity")
        {
            warn!("Unsupported transfer encoding: {}", value);
            return Err(HttpError::UnsupportedEncoding);
        }
    }
    debug!("HTTP 200, content-length {:?}", content_length);
    Ok(content_length)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
