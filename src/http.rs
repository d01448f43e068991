//! Minimal HTTP/1.x message model for the upgrade handshake.
//!
//! Only the single request/response pair of a WebSocket handshake passes
//! through here. The complete header block, terminated by CRLFCRLF, must be
//! present in the bytes given to [`HttpMessage::parse`]; there is no
//! reassembly of headers split across deliveries. Header names are folded to
//! lower case and a repeated header overwrites the earlier value.

use std::fmt::Write as _;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Marks the end of the header block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

const CRLF: &str = "\r\n";

/// Errors raised while parsing or interpreting an HTTP message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HttpError {
    /// The input has no CRLFCRLF.
    #[error("header block is not terminated")]
    MissingHeaderTerminator,

    /// The start line has control or non-ASCII characters, or too few parts.
    #[error("malformed start line")]
    MalformedStartLine,

    /// A header line has no colon.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// The protocol version is neither HTTP/1.1 nor HTTP/1.0.
    #[error("unsupported HTTP version: {0}")]
    UnsupportedVersion(String),
}

/// Method and target of a request start line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestLine<'a> {
    /// Request method.
    pub method: &'a str,
    /// Request target, usually a path with optional query.
    pub target: &'a str,
}

/// An HTTP request or response: start line, headers, and optional body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpMessage {
    start_line: String,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl HttpMessage {
    /// Create a message with the given start line and no headers.
    #[must_use]
    pub fn new(start_line: impl Into<String>) -> Self {
        Self {
            start_line: start_line.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// `METHOD target HTTP/1.1` request.
    #[must_use]
    pub fn request(method: &str, target: &str) -> Self {
        Self::new(format!("{method} {target} HTTP/1.1"))
    }

    /// `HTTP/1.1 status reason` response.
    ///
    /// ```
    /// use wiresocket::http::HttpMessage;
    ///
    /// let response = HttpMessage::response(101);
    /// assert_eq!(response.start_line(), "HTTP/1.1 101 Switching Protocols");
    /// assert_eq!(response.status_code(), Ok(101));
    /// ```
    #[must_use]
    pub fn response(status: u16) -> Self {
        match reason_phrase(status) {
            Some(reason) => Self::new(format!("HTTP/1.1 {status} {reason}")),
            None => Self::new(format!("HTTP/1.1 {status}")),
        }
    }

    /// Attach a body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Builder form of [`set_header`](Self::set_header).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Parse one message from `data`.
    ///
    /// Bytes after the header block are kept as the body. The input is
    /// decoded as ISO-8859-1, so any byte sequence yields a string.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] when the terminator is absent, the start line
    /// contains bytes outside `0x20..=0x7E`, or a header line lacks a colon.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiresocket::http::HttpMessage;
    ///
    /// let msg = HttpMessage::parse(b"GET /chat HTTP/1.1\r\nUpgrade: websocket\r\n\r\n")
    ///     .expect("valid request");
    /// assert_eq!(msg.header("upgrade"), Some("websocket"));
    /// assert_eq!(msg.request_line().expect("request").target, "/chat");
    /// assert!(msg.body().is_none());
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self, HttpError> {
        let header_end = data
            .windows(HEADER_TERMINATOR.len())
            .position(|window| window == HEADER_TERMINATOR)
            .ok_or(HttpError::MissingHeaderTerminator)?;
        let block: String = data[..header_end].iter().copied().map(char::from).collect();

        let mut lines = block.split(CRLF);
        let start_line = lines.next().unwrap_or_default();
        if start_line.is_empty() || !start_line.bytes().all(|b| (0x20..0x7F).contains(&b)) {
            return Err(HttpError::MalformedStartLine);
        }

        let mut message = Self::new(start_line);
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| HttpError::MalformedHeader(line.to_owned()))?;
            message.set_header(name.trim(), value.trim());
        }

        let body_start = header_end + HEADER_TERMINATOR.len();
        if body_start < data.len() {
            message.body = Some(Bytes::copy_from_slice(&data[body_start..]));
        }
        Ok(message)
    }

    /// Raw start line.
    #[must_use]
    pub fn start_line(&self) -> &str { &self.start_line }

    /// Value of the header `name`, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the header `name` is present.
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool { self.header(name).is_some() }

    /// Set a header, replacing any earlier value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value,
            None => self.headers.push((name.to_ascii_lowercase(), value)),
        }
    }

    /// Remove a header, returning its value.
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        let index = self
            .headers
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.headers.remove(index).1)
    }

    /// Headers in insertion order, with lower-case names.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Body bytes that followed the header block.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> { self.body.as_ref() }

    /// Take the body, leaving none.
    pub fn take_body(&mut self) -> Option<Bytes> { self.body.take() }

    /// Status code of a response.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::MalformedStartLine`] when the start line is not
    /// `VERSION STATUS ...`, or [`HttpError::UnsupportedVersion`] for any
    /// version other than HTTP/1.1 and HTTP/1.0.
    pub fn status_code(&self) -> Result<u16, HttpError> {
        let mut parts = self.start_line.split(' ');
        let version = parts.next().unwrap_or_default();
        let status = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or(HttpError::MalformedStartLine)?;
        check_version(version)?;
        Ok(status)
    }

    /// Method and target of a request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::MalformedStartLine`] when the start line is not
    /// `METHOD TARGET VERSION`, or [`HttpError::UnsupportedVersion`].
    pub fn request_line(&self) -> Result<RequestLine<'_>, HttpError> {
        let mut parts = self.start_line.split(' ');
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(HttpError::MalformedStartLine);
        };
        check_version(version)?;
        Ok(RequestLine { method, target })
    }

    /// Serialise the message.
    ///
    /// A `content-length` header is added when a body is present and the
    /// message does not already declare one.
    pub fn write_to(&self, dst: &mut BytesMut) {
        let mut head = String::with_capacity(128);
        head.push_str(&self.start_line);
        head.push_str(CRLF);
        for (name, value) in &self.headers {
            let _ = write!(head, "{name}: {value}{CRLF}");
        }
        if let Some(body) = &self.body
            && !self.has_header("content-length")
        {
            let _ = write!(head, "content-length: {}{CRLF}", body.len());
        }
        head.push_str(CRLF);
        dst.extend(head.chars().map(latin1_byte));
        if let Some(body) = &self.body {
            dst.put_slice(body);
        }
    }

    /// Serialised message bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::new();
        self.write_to(&mut dst);
        dst.freeze()
    }
}

fn check_version(version: &str) -> Result<(), HttpError> {
    match version {
        "HTTP/1.1" | "HTTP/1.0" => Ok(()),
        other => Err(HttpError::UnsupportedVersion(other.to_owned())),
    }
}

/// Characters outside ISO-8859-1 become `?`.
fn latin1_byte(c: char) -> u8 { u8::try_from(c).unwrap_or(b'?') }

fn reason_phrase(status: u16) -> Option<&'static str> {
    Some(match status {
        101 => "Switching Protocols",
        200 => "OK",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        426 => "Upgrade Required",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{HttpError, HttpMessage};

    #[test]
    fn parse_folds_names_and_keeps_last_duplicate() {
        let msg = HttpMessage::parse(b"GET / HTTP/1.1\r\nX-Thing: a\r\nx-thing:  b \r\n\r\n")
            .expect("valid");
        assert_eq!(msg.header("X-THING"), Some("b"));
        assert_eq!(msg.headers().count(), 1);
        assert_eq!(msg.headers().next(), Some(("x-thing", "b")));
    }

    #[test]
    fn parse_keeps_trailing_bytes_as_body() {
        let msg = HttpMessage::parse(b"HTTP/1.1 101 Switching Protocols\r\nupgrade: websocket\r\n\r\n\x81\x00")
            .expect("valid");
        assert_eq!(msg.body().map(|b| &b[..]), Some(&[0x81, 0x00][..]));
        assert_eq!(msg.status_code(), Ok(101));
    }

    #[test]
    fn parse_accepts_message_without_headers() {
        let msg = HttpMessage::parse(b"GET / HTTP/1.1\r\n\r\n").expect("valid");
        assert_eq!(msg.headers().count(), 0);
    }

    #[rstest]
    #[case::no_terminator(&b"GET / HTTP/1.1\r\nHost: x\r\n"[..], HttpError::MissingHeaderTerminator)]
    #[case::control_char(&b"GET /\x01 HTTP/1.1\r\n\r\n"[..], HttpError::MalformedStartLine)]
    #[case::high_byte(&b"GET /\xE9 HTTP/1.1\r\n\r\n"[..], HttpError::MalformedStartLine)]
    #[case::header_without_colon(
        &b"GET / HTTP/1.1\r\nbroken\r\n\r\n"[..],
        HttpError::MalformedHeader("broken".into())
    )]
    fn parse_rejects(#[case] input: &[u8], #[case] expected: HttpError) {
        assert_eq!(HttpMessage::parse(input), Err(expected));
    }

    #[rstest]
    #[case("HTTP/1.0 200 OK", Ok(200))]
    #[case("HTTP/2 101", Err(HttpError::UnsupportedVersion("HTTP/2".into())))]
    #[case("HTTP/1.1 abc", Err(HttpError::MalformedStartLine))]
    fn status_code_checks_version(#[case] line: &str, #[case] expected: Result<u16, HttpError>) {
        assert_eq!(HttpMessage::new(line).status_code(), expected);
    }

    #[test]
    fn request_line_requires_three_parts() {
        let msg = HttpMessage::new("GET /a b HTTP/1.1");
        assert_eq!(msg.request_line(), Err(HttpError::MalformedStartLine));
        let msg = HttpMessage::new("GET /a HTTP/1.0");
        let line = msg.request_line().expect("valid");
        assert_eq!((line.method, line.target), ("GET", "/a"));
    }

    #[test]
    fn serialises_headers_and_body_length() {
        let bytes = HttpMessage::response(400)
            .with_header("Content-Type", "text/plain")
            .with_body("Bad Request")
            .to_bytes();
        assert_eq!(
            &bytes[..],
            b"HTTP/1.1 400 Bad Request\r\ncontent-type: text/plain\r\ncontent-length: 11\r\n\r\nBad Request"
        );
    }

    #[test]
    fn set_header_replaces_and_remove_returns_value() {
        let mut msg = HttpMessage::request("GET", "/");
        msg.set_header("Host", "a");
        msg.set_header("host", "b");
        assert_eq!(msg.remove_header("HOST"), Some("b".to_owned()));
        assert!(!msg.has_header("host"));
    }
}
