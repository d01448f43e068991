//! Server side of the upgrade handshake.

use std::fmt;

use bytes::Bytes;
use log::debug;

use super::{HandshakeError, WS_VERSION, compute_accept_key, is_valid_client_key, split_protocols};
use crate::{channel::Transport, error::WebSocketError, http::HttpMessage};

/// Picks a subprotocol from the client's candidates.
pub type ProtocolSelector = Box<dyn Fn(&[&str]) -> Option<String> + Send + Sync + 'static>;

/// Inspects a valid upgrade request and may answer it with a substitute
/// response instead of upgrading.
pub type RequestHook =
    Box<dyn Fn(&str, &HttpMessage) -> Option<HttpMessage> + Send + Sync + 'static>;

/// Details of an accepted upgrade, used to open a server channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerUpgrade {
    /// Request target.
    pub resource: String,
    /// Negotiated subprotocol.
    pub protocol: Option<String>,
    /// The client's request, without its trailing bytes.
    pub request: HttpMessage,
    /// Bytes that followed the request header block.
    pub leftover: Bytes,
}

/// Outcome of [`ServerHandshake::accept`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Accepted {
    /// A 101 response was written; open a channel.
    Upgrade(ServerUpgrade),
    /// The request hook answered with a substitute response carrying this
    /// status. No channel should be opened.
    Responded(u16),
}

/// Validates upgrade requests and writes responses.
///
/// # Examples
///
/// ```
/// use wiresocket::handshake::{Accepted, ServerHandshake};
///
/// let server = ServerHandshake::new()
///     .protocol_selector(|offered| offered.iter().find(|p| **p == "chat").map(|p| (*p).to_owned()));
/// let request = b"GET /ws HTTP/1.1\r\nHost: x\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
///     Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\
///     Sec-WebSocket-Protocol: superchat, chat\r\n\r\n";
/// let mut written = Vec::new();
/// let Accepted::Upgrade(upgrade) = server.accept(request, &mut written).expect("valid") else {
///     panic!("expected upgrade");
/// };
/// assert_eq!(upgrade.protocol.as_deref(), Some("chat"));
/// assert!(written.starts_with(b"HTTP/1.1 101 Switching Protocols\r\n"));
/// ```
#[derive(Default)]
pub struct ServerHandshake {
    protocol_selector: Option<ProtocolSelector>,
    request_hook: Option<RequestHook>,
    headers: Vec<(String, String)>,
}

impl fmt::Debug for ServerHandshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerHandshake")
            .field("protocol_selector", &self.protocol_selector.is_some())
            .field("request_hook", &self.request_hook.is_some())
            .field("headers", &self.headers)
            .finish()
    }
}

impl ServerHandshake {
    /// Handshake with no subprotocol negotiation and no request hook.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Negotiate subprotocols with `selector`.
    ///
    /// Without a selector, offered subprotocols are ignored.
    #[must_use]
    pub fn protocol_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&[&str]) -> Option<String> + Send + Sync + 'static,
    {
        self.protocol_selector = Some(Box::new(selector));
        self
    }

    /// Inspect every valid request before upgrading.
    ///
    /// The hook receives the request target and the request. Returning a
    /// response sends it verbatim and skips the upgrade.
    #[must_use]
    pub fn request_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &HttpMessage) -> Option<HttpMessage> + Send + Sync + 'static,
    {
        self.request_hook = Some(Box::new(hook));
        self
    }

    /// Header added to every response that does not already carry it.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Check a parsed request against RFC 6455 §4.2.1.
    ///
    /// Returns the request target and client key.
    ///
    /// # Errors
    ///
    /// Returns the first [`HandshakeError`] found, checking method, `upgrade`,
    /// `connection`, `sec-websocket-key`, then `sec-websocket-version`.
    pub fn validate<'a>(&self, request: &'a HttpMessage) -> Result<(&'a str, &'a str), HandshakeError> {
        let line = request.request_line()?;
        if line.method != "GET" {
            return Err(HandshakeError::MethodNotGet(line.method.to_owned()));
        }
        if !request
            .header("upgrade")
            .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
        {
            return Err(HandshakeError::MissingUpgrade);
        }
        if !request
            .header("connection")
            .is_some_and(|v| v.to_ascii_lowercase().contains("upgrade"))
        {
            return Err(HandshakeError::MissingConnectionUpgrade);
        }
        let key = request
            .header("sec-websocket-key")
            .ok_or(HandshakeError::MissingKey)?;
        if !is_valid_client_key(key) {
            return Err(HandshakeError::InvalidKey);
        }
        match request.header("sec-websocket-version") {
            Some(WS_VERSION) => Ok((line.target, key)),
            other => Err(HandshakeError::UnsupportedWsVersion(other.map(str::to_owned))),
        }
    }

    /// Decide how to answer the first request chunk.
    ///
    /// Returns the response to send along with the outcome. The response for
    /// a rejected request is a `400 Bad Request`.
    ///
    /// # Errors
    ///
    /// Returns the validation failure together with the 400 response.
    pub fn respond(&self, data: &[u8]) -> Result<(HttpMessage, Accepted), (HttpMessage, HandshakeError)> {
        match self.evaluate(data) {
            Ok((response, outcome)) => Ok((self.finish(response), outcome)),
            Err(err) => {
                debug!("rejecting upgrade request: {err}");
                Err((self.finish(bad_request()), err))
            }
        }
    }

    /// Handle the first request chunk and write the response to `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`WebSocketError::Handshake`] after writing a 400 response
    /// when the request is invalid, or [`WebSocketError::Transport`] when the
    /// response cannot be written.
    pub fn accept<T>(&self, data: &[u8], transport: &mut T) -> Result<Accepted, WebSocketError>
    where
        T: Transport + ?Sized,
    {
        match self.respond(data) {
            Ok((response, outcome)) => {
                transport.write(&response.to_bytes())?;
                Ok(outcome)
            }
            Err((response, err)) => {
                transport.write(&response.to_bytes())?;
                Err(err.into())
            }
        }
    }

    fn evaluate(&self, data: &[u8]) -> Result<(HttpMessage, Accepted), HandshakeError> {
        let mut request = HttpMessage::parse(data)?;
        let (resource, key) = self.validate(&request)?;
        let resource = resource.to_owned();
        let accept = compute_accept_key(key);

        let protocol = match (&self.protocol_selector, request.header("sec-websocket-protocol")) {
            (Some(select), Some(offered)) => select(&split_protocols(offered)),
            _ => None,
        };

        if let Some(hook) = &self.request_hook
            && let Some(response) = hook(&resource, &request)
        {
            let status = response.status_code().unwrap_or_default();
            debug!("request hook answered {resource} with status {status}");
            return Ok((response, Accepted::Responded(status)));
        }

        let mut response = HttpMessage::response(101)
            .with_header("upgrade", "websocket")
            .with_header("connection", "upgrade")
            .with_header("sec-websocket-accept", accept);
        if let Some(protocol) = &protocol {
            response.set_header("sec-websocket-protocol", protocol.as_str());
        }

        let leftover = request.take_body().unwrap_or_default();
        Ok((
            response,
            Accepted::Upgrade(ServerUpgrade {
                resource,
                protocol,
                request,
                leftover,
            }),
        ))
    }

    fn finish(&self, mut response: HttpMessage) -> HttpMessage {
        for (name, value) in &self.headers {
            if !response.has_header(name) {
                response.set_header(name, value.as_str());
            }
        }
        response
    }
}

fn bad_request() -> HttpMessage {
    HttpMessage::response(400)
        .with_header("content-type", "text/plain; charset=utf-8")
        .with_body("Bad Request")
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::{Accepted, ServerHandshake};
    use crate::{
        error::WebSocketError,
        handshake::HandshakeError,
        http::{HttpError, HttpMessage},
    };

    const KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

    fn request(headers: &[(&str, &str)]) -> Vec<u8> { request_with_method("GET", headers) }

    fn request_with_method(method: &str, headers: &[(&str, &str)]) -> Vec<u8> {
        let mut text = format!("{method} /chat?room=1 HTTP/1.1\r\nHost: example.com\r\n");
        for (name, value) in headers {
            text.push_str(&format!("{name}: {value}\r\n"));
        }
        text.push_str("\r\n");
        text.into_bytes()
    }

    fn valid_headers() -> Vec<(&'static str, &'static str)> {
        vec![
            ("Upgrade", "WebSocket"),
            ("Connection", "keep-alive, Upgrade"),
            ("Sec-WebSocket-Key", KEY),
            ("Sec-WebSocket-Version", "13"),
        ]
    }

    #[allow(
        unused_braces,
        reason = "rustc false positive for single line rstest fixtures"
    )]
    #[fixture]
    fn server() -> ServerHandshake { ServerHandshake::new().header("Server", "wiresocket-test") }

    #[rstest]
    fn upgrades_valid_request(server: ServerHandshake) {
        let mut data = request(&valid_headers());
        data.extend_from_slice(b"\x81\x80\x00\x00\x00\x00");
        let mut written = Vec::new();
        let outcome = server.accept(&data, &mut written).expect("valid request");
        let Accepted::Upgrade(upgrade) = outcome else {
            panic!("expected upgrade");
        };
        assert_eq!(upgrade.resource, "/chat?room=1");
        assert_eq!(upgrade.protocol, None);
        assert_eq!(upgrade.leftover.len(), 6);

        let response = HttpMessage::parse(&written).expect("response");
        assert_eq!(response.status_code(), Ok(101));
        assert_eq!(response.header("sec-websocket-accept"), Some("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="));
        assert_eq!(response.header("server"), Some("wiresocket-test"));
        assert!(!response.has_header("sec-websocket-protocol"));
    }

    #[rstest]
    #[case::post("POST", &[], HandshakeError::MethodNotGet("POST".into()))]
    #[case::no_upgrade("GET", &["Upgrade"], HandshakeError::MissingUpgrade)]
    #[case::no_connection("GET", &["Connection"], HandshakeError::MissingConnectionUpgrade)]
    #[case::no_key("GET", &["Sec-WebSocket-Key"], HandshakeError::MissingKey)]
    #[case::no_version("GET", &["Sec-WebSocket-Version"], HandshakeError::UnsupportedWsVersion(None))]
    fn rejects_with_400(
        server: ServerHandshake,
        #[case] method: &str,
        #[case] omit: &[&str],
        #[case] expected: HandshakeError,
    ) {
        let headers: Vec<_> = valid_headers()
            .into_iter()
            .filter(|(name, _)| !omit.contains(name))
            .collect();
        let data = request_with_method(method, &headers);
        let mut written = Vec::new();
        let err = server.accept(&data, &mut written).expect_err("invalid");
        assert!(matches!(err, WebSocketError::Handshake(ref e) if *e == expected));

        let response = HttpMessage::parse(&written).expect("response");
        assert_eq!(response.status_code(), Ok(400));
        assert_eq!(response.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(response.body().map(|b| &b[..]), Some(&b"Bad Request"[..]));
        assert_eq!(response.header("server"), Some("wiresocket-test"));
    }

    #[rstest]
    #[case::short_key("AAAAAAAAAAAAAAAAAAAA", "13", HandshakeError::InvalidKey)]
    #[case::old_version(KEY, "8", HandshakeError::UnsupportedWsVersion(Some("8".into())))]
    fn rejects_bad_key_or_version(
        server: ServerHandshake,
        #[case] key: &str,
        #[case] version: &str,
        #[case] expected: HandshakeError,
    ) {
        let data = request(&[
            ("Upgrade", "websocket"),
            ("Connection", "Upgrade"),
            ("Sec-WebSocket-Key", key),
            ("Sec-WebSocket-Version", version),
        ]);
        let Err((response, err)) = server.respond(&data) else {
            panic!("expected rejection");
        };
        assert_eq!(err, expected);
        assert_eq!(response.status_code(), Ok(400));
    }

    #[test]
    fn unparsable_request_is_rejected() {
        let Err((_, err)) = ServerHandshake::new().respond(b"GET / HTTP/1.1\r\n") else {
            panic!("expected rejection");
        };
        assert_eq!(err, HandshakeError::Http(HttpError::MissingHeaderTerminator));
    }

    #[test]
    fn negotiates_trimmed_protocols() {
        let server = ServerHandshake::new().protocol_selector(|offered| {
            assert_eq!(offered, ["a", "b"]);
            Some("b".to_owned())
        });
        let mut headers = valid_headers();
        headers.push(("Sec-WebSocket-Protocol", " a ,b"));
        let Ok((response, Accepted::Upgrade(upgrade))) = server.respond(&request(&headers)) else {
            panic!("expected upgrade");
        };
        assert_eq!(upgrade.protocol.as_deref(), Some("b"));
        assert_eq!(response.header("sec-websocket-protocol"), Some("b"));
    }

    #[test]
    fn request_hook_substitutes_response() {
        let server = ServerHandshake::new()
            .header("x-extra", "1")
            .request_hook(|resource, _| {
                (resource != "/ws").then(|| HttpMessage::response(404).with_header("x-extra", "0"))
            });
        let mut written = Vec::new();
        let outcome = server
            .accept(&request(&valid_headers()), &mut written)
            .expect("hook response");
        assert_eq!(outcome, Accepted::Responded(404));
        let response = HttpMessage::parse(&written).expect("response");
        assert_eq!(response.status_code(), Ok(404));
        assert_eq!(response.header("x-extra"), Some("0"));
    }
}
