//! Client side of the upgrade handshake.

use bytes::Bytes;

use super::{HandshakeError, WS_VERSION, compute_accept_key, generate_client_key};
use crate::http::HttpMessage;

/// `user-agent` sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("wiresocket/", env!("CARGO_PKG_VERSION"));

/// Settings for an outgoing upgrade request.
///
/// # Examples
///
/// ```
/// use wiresocket::handshake::ClientHandshakeConfig;
///
/// let config = ClientHandshakeConfig::new("/chat room?lang=en")
///     .host("example.com:8080")
///     .protocol("chat.v2")
///     .protocol("chat.v1");
/// assert_eq!(config.resource(), "/chat%20room?lang=en");
/// assert_eq!(ClientHandshakeConfig::new("").resource(), "/");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientHandshakeConfig {
    resource: String,
    host: Option<String>,
    protocols: Vec<String>,
    headers: Vec<(String, String)>,
    user_agent: String,
}

impl ClientHandshakeConfig {
    /// Target the given request path and optional query.
    ///
    /// An empty path becomes `/` and spaces are percent-encoded.
    #[must_use]
    pub fn new(resource: &str) -> Self {
        let resource = resource.replace(' ', "%20");
        let resource = match resource.chars().next() {
            None => "/".to_owned(),
            Some('?') => format!("/{resource}"),
            Some(_) => resource,
        };
        Self {
            resource,
            host: None,
            protocols: Vec::new(),
            headers: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Authority sent in the `host` header.
    #[must_use]
    pub fn host(mut self, authority: impl Into<String>) -> Self {
        self.host = Some(authority.into());
        self
    }

    /// Offer a subprotocol. Candidates are sent in the order added.
    #[must_use]
    pub fn protocol(mut self, name: impl Into<String>) -> Self {
        self.protocols.push(name.into());
        self
    }

    /// Extra request header. Overrides a standard header of the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the `user-agent` value.
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Normalised request target.
    #[must_use]
    pub fn resource(&self) -> &str { &self.resource }

    /// Offered subprotocols.
    #[must_use]
    pub fn protocols(&self) -> &[String] { &self.protocols }
}

/// Result of a successful client handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientUpgrade {
    /// Subprotocol echoed by the server.
    pub protocol: Option<String>,
    /// The server's response, without its trailing bytes.
    pub response: HttpMessage,
    /// Bytes that followed the response header block.
    pub leftover: Bytes,
}

/// One client upgrade attempt bound to a fixed key.
#[derive(Clone, Debug)]
pub struct ClientHandshake {
    config: ClientHandshakeConfig,
    key: String,
}

impl ClientHandshake {
    /// Start an attempt with a freshly generated key.
    #[must_use]
    pub fn new(config: ClientHandshakeConfig) -> Self { Self::with_key(config, generate_client_key()) }

    /// Start an attempt with a caller-chosen key.
    #[must_use]
    pub fn with_key(config: ClientHandshakeConfig, key: impl Into<String>) -> Self {
        Self {
            config,
            key: key.into(),
        }
    }

    /// `Sec-WebSocket-Key` sent with the request.
    #[must_use]
    pub fn key(&self) -> &str { &self.key }

    /// Request target.
    #[must_use]
    pub fn resource(&self) -> &str { self.config.resource() }

    /// Build the upgrade request.
    #[must_use]
    pub fn request(&self) -> HttpMessage {
        let mut request = HttpMessage::request("GET", &self.config.resource)
            .with_header("user-agent", self.config.user_agent.as_str());
        if let Some(host) = &self.config.host {
            request.set_header("host", host.as_str());
        }
        request.set_header("upgrade", "websocket");
        request.set_header("connection", "upgrade");
        request.set_header("sec-websocket-key", self.key.as_str());
        request.set_header("sec-websocket-version", WS_VERSION);
        if !self.config.protocols.is_empty() {
            request.set_header("sec-websocket-protocol", self.config.protocols.join(", "));
        }
        for (name, value) in &self.config.headers {
            request.set_header(name, value.as_str());
        }
        request
    }

    /// Validate the first response chunk.
    ///
    /// Checks run in order: status 101, `upgrade: websocket`, `connection`
    /// containing `upgrade`, a matching `sec-websocket-accept`, and no
    /// negotiated extensions.
    ///
    /// # Errors
    ///
    /// Returns the first [`HandshakeError`] encountered.
    pub fn validate(&self, data: &[u8]) -> Result<ClientUpgrade, HandshakeError> {
        let mut response = HttpMessage::parse(data)?;
        let status = response.status_code()?;
        if status != 101 {
            return Err(HandshakeError::UnexpectedStatus(status));
        }
        if !response
            .header("upgrade")
            .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
        {
            return Err(HandshakeError::MissingUpgrade);
        }
        if !response
            .header("connection")
            .is_some_and(|v| v.to_ascii_lowercase().contains("upgrade"))
        {
            return Err(HandshakeError::MissingConnectionUpgrade);
        }
        let actual = response
            .header("sec-websocket-accept")
            .ok_or(HandshakeError::MissingAccept)?;
        let expected = compute_accept_key(&self.key);
        if actual != expected {
            return Err(HandshakeError::AcceptMismatch {
                expected,
                actual: actual.to_owned(),
            });
        }
        if response
            .header("sec-websocket-extensions")
            .is_some_and(|v| !v.is_empty())
        {
            return Err(HandshakeError::ExtensionsUnsupported);
        }

        let protocol = response
            .header("sec-websocket-protocol")
            .filter(|p| !p.is_empty())
            .map(str::to_owned);
        let leftover = response.take_body().unwrap_or_default();
        Ok(ClientUpgrade {
            protocol,
            response,
            leftover,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::{ClientHandshake, ClientHandshakeConfig};
    use crate::handshake::HandshakeError;

    const KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";
    const ACCEPT: &str = "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=";

    #[fixture]
    fn handshake() -> ClientHandshake {
        ClientHandshake::with_key(
            ClientHandshakeConfig::new("/chat")
                .host("server.example.com")
                .protocol("chat")
                .protocol("superchat")
                .header("Origin", "http://example.com"),
            KEY,
        )
    }

    fn response(extra: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {ACCEPT}\r\n{extra}\r\n"
        )
        .into_bytes()
    }

    #[rstest]
    fn request_carries_upgrade_headers(handshake: ClientHandshake) {
        let request = handshake.request();
        assert_eq!(request.start_line(), "GET /chat HTTP/1.1");
        assert_eq!(request.header("Host"), Some("server.example.com"));
        assert_eq!(request.header("Upgrade"), Some("websocket"));
        assert_eq!(request.header("Connection"), Some("upgrade"));
        assert_eq!(request.header("Sec-WebSocket-Key"), Some(KEY));
        assert_eq!(request.header("Sec-WebSocket-Version"), Some("13"));
        assert_eq!(request.header("Sec-WebSocket-Protocol"), Some("chat, superchat"));
        assert_eq!(request.header("origin"), Some("http://example.com"));
    }

    #[rstest]
    fn accepts_valid_response_with_protocol_and_leftover(handshake: ClientHandshake) {
        let mut data = response("Sec-WebSocket-Protocol: chat\r\n");
        data.extend_from_slice(&[0x81, 0x00]);
        let upgrade = handshake.validate(&data).expect("valid response");
        assert_eq!(upgrade.protocol.as_deref(), Some("chat"));
        assert_eq!(&upgrade.leftover[..], &[0x81, 0x00]);
    }

    #[rstest]
    #[case::status(
        "HTTP/1.1 200 OK\r\n\r\n",
        HandshakeError::UnexpectedStatus(200)
    )]
    #[case::upgrade(
        "HTTP/1.1 101 Switching Protocols\r\nUpgrade: h2c\r\n\r\n",
        HandshakeError::MissingUpgrade
    )]
    #[case::connection(
        "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: keep-alive\r\n\r\n",
        HandshakeError::MissingConnectionUpgrade
    )]
    #[case::accept(
        "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n",
        HandshakeError::MissingAccept
    )]
    fn rejects_invalid_responses(
        handshake: ClientHandshake,
        #[case] data: &str,
        #[case] expected: HandshakeError,
    ) {
        assert_eq!(handshake.validate(data.as_bytes()), Err(expected));
    }

    #[rstest]
    fn rejects_wrong_accept(handshake: ClientHandshake) {
        let data = b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: bogus\r\n\r\n";
        assert!(matches!(
            handshake.validate(data),
            Err(HandshakeError::AcceptMismatch { actual, .. }) if actual == "bogus"
        ));
    }

    #[rstest]
    fn rejects_negotiated_extensions(handshake: ClientHandshake) {
        let data = response("Sec-WebSocket-Extensions: permessage-deflate\r\n");
        assert_eq!(handshake.validate(&data), Err(HandshakeError::ExtensionsUnsupported));
    }

    #[rstest]
    fn tolerates_empty_extensions_header(handshake: ClientHandshake) {
        let data = response("Sec-WebSocket-Extensions:\r\n");
        assert!(handshake.validate(&data).is_ok());
    }

    #[test]
    fn query_only_resource_gets_root_path() {
        assert_eq!(ClientHandshakeConfig::new("?a=1").resource(), "/?a=1");
    }
}
