//! Unit tests for channel dispatch and lifecycle.

use std::{io, num::NonZeroUsize};

use bytes::Bytes;
use rstest::{fixture, rstest};

use super::*;
use crate::{
    frame::FrameError,
    handshake::{ClientHandshakeConfig, compute_accept_key},
    message::MessageError,
};

#[derive(Debug, PartialEq)]
enum Event {
    Open(Option<String>),
    Message(Message),
    Pong(Bytes),
    Error(String),
    Close(Option<CloseCode>),
}

/// Records events; optionally replies or closes from inside callbacks.
#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
    echo: bool,
    close_on_message: bool,
}

impl ChannelHandler for Recorder {
    fn on_open(&mut self, protocol: Option<&str>, _ctx: &mut ChannelContext<'_>) {
        self.events.push(Event::Open(protocol.map(str::to_owned)));
    }

    fn on_message(&mut self, message: Message, ctx: &mut ChannelContext<'_>) {
        if self.echo {
            ctx.send(message.clone()).expect("echo while open");
        }
        if self.close_on_message {
            ctx.close(Some(CloseCode::NORMAL)).expect("close while open");
        }
        self.events.push(Event::Message(message));
    }

    fn on_pong(&mut self, payload: Bytes, _ctx: &mut ChannelContext<'_>) { self.events.push(Event::Pong(payload)); }

    fn on_error(&mut self, error: &WebSocketError) { self.events.push(Event::Error(error.to_string())); }

    fn on_close(&mut self, code: Option<CloseCode>) { self.events.push(Event::Close(code)); }
}

/// Fails every write.
struct BrokenTransport;

impl Transport for BrokenTransport {
    fn write(&mut self, _data: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
    }

    fn close(&mut self) {}
}

const KEY: [u8; 4] = [0x11, 0x22, 0x33, 0x44];

fn masked(first: u8, payload: &[u8]) -> Vec<u8> {
    let len = u8::try_from(payload.len()).expect("short test payload");
    assert!(len < 126);
    let mut out = vec![first, 0x80 | len];
    out.extend_from_slice(&KEY);
    out.extend(payload.iter().enumerate().map(|(i, b)| b ^ KEY[i % 4]));
    out
}

fn upgrade() -> ServerUpgrade {
    ServerUpgrade {
        resource: "/chat".to_owned(),
        protocol: Some("chat".to_owned()),
        request: crate::http::HttpMessage::request("GET", "/chat"),
        leftover: Bytes::new(),
    }
}

fn server_with(handler: Recorder, config: ChannelConfig) -> Channel<BufferedTransport, Recorder> {
    let mut channel = Channel::accept(BufferedTransport::new(), handler, upgrade(), config);
    channel.handler_mut().events.clear();
    channel
}

#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
fn server() -> Channel<BufferedTransport, Recorder> { server_with(Recorder::default(), ChannelConfig::default()) }

#[test]
fn accept_opens_and_reports_protocol() {
    let channel = Channel::accept(BufferedTransport::new(), Recorder::default(), upgrade(), ChannelConfig::default());
    assert_eq!(channel.state(), ChannelState::Open);
    assert_eq!(channel.protocol(), Some("chat"));
    assert_eq!(channel.resource(), "/chat");
    assert_eq!(channel.role(), Role::Server);
    assert_eq!(channel.handler().events, vec![Event::Open(Some("chat".to_owned()))]);
}

#[test]
fn leftover_bytes_are_parsed_on_next_receive() {
    let mut upgrade = upgrade();
    upgrade.leftover = Bytes::from(masked(0x81, b"early"));
    let mut channel = Channel::accept(BufferedTransport::new(), Recorder::default(), upgrade, ChannelConfig::default());
    channel.receive(&[]).expect("buffered frame");
    assert_eq!(
        channel.handler().events.last(),
        Some(&Event::Message(Message::text("early")))
    );
}

#[test]
fn server_echoes_unmasked() {
    let mut channel = server_with(
        Recorder {
            echo: true,
            ..Recorder::default()
        },
        ChannelConfig::default(),
    );
    channel.receive(&masked(0x81, b"Hi")).expect("valid frame");
    assert_eq!(&channel.transport_mut().take_outbound()[..], b"\x81\x02Hi");
    assert_eq!(channel.handler().events, vec![Event::Message(Message::text("Hi"))]);
}

#[rstest]
fn fragments_reassemble_around_control_frames(mut server: Channel<BufferedTransport, Recorder>) {
    let mut bytes = masked(0x01, b"Hel");
    bytes.extend(masked(0x89, b"p"));
    bytes.extend(masked(0x80, b"lo"));
    server.receive(&bytes[..10]).expect("first fragment");
    assert!(server.is_message_in_progress());
    server.receive(&bytes[10..]).expect("rest");
    assert!(!server.is_message_in_progress());
    assert_eq!(server.handler().events, vec![Event::Message(Message::text("Hello"))]);
    assert_eq!(&server.transport_mut().take_outbound()[..], b"\x8a\x01p");
}

#[rstest]
fn pong_reaches_handler(mut server: Channel<BufferedTransport, Recorder>) {
    server.receive(&masked(0x8A, b"beat")).expect("valid pong");
    assert_eq!(server.handler().events, vec![Event::Pong(Bytes::from_static(b"beat"))]);
    assert!(!server.transport().has_outbound());
}

#[rstest]
#[case::with_code(&[0x03, 0xE8, b'b', b'y', b'e'][..], Some(CloseCode::NORMAL), &[0x88, 0x02, 0x03, 0xE8][..])]
#[case::empty(&[][..], Some(CloseCode::NO_STATUS), &[0x88, 0x00][..])]
fn peer_close_is_echoed(
    mut server: Channel<BufferedTransport, Recorder>,
    #[case] payload: &[u8],
    #[case] reported: Option<CloseCode>,
    #[case] echoed: &[u8],
) {
    server.receive(&masked(0x88, payload)).expect("valid close");
    assert_eq!(server.state(), ChannelState::Closed);
    assert!(server.transport().is_closed());
    assert_eq!(&server.transport_mut().take_outbound()[..], echoed);
    assert_eq!(server.handler().events, vec![Event::Close(reported)]);
}

#[rstest]
fn frames_after_close_are_ignored(mut server: Channel<BufferedTransport, Recorder>) {
    let mut bytes = masked(0x88, &[0x03, 0xE8]);
    bytes.extend(masked(0x81, b"late"));
    server.receive(&bytes).expect("close then data");
    server.receive(&masked(0x81, b"later")).expect("ignored");
    assert_eq!(server.handler().events, vec![Event::Close(Some(CloseCode::NORMAL))]);
}

#[rstest]
fn unmasked_client_frame_fails_with_protocol_error(mut server: Channel<BufferedTransport, Recorder>) {
    let err = server.receive(b"\x81\x02Hi").expect_err("server requires masks");
    assert!(matches!(err, WebSocketError::Frame(FrameError::MissingMask)));
    assert_eq!(&server.transport_mut().take_outbound()[..], &[0x88, 0x02, 0x03, 0xEA]);
    assert!(server.transport().is_closed());
    assert!(matches!(server.handler().events[0], Event::Error(_)));
    assert_eq!(server.handler().events[1], Event::Close(Some(CloseCode::PROTOCOL_ERROR)));
}

#[test]
fn invalid_utf8_fails_with_1007_when_validated() {
    let mut channel = server_with(Recorder::default(), ChannelConfig::default().validate_utf8(true));
    let err = channel.receive(&masked(0x81, &[0xFF, 0xFE])).expect_err("invalid text");
    assert!(matches!(err, WebSocketError::Message(MessageError::InvalidUtf8)));
    assert_eq!(
        channel.handler().events.last(),
        Some(&Event::Close(Some(CloseCode::INVALID_DATA)))
    );
}

#[rstest]
fn close_from_handler_is_reported_once(mut server: Channel<BufferedTransport, Recorder>) {
    server.handler_mut().close_on_message = true;
    let mut bytes = masked(0x82, b"x");
    bytes.extend(masked(0x82, b"y"));
    server.receive(&bytes).expect("close requested by handler");
    assert_eq!(
        server.handler().events,
        vec![
            Event::Message(Message::binary(&b"x"[..])),
            Event::Close(Some(CloseCode::NORMAL)),
        ]
    );
    assert_eq!(&server.transport_mut().take_outbound()[..], &[0x88, 0x02, 0x03, 0xE8]);
}

#[rstest]
fn local_close_then_send_fails(mut server: Channel<BufferedTransport, Recorder>) {
    server.close(Some(CloseCode::GOING_AWAY)).expect("close");
    server.close(Some(CloseCode::NORMAL)).expect("second close is a no-op");
    assert!(matches!(server.send_text("late"), Err(WebSocketError::Closed)));
    assert_eq!(server.handler().events, vec![Event::Close(Some(CloseCode::GOING_AWAY))]);
}

#[rstest]
fn connection_drop_reports_abnormal(mut server: Channel<BufferedTransport, Recorder>) {
    server.connection_closed();
    server.connection_closed();
    assert_eq!(server.handler().events, vec![Event::Close(Some(CloseCode::ABNORMAL))]);
}

#[rstest]
fn oversized_ping_is_rejected(mut server: Channel<BufferedTransport, Recorder>) {
    let err = server.ping(vec![0u8; 126]).expect_err("too large");
    assert!(matches!(err, WebSocketError::Frame(FrameError::ControlFrameTooLarge(126))));
    assert!(server.is_open());
}

#[test]
fn write_failure_closes_abnormally() {
    let mut channel = Channel::accept(BrokenTransport, Recorder::default(), upgrade(), ChannelConfig::default());
    let err = channel.send_text("hi").expect_err("broken transport");
    assert!(matches!(err, WebSocketError::Transport(_)));
    assert_eq!(channel.state(), ChannelState::Closed);
    assert_eq!(channel.handler().events.last(), Some(&Event::Close(Some(CloseCode::ABNORMAL))));
}

fn client() -> Channel<BufferedTransport, Recorder> {
    let handshake = ClientHandshake::with_key(
        ClientHandshakeConfig::new("/feed").host("example.com"),
        "dGhlIHNhbXBsZSBub25jZQ==",
    );
    Channel::client(BufferedTransport::new(), Recorder::default(), handshake, ChannelConfig::default())
}

fn switching_protocols(accept: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\r\n"
    )
    .into_bytes()
}

#[test]
fn client_sends_request_on_start() {
    let mut channel = client();
    assert!(matches!(channel.send_text("early"), Err(WebSocketError::NotOpen)));
    channel.start().expect("request written");
    let request = channel.transport_mut().take_outbound();
    assert!(request.starts_with(b"GET /feed HTTP/1.1\r\n"));
    assert!(request.ends_with(b"\r\n\r\n"));
}

#[test]
fn client_opens_and_parses_frames_after_response() {
    let mut channel = client();
    channel.start().expect("request written");
    let mut response = switching_protocols(&compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="));
    response.extend_from_slice(b"\x81\x05hello");
    channel.receive(&response).expect("valid upgrade");
    assert!(channel.is_open());
    assert_eq!(
        channel.handler().events,
        vec![Event::Open(None), Event::Message(Message::text("hello"))]
    );
}

#[test]
fn client_rejects_bad_accept() {
    let mut channel = client();
    channel.start().expect("request written");
    let err = channel
        .receive(&switching_protocols("bm90IHRoZSByaWdodCBrZXk="))
        .expect_err("mismatched accept");
    assert!(matches!(err, WebSocketError::Handshake(_)));
    assert_eq!(channel.state(), ChannelState::Closed);
    assert!(matches!(channel.handler().events[0], Event::Error(_)));
    assert_eq!(channel.handler().events[1], Event::Close(None));
}

#[test]
fn client_rejects_masked_server_frame() {
    let mut channel = client();
    channel.start().expect("request written");
    let mut response = switching_protocols(&compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="));
    response.extend(masked(0x81, b"hi"));
    let err = channel.receive(&response).expect_err("masked server frame");
    assert!(matches!(err, WebSocketError::Frame(FrameError::UnexpectedMask)));
    assert_eq!(channel.handler().events.last(), Some(&Event::Close(Some(CloseCode::PROTOCOL_ERROR))));
}

#[test]
fn failed_pong_write_reports_error_before_close() {
    let mut channel = Channel::accept(BrokenTransport, Recorder::default(), upgrade(), ChannelConfig::default());
    channel.handler_mut().events.clear();
    let err = channel.receive(&masked(0x89, b"p")).expect_err("pong cannot be written");
    assert!(matches!(err, WebSocketError::Transport(_)));
    assert_eq!(channel.state(), ChannelState::Closed);
    let events = &channel.handler().events;
    assert_eq!(events.len(), 2, "unexpected events: {events:?}");
    assert!(matches!(events[0], Event::Error(_)));
    assert_eq!(events[1], Event::Close(Some(CloseCode::ABNORMAL)));
}

#[rstest]
#[case::single_frame(
    ChannelConfig::default().max_payload_size(NonZeroUsize::new(4)),
    masked(0x82, b"toolong")
)]
#[case::across_fragments(
    ChannelConfig::default().max_message_size(NonZeroUsize::new(4)),
    [masked(0x02, b"abc"), masked(0x80, b"de")].concat()
)]
fn oversized_input_closes_with_1009(#[case] config: ChannelConfig, #[case] bytes: Vec<u8>) {
    let mut channel = server_with(Recorder::default(), config);
    let err = channel.receive(&bytes).expect_err("over the cap");
    assert_eq!(err.close_code(), CloseCode::MESSAGE_TOO_BIG);
    assert_eq!(&channel.transport_mut().take_outbound()[..], &[0x88, 0x02, 0x03, 0xF1]);
    assert!(channel.transport().is_closed());
    let events = &channel.handler().events;
    assert_eq!(events.len(), 2, "unexpected events: {events:?}");
    assert!(matches!(events[0], Event::Error(_)));
    assert_eq!(events[1], Event::Close(Some(CloseCode::MESSAGE_TOO_BIG)));
}
