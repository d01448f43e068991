//! Echo server built on the `wiresocket` engine.
//!
//! Accepts TCP connections, performs the upgrade handshake, and echoes every
//! message back to its sender.

mod cli;

use std::{io, sync::Arc};

use clap::Parser;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tracing::{debug, info, warn};
use wiresocket::{
    BufferedTransport,
    Channel,
    ChannelConfig,
    ChannelHooks,
    ServerHandshake,
    WebSocketError,
    handshake::Accepted,
    http::HEADER_TERMINATOR,
};

/// Largest upgrade request the server will buffer.
const MAX_REQUEST_LEN: usize = 16 * 1024;

const READ_CHUNK: usize = 8 * 1024;

#[tokio::main]
async fn main() -> io::Result<()> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let mut handshake = ServerHandshake::new();
    if let Some(wanted) = cli.protocol {
        handshake = handshake.protocol_selector(move |offered| {
            offered.iter().find(|p| **p == wanted).map(|p| (*p).to_owned())
        });
    }
    let handshake = Arc::new(handshake);
    let mut config = ChannelConfig::default().validate_utf8(cli.validate_utf8);
    if cli.max_payload.is_some() {
        config = config.max_payload_size(cli.max_payload);
    }

    let listener = TcpListener::bind(cli.bind).await?;
    info!(addr = %listener.local_addr()?, "listening");
    loop {
        let (stream, peer) = listener.accept().await?;
        let handshake = Arc::clone(&handshake);
        tokio::spawn(async move {
            match serve(stream, &handshake, config).await {
                Ok(()) => debug!(%peer, "connection finished"),
                Err(err) => warn!(%peer, error = %err, "connection failed"),
            }
        });
    }
}

async fn serve(mut stream: TcpStream, handshake: &ServerHandshake, config: ChannelConfig) -> Result<(), WebSocketError> {
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut request = Vec::new();
    while !request.windows(HEADER_TERMINATOR.len()).any(|w| w == HEADER_TERMINATOR) {
        if request.len() > MAX_REQUEST_LEN {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "upgrade request too large").into());
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&chunk[..n]);
    }

    let mut transport = BufferedTransport::new();
    let accepted = handshake.accept(&request, &mut transport);
    stream.write_all(&transport.take_outbound()).await?;
    let Accepted::Upgrade(upgrade) = accepted? else {
        return Ok(());
    };
    info!(resource = %upgrade.resource, protocol = ?upgrade.protocol, "upgraded");

    let hooks = ChannelHooks::default()
        .on_message(|message, ctx| {
            if let Err(err) = ctx.send(message) {
                warn!(error = %err, "echo failed");
            }
        })
        .on_close(|code| debug!(?code, "channel closed"));
    let mut channel = Channel::accept(transport, hooks, upgrade, config);
    let mut outcome = channel.receive(&[]);
    loop {
        let outbound = channel.transport_mut().take_outbound();
        if !outbound.is_empty()
            && let Err(err) = stream.write_all(&outbound).await
        {
            channel.transport_error(err);
        }
        outcome?;
        if channel.transport().is_closed() {
            stream.shutdown().await?;
            return Ok(());
        }
        outcome = match stream.read(&mut chunk).await {
            Ok(0) => {
                channel.connection_closed();
                return Ok(());
            }
            Ok(n) => channel.receive(&chunk[..n]),
            Err(err) => {
                channel.transport_error(err);
                return Ok(());
            }
        };
    }
}
