//! Command line interface for the `wiresocket` echo server.
//!
//! Also consumed by the build script to generate the man page.

use std::{net::SocketAddr, num::NonZeroUsize};

use clap::Parser;

/// Command line arguments for the `wiresocket` binary.
#[derive(Debug, Parser)]
#[command(name = "wiresocket", version, about = "WebSocket echo server")]
pub struct Cli {
    /// Address to listen on.
    #[arg(short, long, default_value = "127.0.0.1:9001")]
    pub bind: SocketAddr,

    /// Largest accepted frame payload in bytes.
    #[arg(long)]
    pub max_payload: Option<NonZeroUsize>,

    /// Subprotocol to accept when the client offers it.
    #[arg(short, long)]
    pub protocol: Option<String>,

    /// Fail text messages that are not valid UTF-8.
    #[arg(long)]
    pub validate_utf8: bool,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn parses_options() {
        let cli = Cli::parse_from([
            "wiresocket",
            "--bind",
            "0.0.0.0:8080",
            "--max-payload",
            "1024",
            "--protocol",
            "chat",
        ]);
        assert_eq!(cli.bind.port(), 8080);
        assert_eq!(cli.max_payload.map(std::num::NonZeroUsize::get), Some(1024));
        assert_eq!(cli.protocol.as_deref(), Some("chat"));
        assert!(!cli.validate_utf8);
    }

    #[test]
    fn defaults_to_loopback() {
        let cli = Cli::parse_from(["wiresocket"]);
        assert!(cli.bind.ip().is_loopback());
        assert!(cli.max_payload.is_none());
    }
}
