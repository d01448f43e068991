//! Metric helpers for `wiresocket`.
//!
//! Thin wrappers over the [`metrics`](https://docs.rs/metrics) facade. With
//! the `metrics` feature disabled every helper compiles to nothing.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking open channels.
pub const CHANNELS_ACTIVE: &str = "wiresocket_channels_active";
/// Name of the counter tracking processed frames.
pub const FRAMES_PROCESSED: &str = "wiresocket_frames_processed_total";
/// Name of the counter tracking channel errors.
pub const ERRORS_TOTAL: &str = "wiresocket_errors_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Frames received from the peer.
    Inbound,
    /// Frames written to the peer.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), expect(dead_code, reason = "only labels metrics"))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the open channels gauge.
pub fn inc_channels() {
    #[cfg(feature = "metrics")]
    gauge!(CHANNELS_ACTIVE).increment(1.0);
}

/// Decrement the open channels gauge.
pub fn dec_channels() {
    #[cfg(feature = "metrics")]
    gauge!(CHANNELS_ACTIVE).decrement(1.0);
}

/// Record a processed frame for the given direction.
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_PROCESSED, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a channel error with its close status.
pub fn inc_errors(code: u16) {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL, "code" => code.to_string()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = code;
}
