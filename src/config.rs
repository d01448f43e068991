//! Channel configuration.
//!
//! [`ChannelConfig`] bounds memory use per channel and toggles the optional
//! checks the engine can perform on inbound data.

use std::num::NonZeroUsize;

use crate::{
    buffer::DEFAULT_COMPACT_THRESHOLD,
    frame::{FrameRules, MaskPolicy, Role},
    message::MessageAssembler,
};

/// Default per-frame payload cap (16 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: NonZeroUsize = match NonZeroUsize::new(16 * 1024 * 1024) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

/// Default reassembled message cap (64 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(64 * 1024 * 1024) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

/// Limits and validation switches for a channel.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use wiresocket::ChannelConfig;
///
/// let config = ChannelConfig::default()
///     .max_payload_size(NonZeroUsize::new(4096))
///     .validate_utf8(true);
/// assert_eq!(config.payload_limit(), NonZeroUsize::new(4096));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    max_payload_size: Option<NonZeroUsize>,
    max_message_size: Option<NonZeroUsize>,
    validate_utf8: bool,
    accept_masked_server_frames: bool,
    compact_threshold: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_payload_size: Some(DEFAULT_MAX_PAYLOAD_SIZE),
            max_message_size: Some(DEFAULT_MAX_MESSAGE_SIZE),
            validate_utf8: false,
            accept_masked_server_frames: false,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        }
    }
}

impl ChannelConfig {
    /// Per-frame payload cap. `None` removes the limit.
    #[must_use]
    pub const fn max_payload_size(mut self, limit: Option<NonZeroUsize>) -> Self {
        self.max_payload_size = limit;
        self
    }

    /// Reassembled message cap. `None` removes the limit.
    #[must_use]
    pub const fn max_message_size(mut self, limit: Option<NonZeroUsize>) -> Self {
        self.max_message_size = limit;
        self
    }

    /// Fail text messages that are not valid UTF-8 with status 1007.
    #[must_use]
    pub const fn validate_utf8(mut self, enabled: bool) -> Self {
        self.validate_utf8 = enabled;
        self
    }

    /// Let a client accept masked frames from a server, logging a warning
    /// instead of failing with 1002.
    #[must_use]
    pub const fn accept_masked_server_frames(mut self, enabled: bool) -> Self {
        self.accept_masked_server_frames = enabled;
        self
    }

    /// Consumed-prefix size at which the input buffer is compacted.
    #[must_use]
    pub const fn compact_threshold(mut self, bytes: usize) -> Self {
        self.compact_threshold = bytes;
        self
    }

    /// Configured per-frame cap.
    #[must_use]
    pub const fn payload_limit(&self) -> Option<NonZeroUsize> { self.max_payload_size }

    /// Configured message cap.
    #[must_use]
    pub const fn message_limit(&self) -> Option<NonZeroUsize> { self.max_message_size }

    /// Configured compaction threshold.
    #[must_use]
    pub const fn compaction(&self) -> usize { self.compact_threshold }

    /// Frame rules for a channel playing `role`.
    #[must_use]
    pub const fn frame_rules(&self, role: Role) -> FrameRules {
        let rules = FrameRules::for_role(role).with_max_payload_size(self.max_payload_size);
        if self.accept_masked_server_frames && matches!(role, Role::Client) {
            rules.with_mask_policy(MaskPolicy::Tolerated)
        } else {
            rules
        }
    }

    /// Message assembler honouring the message cap and UTF-8 switch.
    #[must_use]
    pub fn message_assembler(&self) -> MessageAssembler {
        MessageAssembler::new()
            .with_max_message_size(self.max_message_size)
            .with_utf8_validation(self.validate_utf8)
    }
}
