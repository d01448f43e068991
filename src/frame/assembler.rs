//! Incremental frame assembly.
//!
//! [`FrameAssembler`] drives the staged header parser over a
//! [`StreamBuffer`] and yields one [`Frame`] each time a header and its full
//! payload have been buffered. Nothing is surfaced for a partial frame.

use std::{mem, num::NonZeroUsize};

use bytes::BytesMut;

use super::{
    Frame,
    FrameError,
    Role,
    header::{ParseState, Step, advance},
    mask::apply_mask,
};
use crate::buffer::StreamBuffer;

/// Expected mask-bit presence on inbound frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaskPolicy {
    /// Every frame must be masked (server receiving from a client).
    Required,
    /// No frame may be masked (client receiving from a server).
    Forbidden,
    /// Masked frames are accepted with a warning.
    Tolerated,
}

/// Validation rules applied while parsing inbound frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRules {
    /// Expected mask presence.
    pub mask_policy: MaskPolicy,
    /// Per-frame payload cap; `None` disables the check.
    pub max_payload_size: Option<NonZeroUsize>,
}

impl FrameRules {
    /// Rules for frames received by `role`, with no payload cap.
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        Self {
            mask_policy: role.inbound_mask_policy(),
            max_payload_size: None,
        }
    }

    /// Set the per-frame payload cap.
    #[must_use]
    pub const fn with_max_payload_size(mut self, max: Option<NonZeroUsize>) -> Self {
        self.max_payload_size = max;
        self
    }

    /// Override the mask policy.
    #[must_use]
    pub const fn with_mask_policy(mut self, policy: MaskPolicy) -> Self {
        self.mask_policy = policy;
        self
    }
}

/// Resumable frame parser.
///
/// # Examples
///
/// ```
/// use wiresocket::{
///     buffer::StreamBuffer,
///     frame::{FrameAssembler, FrameRules, OpCode, Role},
/// };
///
/// let mut assembler = FrameAssembler::new(FrameRules::for_role(Role::Client));
/// let mut input = StreamBuffer::new();
/// input.extend(&[0x81, 0x02, b'h']);
/// assert!(assembler.next_frame(&mut input).expect("valid").is_none());
/// input.extend(b"i");
/// let frame = assembler.next_frame(&mut input).expect("valid").expect("complete");
/// assert_eq!(frame.opcode(), OpCode::Text);
/// assert_eq!(frame.payload(), b"hi");
/// ```
#[derive(Debug)]
pub struct FrameAssembler {
    state: ParseState,
    payload: BytesMut,
    rules: FrameRules,
}

impl FrameAssembler {
    /// Create an assembler enforcing `rules`.
    #[must_use]
    pub fn new(rules: FrameRules) -> Self {
        Self {
            state: ParseState::AwaitingHeader,
            payload: BytesMut::new(),
            rules,
        }
    }

    /// Rules in force.
    #[must_use]
    pub const fn rules(&self) -> &FrameRules { &self.rules }

    /// Whether the assembler sits on a frame boundary.
    #[must_use]
    pub fn is_idle(&self) -> bool { self.state == ParseState::AwaitingHeader }

    /// Parse the next complete frame from `input`.
    ///
    /// Returns `Ok(None)` when more bytes are needed. Parse progress is kept
    /// between calls, so the caller can append the next delivery and call
    /// again. The payload of a masked frame is unmasked before it is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] when the header violates the protocol or the
    /// configured rules. The assembler is reset to a frame boundary.
    pub fn next_frame(&mut self, input: &mut StreamBuffer) -> Result<Option<Frame>, FrameError> {
        loop {
            let state = mem::take(&mut self.state);
            match advance(state, input, &mut self.payload, &self.rules) {
                Ok(Step::Continue(next)) => self.state = next,
                Ok(Step::Pending(next)) => {
                    self.state = next;
                    return Ok(None);
                }
                Ok(Step::Complete(header)) => {
                    let mut payload = self.payload.split();
                    if let Some(key) = header.mask {
                        apply_mask(&mut payload, key);
                    }
                    return Ok(Some(Frame::from_parts(header, payload.freeze())));
                }
                Err(err) => {
                    self.payload.clear();
                    return Err(err);
                }
            }
        }
    }

    /// Drop any partially parsed frame.
    pub fn reset(&mut self) {
        self.state = ParseState::AwaitingHeader;
        self.payload.clear();
    }
}
