//! Staged, resumable frame-header parsing.
//!
//! A header is 2 to 14 bytes long and its exact size is only known once the
//! leading bytes have been seen. Parsing therefore moves through explicit
//! stages held in a [`ParseState`]; [`advance`] runs one stage and reports
//! whether the parser needs more input, can keep going, or has a complete
//! frame.

use bytes::BytesMut;
use log::warn;

use super::{
    FrameError,
    MAX_CONTROL_PAYLOAD,
    OpCode,
    assembler::{FrameRules, MaskPolicy},
};
use crate::buffer::StreamBuffer;

const FIN_BIT: u8 = 0x80;
const RSV_BITS: u8 = 0x70;
const OPCODE_BITS: u8 = 0x0F;
const MASK_BIT: u8 = 0x80;
const LEN7_BITS: u8 = 0x7F;
const LEN7_U16: u8 = 126;
const LEN7_U64: u8 = 127;

/// Fully resolved frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Final fragment of its message.
    pub fin: bool,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Masking key, present iff the mask bit was set.
    pub mask: Option<[u8; 4]>,
    /// Declared payload length.
    pub payload_len: u64,
}

/// Fields decoded from the first two header bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Lead {
    fin: bool,
    opcode: OpCode,
    masked: bool,
    len7: u8,
}

/// Width of the extended payload length that follows the lead bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ExtWidth {
    U16,
    U64,
}

/// Position of the parser within the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum ParseState {
    /// Waiting for the two lead bytes.
    #[default]
    AwaitingHeader,
    /// Waiting for a 2- or 8-byte extended length.
    AwaitingExtLength { lead: Lead, width: ExtWidth },
    /// Waiting for the 4-byte masking key.
    AwaitingMaskKey { lead: Lead, payload_len: u64 },
    /// Header resolved; copying payload bytes.
    AwaitingPayload { header: FrameHeader, remaining: u64 },
}

/// Outcome of a single [`advance`] call.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// Input exhausted before the stage could finish.
    Pending(ParseState),
    /// Stage finished; run the next one.
    Continue(ParseState),
    /// Header and payload are both complete.
    Complete(FrameHeader),
}

/// Run one parse stage.
///
/// Reads are all-or-nothing, so a `Pending` result leaves the buffer exactly
/// as it was for header stages. Payload bytes are moved into `payload` as
/// they become available.
pub(crate) fn advance(
    state: ParseState,
    input: &mut StreamBuffer,
    payload: &mut BytesMut,
    rules: &FrameRules,
) -> Result<Step, FrameError> {
    match state {
        ParseState::AwaitingHeader => {
            let Some([b0, b1]) = input.read_array::<2>() else {
                return Ok(Step::Pending(state));
            };
            let lead = decode_lead(b0, b1, rules)?;
            match lead.len7 {
                LEN7_U16 => Ok(Step::Continue(ParseState::AwaitingExtLength {
                    lead,
                    width: ExtWidth::U16,
                })),
                LEN7_U64 => Ok(Step::Continue(ParseState::AwaitingExtLength {
                    lead,
                    width: ExtWidth::U64,
                })),
                len => resolve_length(lead, u64::from(len), rules).map(Step::Continue),
            }
        }
        ParseState::AwaitingExtLength { lead, width } => {
            let len = match width {
                ExtWidth::U16 => input.read_u16().map(u64::from),
                ExtWidth::U64 => input.read_u64(),
            };
            let Some(len) = len else {
                return Ok(Step::Pending(state));
            };
            if len >> 63 != 0 {
                return Err(FrameError::NegativeLength);
            }
            resolve_length(lead, len, rules).map(Step::Continue)
        }
        ParseState::AwaitingMaskKey { lead, payload_len } => {
            let Some(key) = input.read_array::<4>() else {
                return Ok(Step::Pending(state));
            };
            Ok(Step::Continue(ParseState::AwaitingPayload {
                header: FrameHeader {
                    fin: lead.fin,
                    opcode: lead.opcode,
                    mask: Some(key),
                    payload_len,
                },
                remaining: payload_len,
            }))
        }
        ParseState::AwaitingPayload { header, remaining } => {
            let limit = usize::try_from(remaining).unwrap_or(usize::MAX);
            let moved = input.transfer_into(payload, limit) as u64;
            let remaining = remaining - moved;
            if remaining == 0 {
                Ok(Step::Complete(header))
            } else {
                Ok(Step::Pending(ParseState::AwaitingPayload { header, remaining }))
            }
        }
    }
}

fn decode_lead(b0: u8, b1: u8, rules: &FrameRules) -> Result<Lead, FrameError> {
    if b0 & RSV_BITS != 0 {
        return Err(FrameError::ReservedBits);
    }
    let opcode = OpCode::try_from(b0 & OPCODE_BITS)?;
    let fin = b0 & FIN_BIT != 0;
    let masked = b1 & MASK_BIT != 0;
    let len7 = b1 & LEN7_BITS;

    if opcode.is_control() {
        if !fin {
            return Err(FrameError::FragmentedControlFrame);
        }
        if usize::from(len7) > MAX_CONTROL_PAYLOAD {
            return Err(FrameError::ControlFrameTooLarge(usize::from(len7)));
        }
    }

    match (rules.mask_policy, masked) {
        (MaskPolicy::Required, false) => return Err(FrameError::MissingMask),
        (MaskPolicy::Forbidden, true) => return Err(FrameError::UnexpectedMask),
        (MaskPolicy::Tolerated, true) => warn!("accepting masked {opcode} frame from server"),
        _ => {}
    }

    Ok(Lead {
        fin,
        opcode,
        masked,
        len7,
    })
}

fn resolve_length(lead: Lead, len: u64, rules: &FrameRules) -> Result<ParseState, FrameError> {
    if let Some(max) = rules.max_payload_size
        && len > max.get() as u64
    {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: max.get(),
        });
    }
    if lead.masked {
        return Ok(ParseState::AwaitingMaskKey {
            lead,
            payload_len: len,
        });
    }
    Ok(ParseState::AwaitingPayload {
        header: FrameHeader {
            fin: lead.fin,
            opcode: lead.opcode,
            mask: None,
            payload_len: len,
        },
        remaining: len,
    })
}
