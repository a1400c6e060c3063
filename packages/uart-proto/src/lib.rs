//! # uart-proto
//!
//! Shared wire-format definitions for the LineScout UART protocol.
//!
//! These types are used by:
//! - `brain-rust`: framing commands to and parsing events from the vehicle
//! - `packages/vehicle-sim`: playing the firmware side of the same link
//!
//! ## Framing
//!
//! Commands (brain → vehicle): `[cmd_id] [payload] [checksum]` where the
//! checksum is the XOR of the command id and every payload byte. The payload
//! length is fixed per command, so the firmware never needs a length field.
//!
//! Events (vehicle → brain): `[event_id] [payload] [checksum]`. START and
//! ALIGNED carry one payload byte, LOG_MESSAGE carries a one-byte length
//! followed by that many UTF-8 bytes, everything else is payload-free. The
//! checksum covers the event id and the payload but *not* the LOG_MESSAGE
//! length byte (firmware quirk, kept for compatibility).
//!
//! Multi-byte integers are little-endian.

use thiserror::Error;

// ── Commands ──────────────────────────────────────────────────────────────────

/// Commands the brain sends to the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Turn by a relative angle: `angle: i16` (degrees), `snap: u8` (0/1)
    Turn = 0x01,
    /// Follow the current line until the next event
    FollowLine = 0x02,
    /// Enable or disable firmware debug logging: `enabled: u8`
    SetDebugLogging = 0x04,
    /// Set the drive speed: `speed: i8`
    SetSpeed = 0x05,
    /// Announce that the mission target has been reached
    DestinationReached = 0x06,
}

impl Command {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Turn),
            0x02 => Some(Self::FollowLine),
            0x04 => Some(Self::SetDebugLogging),
            0x05 => Some(Self::SetSpeed),
            0x06 => Some(Self::DestinationReached),
            _ => None,
        }
    }

    /// Fixed wire payload size of this command.
    pub fn payload_len(self) -> usize {
        match self {
            Self::Turn => 3,
            Self::SetDebugLogging | Self::SetSpeed => 1,
            Self::FollowLine | Self::DestinationReached => 0,
        }
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// Events the vehicle sends to the brain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Event {
    /// Mission start button: one byte selecting the target end node (0..2)
    Start = 0x10,
    /// A waypoint was reached
    PointReached = 0x11,
    /// The expected line segment is missing
    NoLineFound = 0x12,
    /// The next waypoint ahead is blocked
    NextPointBlocked = 0x13,
    /// An obstacle was seen mid-segment
    ObstacleDetected = 0x14,
    /// Turn finished: one byte hold flag (1 = wait for further instructions)
    Aligned = 0x15,
    /// The vehicle aborted and is driving back to the last waypoint
    Returning = 0x16,
    /// Diagnostic text: one length byte, then that many UTF-8 bytes
    LogMessage = 0x17,
}

impl Event {
    pub const ALL: [Event; 8] = [
        Event::Start,
        Event::PointReached,
        Event::NoLineFound,
        Event::NextPointBlocked,
        Event::ObstacleDetected,
        Event::Aligned,
        Event::Returning,
        Event::LogMessage,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x10 => Some(Self::Start),
            0x11 => Some(Self::PointReached),
            0x12 => Some(Self::NoLineFound),
            0x13 => Some(Self::NextPointBlocked),
            0x14 => Some(Self::ObstacleDetected),
            0x15 => Some(Self::Aligned),
            0x16 => Some(Self::Returning),
            0x17 => Some(Self::LogMessage),
            _ => None,
        }
    }

    /// How the payload of this event is framed on the wire.
    pub fn payload_len(self) -> PayloadLen {
        match self {
            Self::Start | Self::Aligned => PayloadLen::Fixed(1),
            Self::LogMessage => PayloadLen::LengthPrefixed,
            _ => PayloadLen::Fixed(0),
        }
    }
}

/// Wire payload framing of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLen {
    Fixed(usize),
    /// One length byte, then that many payload bytes
    LengthPrefixed,
}

// ── Checksum & framing ────────────────────────────────────────────────────────

/// XOR checksum over the given bytes.
pub fn xor_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, byte| acc ^ byte)
}

/// Frame a command: id, payload, checksum over both.
pub fn encode_command(command: Command, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 2);
    frame.push(command as u8);
    frame.extend_from_slice(payload);
    frame.push(xor_checksum(&frame));
    frame
}

/// Frame an event the way the firmware does. LOG_MESSAGE payloads get a
/// length prefix that stays outside the checksum.
pub fn encode_event(event: Event, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 3);
    frame.push(event as u8);
    if event == Event::LogMessage {
        frame.push(payload.len() as u8);
    }
    frame.extend_from_slice(payload);
    let mut checked = Vec::with_capacity(payload.len() + 1);
    checked.push(event as u8);
    checked.extend_from_slice(payload);
    frame.push(xor_checksum(&checked));
    frame
}

/// Verify the checksum of a received frame (id byte plus payload).
pub fn verify_frame(id: u8, payload: &[u8], checksum: u8) -> Result<(), FrameError> {
    let mut message = Vec::with_capacity(payload.len() + 1);
    message.push(id);
    message.extend_from_slice(payload);
    let expected = xor_checksum(&message);
    if expected == checksum {
        Ok(())
    } else {
        Err(FrameError::ChecksumMismatch {
            expected,
            actual: checksum,
        })
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// A frame that could not be accepted. Recoverable: the reader logs it and
/// resumes at the next byte.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("unknown command id 0x{0:02x}")]
    UnknownCommand(u8),
    #[error("unknown event id 0x{0:02x}")]
    UnknownEvent(u8),
    #[error("checksum mismatch: expected 0x{expected:02x}, got 0x{actual:02x}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}
