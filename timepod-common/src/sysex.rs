// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Vendor SysEx framing.
//!
//! Frame layout:
//!
//! ```text
//! F0 | manufacturer (3) | device (2) | type (1) | payload (n) | F7
//! ```
//!
//! Every byte between the markers must be 7-bit clean. The codec never
//! splits 8-bit data into 7-bit groups; callers keep their values in range.

use thiserror::Error;

/// Start of a System Exclusive message.
pub const SYSEX_START: u8 = 0xF0;
/// End of a System Exclusive message.
pub const SYSEX_END: u8 = 0xF7;

/// Shortest frame that still carries a message type byte.
pub const MIN_FRAME_LEN: usize = 8;

/// Offset of the message type byte inside a frame.
pub const TYPE_OFFSET: usize = 6;

/// Encoded manufacturer/device prefix of a vendor frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SysExAddress {
    pub manufacturer: [u8; 3],
    pub device: [u8; 2],
}

impl SysExAddress {
    pub const fn new(manufacturer: [u8; 3], device: [u8; 2]) -> Self {
        Self {
            manufacturer,
            device,
        }
    }

    /// Derive the 7-bit-safe prefix from USB vendor/product ids.
    ///
    /// The manufacturer becomes an extended (3-byte) id, the product the
    /// device pair. The top bit of every byte is dropped.
    pub const fn from_usb_ids(vendor: u16, product: u16) -> Self {
        Self {
            manufacturer: [0x00, ((vendor >> 8) as u8) & 0x7F, (vendor as u8) & 0x7F],
            device: [((product >> 8) as u8) & 0x7F, (product as u8) & 0x7F],
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    #[error("byte 0x{value:02x} at frame offset {offset} is not 7-bit clean")]
    NotSevenBit { offset: usize, value: u8 },
}

/// A decoded vendor frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SysExFrame {
    pub address: SysExAddress,
    pub message_type: u8,
    pub payload: Vec<u8>,
}

/// Build a complete frame around `payload`.
pub fn encode(
    address: &SysExAddress,
    message_type: u8,
    payload: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    let mut frame = Vec::with_capacity(MIN_FRAME_LEN + payload.len());
    frame.push(SYSEX_START);
    frame.extend_from_slice(&address.manufacturer);
    frame.extend_from_slice(&address.device);
    frame.push(message_type);
    frame.extend_from_slice(payload);

    if let Some((offset, &value)) = frame.iter().enumerate().skip(1).find(|(_, b)| **b > 0x7F) {
        return Err(EncodeError::NotSevenBit { offset, value });
    }

    frame.push(SYSEX_END);
    Ok(frame)
}

/// Split a frame into address, type and payload.
///
/// Returns `None` for anything that is not a complete vendor frame; the MIDI
/// input is shared with unrelated traffic, so this is not an error.
pub fn decode(frame: &[u8]) -> Option<SysExFrame> {
    if frame.len() < MIN_FRAME_LEN {
        return None;
    }
    if frame[0] != SYSEX_START || frame[frame.len() - 1] != SYSEX_END {
        return None;
    }

    Some(SysExFrame {
        address: SysExAddress::new([frame[1], frame[2], frame[3]], [frame[4], frame[5]]),
        message_type: frame[TYPE_OFFSET],
        payload: frame[TYPE_OFFSET + 1..frame.len() - 1].to_vec(),
    })
}
