// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Configuration message catalogue for the TP-001.
//!
//! Every message travels as `[type, payload...]` inside a vendor SysEx frame
//! (see [`crate::sysex`]). This module is stateless: it only maps between
//! [`ConfigMessage`] values and their byte shapes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sysex::{self, EncodeError, SysExAddress};

// --- Device geometry ---

pub const BANK_COUNT: usize = 8;
pub const KNOB_COUNT: usize = 16;
pub const SNAPSHOT_COUNT: usize = 8;

/// Snapshot index meaning "every snapshot of the bank".
pub const ALL_SNAPSHOTS: u8 = 8;

/// Largest value that fits a SysEx data byte.
pub const MAX_DATA_VALUE: u8 = 0x7F;

// --- Message types ---

#[repr(u8)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Brightness = 0x01,
    FirmwareVersion = 0x02,
    KnobColor = 0x03,
    KnobType = 0x04,
    KnobCcType = 0x05,
    KnobMidiChannel = 0x06,
    KnobMidiCc1 = 0x07,
    KnobMidiCc2 = 0x08,
    BankColor = 0x09,
    BankSnapshotColor = 0x0A,
    /// Reboot into the serial bootloader.
    FirmwareUpload = 0x7D,
    /// Ask the device to dump its whole configuration.
    Sync = 0x7E,
}

impl MessageType {
    pub const ALL: [MessageType; 12] = [
        MessageType::Brightness,
        MessageType::FirmwareVersion,
        MessageType::KnobColor,
        MessageType::KnobType,
        MessageType::KnobCcType,
        MessageType::KnobMidiChannel,
        MessageType::KnobMidiCc1,
        MessageType::KnobMidiCc2,
        MessageType::BankColor,
        MessageType::BankSnapshotColor,
        MessageType::FirmwareUpload,
        MessageType::Sync,
    ];

    /// Payload length (after the type byte) the message needs.
    pub fn payload_len(self) -> usize {
        match self {
            MessageType::Brightness => 1,
            MessageType::FirmwareVersion => 2,
            MessageType::KnobColor => 4,
            MessageType::KnobType
            | MessageType::KnobCcType
            | MessageType::KnobMidiChannel
            | MessageType::KnobMidiCc1
            | MessageType::KnobMidiCc2
            | MessageType::BankSnapshotColor => 3,
            MessageType::BankColor => 2,
            MessageType::FirmwareUpload | MessageType::Sync => 0,
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = DecodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        MessageType::ALL
            .into_iter()
            .find(|t| *t as u8 == code)
            .ok_or(DecodeError::UnknownType(code))
    }
}

// --- Knob settings ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Fill,
    Bipolar,
    Pointer,
}

impl DisplayMode {
    pub fn code(self) -> u8 {
        match self {
            DisplayMode::Fill => 0,
            DisplayMode::Bipolar => 1,
            DisplayMode::Pointer => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DisplayMode::Fill),
            1 => Some(DisplayMode::Bipolar),
            2 => Some(DisplayMode::Pointer),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CcType {
    #[default]
    Standard7,
    Standard14,
    Nrpn14,
}

impl CcType {
    pub fn code(self) -> u8 {
        match self {
            CcType::Standard7 => 0,
            CcType::Standard14 => 1,
            CcType::Nrpn14 => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CcType::Standard7),
            1 => Some(CcType::Standard14),
            2 => Some(CcType::Nrpn14),
            _ => None,
        }
    }
}

/// Which snapshot slot(s) a colour update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotTarget {
    One(u8),
    All,
}

impl SnapshotTarget {
    fn wire(self) -> u8 {
        match self {
            SnapshotTarget::One(index) => index,
            SnapshotTarget::All => ALL_SNAPSHOTS,
        }
    }

    fn from_wire(value: u8) -> Result<Self, DecodeError> {
        match value {
            ALL_SNAPSHOTS => Ok(SnapshotTarget::All),
            v if (v as usize) < SNAPSHOT_COUNT => Ok(SnapshotTarget::One(v)),
            v => Err(DecodeError::OutOfRange {
                field: "snapshot",
                value: v,
            }),
        }
    }
}

// --- Messages ---

/// A configuration message, in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMessage {
    Brightness(u8),
    FirmwareVersion { major: u8, minor: u8 },
    KnobColor { bank: u8, snapshot: SnapshotTarget, knob: u8, color: u8 },
    KnobType { bank: u8, knob: u8, mode: DisplayMode },
    KnobCcType { bank: u8, knob: u8, cc_type: CcType },
    /// `channel` is 1-based (1-16); the wire carries `channel - 1`.
    KnobMidiChannel { bank: u8, knob: u8, channel: u8 },
    KnobMidiCc1 { bank: u8, knob: u8, cc: u8 },
    KnobMidiCc2 { bank: u8, knob: u8, cc: u8 },
    BankColor { bank: u8, color: u8 },
    BankSnapshotColor { bank: u8, snapshot: SnapshotTarget, color: u8 },
    FirmwareUpload,
    Sync,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown message type 0x{0:02x}")]
    UnknownType(u8),

    #[error("{message_type:?} needs {expected} payload bytes, got {actual}")]
    Truncated {
        message_type: MessageType,
        expected: usize,
        actual: usize,
    },

    #[error("{field} value {value} out of range")]
    OutOfRange { field: &'static str, value: u8 },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("{field} value {value} out of range")]
    OutOfRange { field: &'static str, value: u8 },

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

fn check(field: &'static str, value: u8, limit: usize) -> Result<u8, ProtocolError> {
    if (value as usize) < limit {
        Ok(value)
    } else {
        Err(ProtocolError::OutOfRange { field, value })
    }
}

fn check_data(field: &'static str, value: u8) -> Result<u8, ProtocolError> {
    check(field, value, MAX_DATA_VALUE as usize + 1)
}

fn check_snapshot(target: SnapshotTarget) -> Result<u8, ProtocolError> {
    match target {
        SnapshotTarget::All => Ok(ALL_SNAPSHOTS),
        SnapshotTarget::One(index) => check("snapshot", index, SNAPSHOT_COUNT),
    }
}

fn decoded(field: &'static str, value: u8, limit: usize) -> Result<u8, DecodeError> {
    if (value as usize) < limit {
        Ok(value)
    } else {
        Err(DecodeError::OutOfRange { field, value })
    }
}

impl ConfigMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            ConfigMessage::Brightness(_) => MessageType::Brightness,
            ConfigMessage::FirmwareVersion { .. } => MessageType::FirmwareVersion,
            ConfigMessage::KnobColor { .. } => MessageType::KnobColor,
            ConfigMessage::KnobType { .. } => MessageType::KnobType,
            ConfigMessage::KnobCcType { .. } => MessageType::KnobCcType,
            ConfigMessage::KnobMidiChannel { .. } => MessageType::KnobMidiChannel,
            ConfigMessage::KnobMidiCc1 { .. } => MessageType::KnobMidiCc1,
            ConfigMessage::KnobMidiCc2 { .. } => MessageType::KnobMidiCc2,
            ConfigMessage::BankColor { .. } => MessageType::BankColor,
            ConfigMessage::BankSnapshotColor { .. } => MessageType::BankSnapshotColor,
            ConfigMessage::FirmwareUpload => MessageType::FirmwareUpload,
            ConfigMessage::Sync => MessageType::Sync,
        }
    }

    /// Payload bytes following the type byte, range-checked for the wire.
    pub fn payload(&self) -> Result<Vec<u8>, ProtocolError> {
        let bytes = match *self {
            ConfigMessage::Brightness(value) => vec![check_data("brightness", value)?],
            ConfigMessage::FirmwareVersion { major, minor } => {
                vec![check_data("major", major)?, check_data("minor", minor)?]
            }
            ConfigMessage::KnobColor {
                bank,
                snapshot,
                knob,
                color,
            } => vec![
                check("bank", bank, BANK_COUNT)?,
                check_snapshot(snapshot)?,
                check("knob", knob, KNOB_COUNT)?,
                check_data("color", color)?,
            ],
            ConfigMessage::KnobType { bank, knob, mode } => vec![
                check("bank", bank, BANK_COUNT)?,
                check("knob", knob, KNOB_COUNT)?,
                mode.code(),
            ],
            ConfigMessage::KnobCcType { bank, knob, cc_type } => vec![
                check("bank", bank, BANK_COUNT)?,
                check("knob", knob, KNOB_COUNT)?,
                cc_type.code(),
            ],
            ConfigMessage::KnobMidiChannel {
                bank,
                knob,
                channel,
            } => {
                if !(1..=16).contains(&channel) {
                    return Err(ProtocolError::OutOfRange {
                        field: "channel",
                        value: channel,
                    });
                }
                vec![
                    check("bank", bank, BANK_COUNT)?,
                    check("knob", knob, KNOB_COUNT)?,
                    channel - 1,
                ]
            }
            ConfigMessage::KnobMidiCc1 { bank, knob, cc }
            | ConfigMessage::KnobMidiCc2 { bank, knob, cc } => vec![
                check("bank", bank, BANK_COUNT)?,
                check("knob", knob, KNOB_COUNT)?,
                check_data("cc", cc)?,
            ],
            ConfigMessage::BankColor { bank, color } => {
                vec![check("bank", bank, BANK_COUNT)?, check_data("color", color)?]
            }
            ConfigMessage::BankSnapshotColor {
                bank,
                snapshot,
                color,
            } => vec![
                check("bank", bank, BANK_COUNT)?,
                check_snapshot(snapshot)?,
                check_data("color", color)?,
            ],
            ConfigMessage::FirmwareUpload | ConfigMessage::Sync => Vec::new(),
        };
        Ok(bytes)
    }

    /// `[type, payload...]`, the message as carried after the SysEx address.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut bytes = vec![self.message_type() as u8];
        bytes.extend(self.payload()?);
        Ok(bytes)
    }

    /// Complete SysEx frame for `address`.
    pub fn to_frame(&self, address: &SysExAddress) -> Result<Vec<u8>, ProtocolError> {
        Ok(sysex::encode(address, self.message_type() as u8, &self.payload()?)?)
    }

    /// Rebuild a message from its type byte and payload.
    ///
    /// Bytes past the expected payload length are ignored.
    pub fn decode(type_code: u8, payload: &[u8]) -> Result<Self, DecodeError> {
        let message_type = MessageType::try_from(type_code)?;
        let expected = message_type.payload_len();
        if payload.len() < expected {
            return Err(DecodeError::Truncated {
                message_type,
                expected,
                actual: payload.len(),
            });
        }

        let bank = || decoded("bank", payload[0], BANK_COUNT);
        let knob = |at: usize| decoded("knob", payload[at], KNOB_COUNT);

        let message = match message_type {
            MessageType::Brightness => ConfigMessage::Brightness(payload[0]),
            MessageType::FirmwareVersion => ConfigMessage::FirmwareVersion {
                major: payload[0],
                minor: payload[1],
            },
            MessageType::KnobColor => ConfigMessage::KnobColor {
                bank: bank()?,
                snapshot: SnapshotTarget::from_wire(payload[1])?,
                knob: knob(2)?,
                color: payload[3],
            },
            MessageType::KnobType => ConfigMessage::KnobType {
                bank: bank()?,
                knob: knob(1)?,
                mode: DisplayMode::from_code(payload[2]).ok_or(DecodeError::OutOfRange {
                    field: "display mode",
                    value: payload[2],
                })?,
            },
            MessageType::KnobCcType => ConfigMessage::KnobCcType {
                bank: bank()?,
                knob: knob(1)?,
                cc_type: CcType::from_code(payload[2]).ok_or(DecodeError::OutOfRange {
                    field: "cc type",
                    value: payload[2],
                })?,
            },
            MessageType::KnobMidiChannel => ConfigMessage::KnobMidiChannel {
                bank: bank()?,
                knob: knob(1)?,
                channel: decoded("channel", payload[2], 16)? + 1,
            },
            MessageType::KnobMidiCc1 => ConfigMessage::KnobMidiCc1 {
                bank: bank()?,
                knob: knob(1)?,
                cc: payload[2],
            },
            MessageType::KnobMidiCc2 => ConfigMessage::KnobMidiCc2 {
                bank: bank()?,
                knob: knob(1)?,
                cc: payload[2],
            },
            MessageType::BankColor => ConfigMessage::BankColor {
                bank: bank()?,
                color: payload[1],
            },
            MessageType::BankSnapshotColor => ConfigMessage::BankSnapshotColor {
                bank: bank()?,
                snapshot: SnapshotTarget::from_wire(payload[1])?,
                color: payload[2],
            },
            MessageType::FirmwareUpload => ConfigMessage::FirmwareUpload,
            MessageType::Sync => ConfigMessage::Sync,
        };
        Ok(message)
    }
}
