// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the configuration message catalogue.

use timepod_common::protocol::{
    CcType, ConfigMessage, DecodeError, DisplayMode, MessageType, ProtocolError, SnapshotTarget,
    ALL_SNAPSHOTS,
};
use timepod_common::sysex;
use timepod_common::TIMEPOD_ADDRESS;

// --- Message type codes ---

#[test]
fn test_message_type_codes() {
    assert_eq!(MessageType::Brightness as u8, 0x01);
    assert_eq!(MessageType::KnobColor as u8, 0x03);
    assert_eq!(MessageType::BankSnapshotColor as u8, 0x0A);
    assert_eq!(MessageType::FirmwareUpload as u8, 125);
    assert_eq!(MessageType::Sync as u8, 0x7E);
}

#[test]
fn test_message_type_try_from_round_trips() {
    for t in MessageType::ALL {
        assert_eq!(MessageType::try_from(t as u8), Ok(t));
    }
}

#[test]
fn test_message_type_unknown_code() {
    assert_eq!(MessageType::try_from(0x55), Err(DecodeError::UnknownType(0x55)));
}

#[test]
fn test_message_type_codes_are_seven_bit() {
    assert!(MessageType::ALL.iter().all(|t| (*t as u8) <= 0x7F));
}

// --- Encoding ---

#[test]
fn test_knob_color_all_snapshots_wire_bytes() {
    let message = ConfigMessage::KnobColor {
        bank: 2,
        snapshot: SnapshotTarget::All,
        knob: 5,
        color: 40,
    };
    assert_eq!(
        message.to_bytes().unwrap(),
        vec![MessageType::KnobColor as u8, 2, 8, 5, 40]
    );
}

#[test]
fn test_knob_midi_channel_is_zero_based_on_wire() {
    let message = ConfigMessage::KnobMidiChannel {
        bank: 0,
        knob: 3,
        channel: 16,
    };
    assert_eq!(message.payload().unwrap(), vec![0, 3, 15]);
}

#[test]
fn test_enum_codes_on_wire() {
    let mode = ConfigMessage::KnobType {
        bank: 1,
        knob: 1,
        mode: DisplayMode::Pointer,
    };
    let cc_type = ConfigMessage::KnobCcType {
        bank: 1,
        knob: 1,
        cc_type: CcType::Nrpn14,
    };
    assert_eq!(mode.payload().unwrap(), vec![1, 1, 2]);
    assert_eq!(cc_type.payload().unwrap(), vec![1, 1, 2]);
}

#[test]
fn test_sync_has_empty_payload() {
    assert_eq!(ConfigMessage::Sync.to_bytes().unwrap(), vec![0x7E]);
}

#[test]
fn test_encode_rejects_bank_out_of_range() {
    let message = ConfigMessage::BankColor { bank: 8, color: 1 };
    assert_eq!(
        message.payload(),
        Err(ProtocolError::OutOfRange {
            field: "bank",
            value: 8
        })
    );
}

#[test]
fn test_encode_rejects_snapshot_index_eight_as_single() {
    let message = ConfigMessage::BankSnapshotColor {
        bank: 0,
        snapshot: SnapshotTarget::One(8),
        color: 1,
    };
    assert!(message.payload().is_err());
}

#[test]
fn test_encode_rejects_channel_zero() {
    let message = ConfigMessage::KnobMidiChannel {
        bank: 0,
        knob: 0,
        channel: 0,
    };
    assert!(message.payload().is_err());
}

#[test]
fn test_encode_rejects_eight_bit_values() {
    assert!(ConfigMessage::Brightness(200).payload().is_err());
    let cc = ConfigMessage::KnobMidiCc1 {
        bank: 0,
        knob: 0,
        cc: 128,
    };
    assert!(cc.payload().is_err());
}

#[test]
fn test_to_frame_wraps_in_sysex() {
    let frame = ConfigMessage::Brightness(64).to_frame(&TIMEPOD_ADDRESS).unwrap();
    assert_eq!(frame, vec![0xF0, 0x00, 0x04, 0x58, 0x65, 0x14, 0x01, 64, 0xF7]);
}

// --- Decoding ---

#[test]
fn test_decode_knob_color_all_snapshots() {
    let message = ConfigMessage::decode(0x03, &[1, ALL_SNAPSHOTS, 4, 12]).unwrap();
    assert_eq!(
        message,
        ConfigMessage::KnobColor {
            bank: 1,
            snapshot: SnapshotTarget::All,
            knob: 4,
            color: 12
        }
    );
}

#[test]
fn test_decode_knob_color_single_snapshot() {
    for snapshot in 0..8u8 {
        let message = ConfigMessage::decode(0x03, &[1, snapshot, 4, 12]).unwrap();
        assert!(matches!(
            message,
            ConfigMessage::KnobColor {
                snapshot: SnapshotTarget::One(s),
                ..
            } if s == snapshot
        ));
    }
}

#[test]
fn test_decode_firmware_version() {
    assert_eq!(
        ConfigMessage::decode(0x02, &[1, 4]).unwrap(),
        ConfigMessage::FirmwareVersion { major: 1, minor: 4 }
    );
}

#[test]
fn test_decode_channel_adds_one() {
    assert_eq!(
        ConfigMessage::decode(0x06, &[0, 0, 0]).unwrap(),
        ConfigMessage::KnobMidiChannel {
            bank: 0,
            knob: 0,
            channel: 1
        }
    );
}

#[test]
fn test_decode_truncated_payload() {
    assert_eq!(
        ConfigMessage::decode(0x03, &[1, 2, 3]),
        Err(DecodeError::Truncated {
            message_type: MessageType::KnobColor,
            expected: 4,
            actual: 3
        })
    );
}

#[test]
fn test_decode_ignores_trailing_bytes() {
    assert_eq!(
        ConfigMessage::decode(0x01, &[10, 99, 99]).unwrap(),
        ConfigMessage::Brightness(10)
    );
}

#[test]
fn test_decode_rejects_bad_indexes() {
    assert!(matches!(
        ConfigMessage::decode(0x09, &[8, 1]),
        Err(DecodeError::OutOfRange { field: "bank", .. })
    ));
    assert!(matches!(
        ConfigMessage::decode(0x04, &[0, 16, 0]),
        Err(DecodeError::OutOfRange { field: "knob", .. })
    ));
    assert!(matches!(
        ConfigMessage::decode(0x0A, &[0, 9, 0]),
        Err(DecodeError::OutOfRange { field: "snapshot", .. })
    ));
    assert!(matches!(
        ConfigMessage::decode(0x04, &[0, 0, 3]),
        Err(DecodeError::OutOfRange { .. })
    ));
}

#[test]
fn test_decode_unknown_type() {
    assert_eq!(
        ConfigMessage::decode(0x42, &[]),
        Err(DecodeError::UnknownType(0x42))
    );
}

#[test]
fn test_every_message_survives_the_wire() {
    let messages = [
        ConfigMessage::Brightness(127),
        ConfigMessage::FirmwareVersion { major: 0, minor: 2 },
        ConfigMessage::KnobColor {
            bank: 7,
            snapshot: SnapshotTarget::One(7),
            knob: 15,
            color: 63,
        },
        ConfigMessage::KnobType {
            bank: 3,
            knob: 9,
            mode: DisplayMode::Bipolar,
        },
        ConfigMessage::KnobCcType {
            bank: 3,
            knob: 9,
            cc_type: CcType::Standard14,
        },
        ConfigMessage::KnobMidiChannel {
            bank: 0,
            knob: 0,
            channel: 10,
        },
        ConfigMessage::KnobMidiCc1 {
            bank: 4,
            knob: 2,
            cc: 74,
        },
        ConfigMessage::KnobMidiCc2 {
            bank: 4,
            knob: 2,
            cc: 106,
        },
        ConfigMessage::BankColor { bank: 6, color: 20 },
        ConfigMessage::BankSnapshotColor {
            bank: 6,
            snapshot: SnapshotTarget::All,
            color: 33,
        },
        ConfigMessage::FirmwareUpload,
        ConfigMessage::Sync,
    ];

    for message in messages {
        let frame = message.to_frame(&TIMEPOD_ADDRESS).unwrap();
        let decoded = sysex::decode(&frame).unwrap();
        assert_eq!(
            ConfigMessage::decode(decoded.message_type, &decoded.payload),
            Ok(message)
        );
    }
}
