// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for SysEx framing.

use timepod_common::sysex::{decode, encode, EncodeError, SysExAddress, SYSEX_END, SYSEX_START};
use timepod_common::TIMEPOD_ADDRESS;

// =============================================================================
// Address derivation
// =============================================================================

#[test]
fn test_timepod_address_bytes() {
    assert_eq!(TIMEPOD_ADDRESS.manufacturer, [0x00, 0x04, 0x58]);
    assert_eq!(TIMEPOD_ADDRESS.device, [0x65, 0x14]);
}

#[test]
fn test_from_usb_ids_strips_top_bits() {
    let address = SysExAddress::from_usb_ids(0xFFFF, 0x8080);
    assert_eq!(address.manufacturer, [0x00, 0x7F, 0x7F]);
    assert_eq!(address.device, [0x00, 0x00]);
}

// =============================================================================
// encode
// =============================================================================

#[test]
fn test_encode_layout() {
    let frame = encode(&TIMEPOD_ADDRESS, 0x03, &[2, 8, 5, 40]).unwrap();
    assert_eq!(
        frame,
        vec![0xF0, 0x00, 0x04, 0x58, 0x65, 0x14, 0x03, 2, 8, 5, 40, 0xF7]
    );
}

#[test]
fn test_encode_empty_payload_is_minimal_frame() {
    let frame = encode(&TIMEPOD_ADDRESS, 0x7E, &[]).unwrap();
    assert_eq!(frame.len(), 8);
    assert_eq!(frame[0], SYSEX_START);
    assert_eq!(frame[7], SYSEX_END);
}

#[test]
fn test_encode_rejects_high_payload_byte() {
    let err = encode(&TIMEPOD_ADDRESS, 0x01, &[0x10, 0x80]).unwrap_err();
    assert_eq!(
        err,
        EncodeError::NotSevenBit {
            offset: 8,
            value: 0x80
        }
    );
}

#[test]
fn test_encode_rejects_high_type_byte() {
    assert!(encode(&TIMEPOD_ADDRESS, 0xF7, &[]).is_err());
}

#[test]
fn test_encode_rejects_unmasked_address() {
    let address = SysExAddress::new([0x00, 0x04, 0xD8], [0x65, 0x14]);
    assert!(matches!(
        encode(&address, 0x01, &[1]),
        Err(EncodeError::NotSevenBit { offset: 3, .. })
    ));
}

// =============================================================================
// decode
// =============================================================================

#[test]
fn test_decode_short_frames_are_ignored() {
    for len in 0..8 {
        let frame = vec![0u8; len];
        assert!(decode(&frame).is_none(), "len {}", len);
    }
    assert!(decode(&[0xF0, 0x00, 0x04, 0x58, 0x65, 0x14, 0xF7]).is_none());
}

#[test]
fn test_decode_requires_markers() {
    assert!(decode(&[0x90, 0x00, 0x04, 0x58, 0x65, 0x14, 0x01, 0xF7]).is_none());
    assert!(decode(&[0xF0, 0x00, 0x04, 0x58, 0x65, 0x14, 0x01, 0x00]).is_none());
}

#[test]
fn test_decode_splits_fields() {
    let frame = decode(&[0xF0, 0x00, 0x04, 0x58, 0x65, 0x14, 0x02, 1, 7, 0xF7]).unwrap();
    assert_eq!(frame.address, TIMEPOD_ADDRESS);
    assert_eq!(frame.message_type, 0x02);
    assert_eq!(frame.payload, vec![1, 7]);
}

#[test]
fn test_decode_minimal_frame_has_empty_payload() {
    let frame = decode(&[0xF0, 0x00, 0x04, 0x58, 0x65, 0x14, 0x7E, 0xF7]).unwrap();
    assert_eq!(frame.message_type, 0x7E);
    assert!(frame.payload.is_empty());
}

#[test]
fn test_round_trip_across_payload_sizes() {
    let addresses = [
        TIMEPOD_ADDRESS,
        SysExAddress::new([0x00, 0x20, 0x6B], [0x7F, 0x00]),
    ];
    for address in addresses {
        for len in [0usize, 1, 4, 37, 200] {
            let payload: Vec<u8> = (0..len).map(|i| (i * 31 % 128) as u8).collect();
            for message_type in [0x00u8, 0x03, 0x7F] {
                let frame = encode(&address, message_type, &payload).unwrap();
                let decoded = decode(&frame).unwrap();
                assert_eq!(decoded.address, address);
                assert_eq!(decoded.message_type, message_type);
                assert_eq!(decoded.payload, payload);
            }
        }
    }
}
