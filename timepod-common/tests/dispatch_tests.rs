// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for frame routing.

use std::sync::{Arc, Mutex};

use timepod_common::protocol::{ConfigMessage, MessageType};
use timepod_common::sysex::SysExAddress;
use timepod_common::{EventDispatcher, TIMEPOD_ADDRESS};

fn recorder() -> (Arc<Mutex<Vec<String>>>, EventDispatcher) {
    (Arc::new(Mutex::new(Vec::new())), EventDispatcher::new(TIMEPOD_ADDRESS))
}

fn brightness_frame(value: u8) -> Vec<u8> {
    ConfigMessage::Brightness(value).to_frame(&TIMEPOD_ADDRESS).unwrap()
}

#[test]
fn test_subscribers_run_in_registration_order() {
    let (log, mut dispatcher) = recorder();
    for name in ["first", "second", "third"] {
        let log = log.clone();
        dispatcher.subscribe(MessageType::Brightness, move |_| {
            log.lock().unwrap().push(name.to_string());
        });
    }

    assert_eq!(dispatcher.dispatch_frame(&brightness_frame(5)), 3);
    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn test_type_filter() {
    let (log, mut dispatcher) = recorder();
    let l = log.clone();
    dispatcher.subscribe(MessageType::BankColor, move |_| {
        l.lock().unwrap().push("bank".into());
    });
    let l = log.clone();
    dispatcher.subscribe_all(move |m| {
        l.lock().unwrap().push(format!("{:?}", m.message_type()));
    });

    assert_eq!(dispatcher.dispatch_frame(&brightness_frame(5)), 1);
    assert_eq!(*log.lock().unwrap(), vec!["Brightness"]);
}

#[test]
fn test_handler_receives_decoded_message() {
    let (_, mut dispatcher) = recorder();
    let seen = Arc::new(Mutex::new(None));
    let s = seen.clone();
    dispatcher.subscribe(MessageType::FirmwareVersion, move |m| {
        *s.lock().unwrap() = Some(m.clone());
    });

    let frame = [0xF0, 0x00, 0x04, 0x58, 0x65, 0x14, 0x02, 1, 7, 0xF7];
    dispatcher.dispatch_frame(&frame);

    assert_eq!(
        *seen.lock().unwrap(),
        Some(ConfigMessage::FirmwareVersion { major: 1, minor: 7 })
    );
}

#[test]
fn test_unsubscribe() {
    let (log, mut dispatcher) = recorder();
    let l = log.clone();
    let id = dispatcher.subscribe_all(move |_| l.lock().unwrap().push("x".into()));

    assert!(dispatcher.unsubscribe(id));
    assert!(!dispatcher.unsubscribe(id));
    assert_eq!(dispatcher.dispatch_frame(&brightness_frame(1)), 0);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_foreign_address_is_dropped() {
    let (_, mut dispatcher) = recorder();
    dispatcher.subscribe_all(|_| panic!("foreign frame delivered"));

    let other = SysExAddress::new([0x00, 0x20, 0x6B], [0x01, 0x02]);
    let frame = ConfigMessage::Brightness(1).to_frame(&other).unwrap();
    assert_eq!(dispatcher.dispatch_frame(&frame), 0);
}

#[test]
fn test_malformed_frames_are_dropped() {
    let (_, mut dispatcher) = recorder();
    dispatcher.subscribe_all(|_| panic!("malformed frame delivered"));

    // Too short, note-on, unknown type, truncated KNOB_COLOR.
    let frames: [&[u8]; 4] = [
        &[0xF0, 0x7E, 0xF7],
        &[0x90, 0x40, 0x7F],
        &[0xF0, 0x00, 0x04, 0x58, 0x65, 0x14, 0x55, 0x00, 0xF7],
        &[0xF0, 0x00, 0x04, 0x58, 0x65, 0x14, 0x03, 0x01, 0x02, 0xF7],
    ];
    for frame in frames {
        assert_eq!(dispatcher.dispatch_frame(frame), 0);
    }
}

#[test]
fn test_dispatch_without_subscribers() {
    let (_, mut dispatcher) = recorder();
    assert_eq!(dispatcher.dispatch(&ConfigMessage::Sync), 0);
    assert_eq!(dispatcher.address(), TIMEPOD_ADDRESS);
}
