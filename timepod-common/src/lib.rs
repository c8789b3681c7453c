// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common types and protocol logic for the TP-001 controller.
//!
//! Nothing in this crate touches a port: it encodes and decodes bytes and
//! runs state machines, so host tools can drive it over any transport.
//! - `sysex` / `protocol`: configuration messages on the MIDI wire
//! - `state`: device configuration mirror and user intents
//! - `dispatch`: routing of received frames to subscribers
//! - `avr109` / `upload_fsm`: serial bootloader command set and upload FSM

pub mod avr109;
pub mod dispatch;
pub mod protocol;
pub mod state;
pub mod sysex;
pub mod upload_fsm;

pub use dispatch::{EventDispatcher, SubscriptionId};
pub use protocol::{CcType, ConfigMessage, DisplayMode, MessageType, SnapshotTarget};
pub use state::DeviceState;
pub use sysex::SysExAddress;
pub use upload_fsm::{UploadAction, UploadEvent, UploadSession, UploadState};

/// USB vendor id of the TP-001 (also its SysEx manufacturer code).
pub const USB_VENDOR_ID: u16 = 0x04D8;
/// USB product id of the TP-001 (also its SysEx device code).
pub const USB_PRODUCT_ID: u16 = 0xE514;

/// SysEx prefix used by the TP-001: `00 04 58` / `65 14`.
pub const TIMEPOD_ADDRESS: SysExAddress = SysExAddress::from_usb_ids(USB_VENDOR_ID, USB_PRODUCT_ID);

/// Port/product names the device announces itself with.
pub const PRODUCT_NAMES: [&str; 2] = ["TP-001", "Modern MIDI"];
