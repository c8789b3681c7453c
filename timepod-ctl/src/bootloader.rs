// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Reboot the controller into its serial bootloader.

use std::thread;
use std::time::Duration;

use tracing::info;

use timepod_common::{ConfigMessage, SysExAddress};

use crate::error::LinkError;
use crate::midi::SysExSink;

/// Send the firmware-upload command and give the device `settle` to
/// re-enumerate as a serial port.
pub fn enter_bootloader<S: SysExSink>(
    sink: &mut S,
    address: &SysExAddress,
    settle: Duration,
) -> Result<(), LinkError> {
    let frame = ConfigMessage::FirmwareUpload.to_frame(address)?;
    sink.send_sysex(&frame)?;
    info!("bootloader requested, waiting {:?}", settle);
    thread::sleep(settle);
    Ok(())
}
