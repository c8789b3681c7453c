// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! MIDI endpoint and serial port enumeration.
//!
//! Matching prefers the product name over USB ids: a port whose path,
//! manufacturer or product string contains one of the known names wins over
//! one that only carries the right vendor/product id.

use std::thread;
use std::time::Duration;

use midir::{MidiInput, MidiOutput};
use serialport::SerialPortType;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LinkError;

const CLIENT_NAME: &str = "timepod-ctl";

/// A MIDI port. The port name doubles as its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiEndpoint {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerialPortEntry {
    pub path: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

fn endpoint(name: String) -> MidiEndpoint {
    MidiEndpoint {
        id: name.clone(),
        name,
    }
}

pub fn list_inputs() -> Vec<MidiEndpoint> {
    let midi_in = match MidiInput::new(CLIENT_NAME) {
        Ok(m) => m,
        Err(e) => {
            warn!("MIDI input backend unavailable: {}", e);
            return Vec::new();
        }
    };
    midi_in
        .ports()
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .map(endpoint)
        .collect()
}

pub fn list_outputs() -> Vec<MidiEndpoint> {
    let midi_out = match MidiOutput::new(CLIENT_NAME) {
        Ok(m) => m,
        Err(e) => {
            warn!("MIDI output backend unavailable: {}", e);
            return Vec::new();
        }
    };
    midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .map(endpoint)
        .collect()
}

pub fn list_serial_ports() -> Vec<SerialPortEntry> {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            warn!("Cannot enumerate serial ports: {}", e);
            return Vec::new();
        }
    };
    ports
        .into_iter()
        .map(|info| match info.port_type {
            SerialPortType::UsbPort(usb) => SerialPortEntry {
                path: info.port_name,
                manufacturer: usb.manufacturer,
                product: usb.product,
                serial_number: usb.serial_number,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
            },
            _ => SerialPortEntry {
                path: info.port_name,
                ..Default::default()
            },
        })
        .collect()
}

/// Name and USB id heuristics for recognising the device.
#[derive(Debug, Clone)]
pub struct DeviceMatcher {
    pub names: Vec<String>,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceMatcher {
    pub fn from_config(config: &Config) -> Self {
        Self {
            names: config.product_names.clone(),
            vendor_id: config.usb_vendor_id,
            product_id: config.usb_product_id,
        }
    }

    fn matches_name(&self, text: Option<&str>) -> bool {
        text.is_some_and(|t| self.names.iter().any(|n| t.contains(n.as_str())))
    }

    /// First endpoint whose name contains a product name.
    pub fn primary_endpoint<'a>(&self, endpoints: &'a [MidiEndpoint]) -> Option<&'a MidiEndpoint> {
        endpoints.iter().find(|e| self.matches_name(Some(&e.name)))
    }

    /// Serial port of the device: name match first, then USB ids.
    pub fn serial_port<'a>(&self, ports: &'a [SerialPortEntry]) -> Option<&'a SerialPortEntry> {
        ports
            .iter()
            .find(|p| {
                self.matches_name(Some(&p.path))
                    || self.matches_name(p.manufacturer.as_deref())
                    || self.matches_name(p.product.as_deref())
            })
            .or_else(|| {
                ports
                    .iter()
                    .find(|p| p.vid == Some(self.vendor_id) && p.pid == Some(self.product_id))
            })
    }
}

/// Poll `list` until `matcher` selects a port.
pub fn wait_for_port<L, M>(
    attempts: u32,
    interval: Duration,
    mut list: L,
    mut matcher: M,
) -> Result<SerialPortEntry, LinkError>
where
    L: FnMut() -> Vec<SerialPortEntry>,
    M: FnMut(&[SerialPortEntry]) -> Option<SerialPortEntry>,
{
    for attempt in 1..=attempts {
        let ports = list();
        if let Some(port) = matcher(&ports) {
            debug!(attempt, path = %port.path, "device port found");
            return Ok(port);
        }
        debug!(attempt, seen = ports.len(), "device port not present yet");
        if attempt < attempts {
            thread::sleep(interval);
        }
    }
    Err(LinkError::DeviceNotFound { attempts })
}
