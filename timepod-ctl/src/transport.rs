// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial transport layer for bootloader communication.

use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::trace;

use timepod_common::avr109::{BAUD_RATE, HANDSHAKE_TIMEOUT};

use crate::error::LinkError;

/// Gap that ends a reply once its first byte has arrived.
const INTER_BYTE_TIMEOUT: Duration = Duration::from_millis(20);

/// Byte-level access to an AVR109 bootloader.
pub trait BootloaderPort {
    /// Write one command.
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Wait up to `timeout` for a reply. `Ok(None)` means the bootloader
    /// stayed silent.
    fn wait_response(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, LinkError>;

    fn pause(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// USB CDC serial connection to the bootloader, 57600 8N1, no flow control.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn open(path: &str) -> Result<Self, LinkError> {
        let port = serialport::new(path, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(HANDSHAKE_TIMEOUT)
            .open()
            .map_err(|source| LinkError::SerialOpen {
                path: path.to_string(),
                source,
            })?;
        Ok(Self { port })
    }

    /// Get the port name.
    pub fn port_name(&self) -> String {
        self.port.name().unwrap_or_else(|| "?".to_string())
    }

    fn drain_rx(&mut self) {
        let mut buf = [0u8; 64];
        let old_timeout = self.port.timeout();
        let _ = self.port.set_timeout(Duration::from_millis(10));
        while self.port.read(&mut buf).unwrap_or(0) > 0 {}
        let _ = self.port.set_timeout(old_timeout);
    }

    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl BootloaderPort for SerialTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        // Stale bytes from an earlier reply must not answer this command.
        self.drain_rx();
        trace!(len = bytes.len(), first = bytes.first().copied(), "serial tx");
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn wait_response(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, LinkError> {
        let mut buf = [0u8; 64];
        self.port.set_timeout(timeout).map_err(io_error)?;
        let n = self.read_some(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }

        let mut reply = buf[..n].to_vec();
        self.port.set_timeout(INTER_BYTE_TIMEOUT).map_err(io_error)?;
        loop {
            let n = self.read_some(&mut buf)?;
            if n == 0 {
                break;
            }
            reply.extend_from_slice(&buf[..n]);
        }
        trace!(reply = ?reply, "serial rx");
        Ok(Some(reply))
    }
}

fn io_error(e: serialport::Error) -> LinkError {
    LinkError::SerialIo(e.into())
}
