// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! AVR109 bootloader command set.
//!
//! Single ASCII command bytes, some followed by arguments. Addresses are
//! sent as word addresses, big-endian.

use std::time::Duration;

// --- Serial line settings ---

pub const BAUD_RATE: u32 = 57_600;

// --- Flash geometry (AT90USB1286) ---

pub const DEFAULT_PAGE_SIZE: usize = 128;

// --- Command bytes ---

pub const CMD_ERASE_FLASH: u8 = b'e';
pub const CMD_READ_BOOTLOADER_ID: u8 = b'S';
pub const CMD_READ_PART_CODE: u8 = b't';
pub const CMD_ENTER_PROGRAMMING: u8 = b'P';
pub const CMD_SET_ADDRESS: u8 = b'A';
pub const CMD_BLOCK_WRITE: u8 = b'B';
pub const CMD_EXIT_BOOTLOADER: u8 = b'E';

/// Memory type tag for block writes to flash.
pub const MEMORY_FLASH: u8 = b'F';

// --- Timing ---

pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(1000);
pub const PAGE_WRITE_TIMEOUT: Duration = Duration::from_millis(2000);
pub const ERASE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Pause after opening the port before the first command.
pub const PORT_SETTLE_DELAY: Duration = Duration::from_millis(500);
/// Pause before the exit command so the last page write completes.
pub const EXIT_DELAY: Duration = Duration::from_millis(200);

/// Resends allowed per step before it is abandoned.
pub const MAX_RETRIES: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ReadBootloaderId,
    ReadPartCode,
    EnterProgramming,
    EraseFlash,
    /// Byte address; the wire carries `byte_address / 2`.
    SetAddress { byte_address: u32 },
    BlockWrite { data: Vec<u8> },
    ExitBootloader,
}

impl Command {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::ReadBootloaderId => vec![CMD_READ_BOOTLOADER_ID],
            Command::ReadPartCode => vec![CMD_READ_PART_CODE],
            Command::EnterProgramming => vec![CMD_ENTER_PROGRAMMING],
            Command::EraseFlash => vec![CMD_ERASE_FLASH],
            Command::SetAddress { byte_address } => vec![
                CMD_SET_ADDRESS,
                ((byte_address >> 9) & 0xFF) as u8,
                ((byte_address >> 1) & 0xFF) as u8,
            ],
            Command::BlockWrite { data } => {
                let len = data.len();
                let mut out = Vec::with_capacity(4 + len);
                out.push(CMD_BLOCK_WRITE);
                out.push(((len >> 8) & 0xFF) as u8);
                out.push((len & 0xFF) as u8);
                out.push(MEMORY_FLASH);
                out.extend_from_slice(data);
                out
            }
            Command::ExitBootloader => vec![CMD_EXIT_BOOTLOADER],
        }
    }

    /// How long to wait for the bootloader to answer this command.
    pub fn timeout(&self) -> Duration {
        match self {
            Command::EraseFlash => ERASE_TIMEOUT,
            Command::BlockWrite { .. } => PAGE_WRITE_TIMEOUT,
            _ => HANDSHAKE_TIMEOUT,
        }
    }
}
