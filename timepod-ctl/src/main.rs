// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Configuration and firmware update tool for the TP-001 via USB MIDI and
//! its AVR109 serial bootloader.
//!
//! Usage:
//!   timepod-ctl ports
//!   timepod-ctl sync
//!   timepod-ctl set knob-color 2 5 40
//!   timepod-ctl flash firmware.bin
//!   timepod-ctl --midi "TP-001" flash

mod bootloader;
mod cli;
mod commands;
mod config;
mod discovery;
mod error;
mod fetch;
mod midi;
mod session;
mod transport;
mod uploader;

use anyhow::Result;
use clap::Parser;
use tracing::Level;

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    cli::run(args)
}
