// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use timepod_common::{CcType, DisplayMode};

use crate::commands;
use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::session::Context;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "timepod-ctl")]
#[command(about = "Configuration and firmware update tool for the TP-001 MIDI controller")]
pub struct Cli {
    /// Settings file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// MIDI port name to use instead of auto-detection (input and output)
    #[arg(long, global = true)]
    pub midi: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// List MIDI endpoints and serial ports
    Ports,

    /// Request the full configuration and print it as TOML
    Sync,

    /// Print configuration messages sent by the device
    Monitor {
        /// Stop after this many seconds (runs until interrupted if omitted)
        #[arg(short, long)]
        seconds: Option<u64>,
    },

    /// Change one setting on the device
    Set {
        #[command(subcommand)]
        setting: Setting,
    },

    /// Download the latest firmware image
    Download {
        /// Firmware URL (defaults to the configured one)
        #[arg(long)]
        url: Option<String>,

        /// Output file
        #[arg(short, long, default_value = "timepod.bin")]
        output: PathBuf,
    },

    /// Flash a firmware image
    Flash {
        /// Firmware binary file (downloaded if omitted)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Firmware URL used when no file is given
        #[arg(long)]
        url: Option<String>,

        /// Bootloader serial port; skips the MIDI reboot step
        #[arg(short, long)]
        port: Option<String>,
    },
}

/// Settings accepted by `set`. Banks, knobs and snapshots are 0-based.
#[derive(Subcommand)]
pub enum Setting {
    /// LED brightness (0-127)
    Brightness { value: u8 },

    /// Knob colour for one snapshot (all snapshots in single-colour mode)
    KnobColor {
        bank: u8,
        knob: u8,
        color: u8,
        #[arg(short, long, default_value = "0")]
        snapshot: u8,
    },

    /// Use one colour for every snapshot of a knob
    SingleColor {
        bank: u8,
        knob: u8,
        /// Switch single-colour mode off instead
        #[arg(long)]
        off: bool,
    },

    /// Knob ring display mode
    KnobMode { bank: u8, knob: u8, mode: ModeArg },

    /// Controller type sent by a knob
    CcType { bank: u8, knob: u8, cc_type: CcTypeArg },

    /// MIDI channel (1-16)
    Channel { bank: u8, knob: u8, channel: u8 },

    /// Controller number
    Cc { bank: u8, knob: u8, cc: u8 },

    /// Second controller number (LSB / NRPN)
    CcLsb { bank: u8, knob: u8, cc: u8 },

    /// Bank colour
    BankColor { bank: u8, color: u8 },

    /// Snapshot button colour
    SnapshotColor { bank: u8, snapshot: u8, color: u8 },

    /// Use one colour for every snapshot button of a bank
    SingleSnapshotColor {
        bank: u8,
        #[arg(long)]
        off: bool,
    },

    /// Copy a knob's colours to other knobs in the same bank
    CopyKnob {
        bank: u8,
        source: u8,
        #[arg(required = true)]
        targets: Vec<u8>,
    },

    /// Copy a whole bank to other banks
    CopyBank {
        source: u8,
        #[arg(required = true)]
        targets: Vec<u8>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Fill,
    Bipolar,
    Pointer,
}

impl From<ModeArg> for DisplayMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Fill => DisplayMode::Fill,
            ModeArg::Bipolar => DisplayMode::Bipolar,
            ModeArg::Pointer => DisplayMode::Pointer,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CcTypeArg {
    #[value(name = "7bit")]
    Standard7,
    #[value(name = "14bit")]
    Standard14,
    Nrpn,
}

impl From<CcTypeArg> for CcType {
    fn from(c: CcTypeArg) -> Self {
        match c {
            CcTypeArg::Standard7 => CcType::Standard7,
            CcTypeArg::Standard14 => CcType::Standard14,
            CcTypeArg::Nrpn => CcType::Nrpn14,
        }
    }
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    let mut ctx = Context::new(config);
    let midi = cli.midi.as_deref();

    match cli.command {
        Commands::Ports => commands::ports(&ctx),
        Commands::Sync => commands::sync(&mut ctx, midi),
        Commands::Monitor { seconds } => commands::monitor(&mut ctx, midi, seconds),
        Commands::Set { setting } => commands::set(&mut ctx, midi, setting),
        Commands::Download { url, output } => commands::download(&ctx, url.as_deref(), &output),
        Commands::Flash { file, url, port } => {
            commands::flash(&mut ctx, midi, file.as_deref(), url.as_deref(), port.as_deref())
        }
    }
}
