// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{bail, Context as _, Result};
use crc::{Crc, CRC_32_ISO_HDLC};
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::Setting;
use crate::discovery;
use crate::session::Context;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// How long the device may stay quiet before a sync is considered done.
const SYNC_QUIET: Duration = Duration::from_millis(300);
const SYNC_LIMIT: Duration = Duration::from_secs(5);

const PROGRESS_STEPS: u64 = 1000;

fn progress_bar(label: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(PROGRESS_STEPS);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}%")?
            .progress_chars("#>-"),
    );
    pb.set_message(label);
    Ok(pb)
}

fn set_fraction(pb: &ProgressBar, fraction: f32) {
    pb.set_position((fraction.clamp(0.0, 1.0) * PROGRESS_STEPS as f32) as u64);
}

/// Select the device's MIDI ports, by explicit name or by auto-detection.
fn connect(ctx: &mut Context, midi: Option<&str>) -> Result<String> {
    match midi {
        Some(name) => {
            ctx.midi
                .select_output(name)
                .with_context(|| format!("Cannot open MIDI output '{}'", name))?;
            ctx.midi
                .select_input(name)
                .with_context(|| format!("Cannot open MIDI input '{}'", name))?;
            Ok(name.to_string())
        }
        None => {
            let output = ctx
                .connect_primary()
                .context("No TP-001 found (use --midi to pick a port, see `ports`)")?;
            Ok(output.id)
        }
    }
}

/// List MIDI endpoints and serial ports, marking the ones that look like the device.
pub fn ports(ctx: &Context) -> Result<()> {
    let matcher = ctx.matcher();

    let outputs = discovery::list_outputs();
    let primary_out = matcher.primary_endpoint(&outputs).map(|e| e.id.clone());
    println!("MIDI outputs:");
    for e in &outputs {
        let mark = if Some(&e.id) == primary_out.as_ref() { "*" } else { " " };
        println!("  {} {}", mark, e.name);
    }

    let inputs = discovery::list_inputs();
    let primary_in = matcher.primary_endpoint(&inputs).map(|e| e.id.clone());
    println!("MIDI inputs:");
    for e in &inputs {
        let mark = if Some(&e.id) == primary_in.as_ref() { "*" } else { " " };
        println!("  {} {}", mark, e.name);
    }

    let serial = discovery::list_serial_ports();
    let device_port = matcher.serial_port(&serial).map(|p| p.path.clone());
    println!("Serial ports:");
    for p in &serial {
        let mark = if Some(&p.path) == device_port.as_ref() { "*" } else { " " };
        let ids = match (p.vid, p.pid) {
            (Some(vid), Some(pid)) => format!(" [{:04X}:{:04X}]", vid, pid),
            _ => String::new(),
        };
        let product = p.product.as_deref().unwrap_or("");
        let serial_number = p
            .serial_number
            .as_deref()
            .map(|s| format!(" (S/N {})", s))
            .unwrap_or_default();
        println!("  {} {}{} {}{}", mark, p.path, ids, product, serial_number);
    }

    if outputs.is_empty() && inputs.is_empty() && serial.is_empty() {
        println!("No devices found.");
    }
    Ok(())
}

/// Request the full configuration and print it.
pub fn sync(ctx: &mut Context, midi: Option<&str>) -> Result<()> {
    let port = connect(ctx, midi)?;
    eprintln!("Syncing with {}...", port);

    let state = ctx.sync(SYNC_QUIET, SYNC_LIMIT)?;
    match &state.firmware_version {
        Some(v) => eprintln!("Firmware version {}.{}", v.major, v.minor),
        None => eprintln!("Device did not report a firmware version"),
    }
    println!("{}", toml::to_string_pretty(&state)?);
    Ok(())
}

/// Print every configuration message the device sends.
pub fn monitor(ctx: &mut Context, midi: Option<&str>, seconds: Option<u64>) -> Result<()> {
    let port = connect(ctx, midi)?;
    if ctx.midi.input_id().is_none() {
        bail!("No MIDI input selected on {}", port);
    }
    let (_id, events) = ctx.midi.event_channel();
    println!("Listening on {} (Ctrl-C to stop)", port);

    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs(s));
    loop {
        let wait = match deadline {
            Some(d) => match d.checked_duration_since(Instant::now()) {
                Some(left) => left,
                None => break,
            },
            None => Duration::from_secs(3600),
        };
        if let Ok(message) = events.recv_timeout(wait) {
            println!("{:?}", message);
        }
    }
    Ok(())
}

/// Change one setting.
pub fn set(ctx: &mut Context, midi: Option<&str>, setting: Setting) -> Result<()> {
    connect(ctx, midi)?;
    // Intents depend on the current single-colour flags.
    ctx.sync(SYNC_QUIET, SYNC_LIMIT)?;

    let sent = match setting {
        Setting::Brightness { value } => ctx.apply_intent(|s| Ok(s.set_brightness(value)))?,
        Setting::KnobColor {
            bank,
            knob,
            color,
            snapshot,
        } => ctx.apply_intent(|s| s.set_knob_color(bank, knob, snapshot, color))?,
        Setting::SingleColor { bank, knob, off } => {
            ctx.apply_intent(|s| s.set_knob_single_color(bank, knob, !off))?
        }
        Setting::KnobMode { bank, knob, mode } => {
            ctx.apply_intent(|s| s.set_display_mode(bank, knob, mode.into()))?
        }
        Setting::CcType { bank, knob, cc_type } => {
            ctx.apply_intent(|s| s.set_cc_type(bank, knob, cc_type.into()))?
        }
        Setting::Channel {
            bank,
            knob,
            channel,
        } => ctx.apply_intent(|s| s.set_channel(bank, knob, channel))?,
        Setting::Cc { bank, knob, cc } => ctx.apply_intent(|s| s.set_cc(bank, knob, cc))?,
        Setting::CcLsb { bank, knob, cc } => ctx.apply_intent(|s| s.set_cc_lsb(bank, knob, cc))?,
        Setting::BankColor { bank, color } => ctx.apply_intent(|s| s.set_bank_color(bank, color))?,
        Setting::SnapshotColor {
            bank,
            snapshot,
            color,
        } => ctx.apply_intent(|s| s.set_snapshot_color(bank, snapshot, color))?,
        Setting::SingleSnapshotColor { bank, off } => {
            ctx.apply_intent(|s| s.set_single_snapshot_color(bank, !off))?
        }
        Setting::CopyKnob {
            bank,
            source,
            targets,
        } => ctx.apply_intent(|s| s.copy_knob_colors(bank, source, &targets))?,
        Setting::CopyBank { source, targets } => {
            ctx.apply_intent(|s| s.copy_bank(source, &targets))?
        }
    };

    println!("Sent {} message(s).", sent);
    Ok(())
}

fn fetch_image(ctx: &Context, url: Option<&str>) -> Result<Vec<u8>> {
    let pb = progress_bar("download")?;
    let image = ctx
        .download_firmware(url, |p| set_fraction(&pb, p))
        .context("Firmware download failed")?;
    pb.finish();
    Ok(image)
}

/// Download the firmware image to a file.
pub fn download(ctx: &Context, url: Option<&str>, output: &Path) -> Result<()> {
    let image = fetch_image(ctx, url)?;
    fs::write(output, &image).with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Saved {} ({} bytes, CRC32: 0x{:08x})",
        output.display(),
        image.len(),
        CRC32.checksum(&image)
    );
    Ok(())
}

/// Flash a firmware image from a file or the download URL.
pub fn flash(
    ctx: &mut Context,
    midi: Option<&str>,
    file: Option<&Path>,
    url: Option<&str>,
    port: Option<&str>,
) -> Result<()> {
    let (image, source) = match file {
        Some(path) => (
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?,
            path.display().to_string(),
        ),
        None => {
            let url = url.unwrap_or(&ctx.config.firmware_url).to_string();
            (fetch_image(ctx, Some(&url))?, url)
        }
    };
    if image.is_empty() {
        bail!("Firmware image {} is empty", source);
    }

    println!(
        "Firmware: {} ({} bytes, CRC32: 0x{:08x})",
        source,
        image.len(),
        CRC32.checksum(&image)
    );

    let pb = progress_bar("flash")?;
    let result = match port {
        Some(path) => {
            println!("Target:   {} (bootloader)", path);
            ctx.upload_to_port(path, &image, |p| set_fraction(&pb, p))
        }
        None => {
            let output = connect(ctx, midi)?;
            println!("Target:   {} (rebooting into bootloader)", output);
            ctx.upload_firmware(&output, &image, |p| set_fraction(&pb, p))
        }
    };

    match result {
        Ok(()) => {
            pb.finish_with_message("done");
            println!();
            println!("Firmware uploaded successfully!");
            Ok(())
        }
        Err(e) => {
            pb.abandon();
            Err(e).context("Firmware upload failed")
        }
    }
}
