// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! In-memory mirror of the device configuration.
//!
//! The mirror changes in two ways only: [`DeviceState::apply`] for messages
//! the device sent, and the `set_*`/`copy_*` intents for user edits. Intents
//! return the messages that must be echoed to the device and then run the
//! same reconciliation as `apply`, so the derived "single colour" flags agree
//! on both ends of the wire.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::{
    CcType, ConfigMessage, DisplayMode, SnapshotTarget, BANK_COUNT, KNOB_COUNT, MAX_DATA_VALUE,
    SNAPSHOT_COUNT,
};

pub const DEFAULT_COLOR: u8 = 51;
pub const DEFAULT_BRIGHTNESS: u8 = 100;
pub const DEFAULT_CC_LSB: u8 = 32;

/// Offset between a 14-bit controller's MSB and LSB numbers.
pub const CC_LSB_OFFSET: u8 = 32;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IntentError {
    #[error("{field} index {value} out of range")]
    OutOfRange { field: &'static str, value: u8 },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnobState {
    pub color_indices: [u8; SNAPSHOT_COUNT],
    pub use_single_color: bool,
    pub channel: u8,
    pub cc: u8,
    pub cc_lsb: u8,
    pub cc_type: CcType,
    pub display_mode: DisplayMode,
}

impl Default for KnobState {
    fn default() -> Self {
        Self {
            color_indices: [DEFAULT_COLOR; SNAPSHOT_COUNT],
            use_single_color: true,
            channel: 1,
            cc: 0,
            cc_lsb: DEFAULT_CC_LSB,
            cc_type: CcType::Standard7,
            display_mode: DisplayMode::Fill,
        }
    }
}

impl KnobState {
    fn apply_color(&mut self, snapshot: SnapshotTarget, color: u8) {
        match snapshot {
            SnapshotTarget::All => {
                self.color_indices = [color; SNAPSHOT_COUNT];
                self.use_single_color = true;
            }
            SnapshotTarget::One(index) => {
                self.color_indices[index as usize] = color;
                self.use_single_color = all_equal(&self.color_indices);
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotState {
    pub color_index: u8,
}

impl Default for SnapshotState {
    fn default() -> Self {
        Self {
            color_index: DEFAULT_COLOR,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BankState {
    pub knobs: [KnobState; KNOB_COUNT],
    pub snapshots: [SnapshotState; SNAPSHOT_COUNT],
    pub bank_color: u8,
    pub use_single_snapshot_color: bool,
}

impl Default for BankState {
    fn default() -> Self {
        Self {
            knobs: [KnobState::default(); KNOB_COUNT],
            snapshots: [SnapshotState::default(); SNAPSHOT_COUNT],
            bank_color: DEFAULT_COLOR,
            use_single_snapshot_color: false,
        }
    }
}

impl BankState {
    fn apply_snapshot_color(&mut self, snapshot: SnapshotTarget, color: u8) {
        match snapshot {
            SnapshotTarget::All => {
                self.snapshots.iter_mut().for_each(|s| s.color_index = color);
                self.use_single_snapshot_color = true;
            }
            SnapshotTarget::One(index) => {
                // The bank flag is explicit; a per-slot write always clears it.
                self.snapshots[index as usize].color_index = color;
                self.use_single_snapshot_color = false;
            }
        }
    }

    /// Every message needed to reproduce this bank's settings at `target`.
    fn messages_for(&self, target: u8) -> Vec<ConfigMessage> {
        let mut out = vec![ConfigMessage::BankColor {
            bank: target,
            color: self.bank_color,
        }];

        for (index, knob) in self.knobs.iter().enumerate() {
            let knob_index = index as u8;
            out.extend(knob_color_messages(target, knob_index, knob));
            out.push(ConfigMessage::KnobMidiChannel {
                bank: target,
                knob: knob_index,
                channel: knob.channel,
            });
            out.push(ConfigMessage::KnobMidiCc1 {
                bank: target,
                knob: knob_index,
                cc: knob.cc,
            });
            if knob.cc_type != CcType::Standard7 {
                out.push(ConfigMessage::KnobMidiCc2 {
                    bank: target,
                    knob: knob_index,
                    cc: knob.cc_lsb,
                });
            }
            out.push(ConfigMessage::KnobCcType {
                bank: target,
                knob: knob_index,
                cc_type: knob.cc_type,
            });
            out.push(ConfigMessage::KnobType {
                bank: target,
                knob: knob_index,
                mode: knob.display_mode,
            });
        }

        if self.use_single_snapshot_color {
            out.push(ConfigMessage::BankSnapshotColor {
                bank: target,
                snapshot: SnapshotTarget::All,
                color: self.snapshots[0].color_index,
            });
        } else {
            out.extend(self.snapshots.iter().enumerate().map(|(i, s)| {
                ConfigMessage::BankSnapshotColor {
                    bank: target,
                    snapshot: SnapshotTarget::One(i as u8),
                    color: s.color_index,
                }
            }));
        }
        out
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub brightness: u8,
    pub firmware_version: Option<FirmwareVersion>,
    pub banks: [BankState; BANK_COUNT],
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            brightness: DEFAULT_BRIGHTNESS,
            firmware_version: None,
            banks: Default::default(),
        }
    }
}

fn in_range(snapshot: SnapshotTarget) -> bool {
    !matches!(snapshot, SnapshotTarget::One(i) if i as usize >= SNAPSHOT_COUNT)
}

fn all_equal(values: &[u8]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

fn lsb_for(cc: u8) -> u8 {
    cc.saturating_add(CC_LSB_OFFSET).min(MAX_DATA_VALUE)
}

fn knob_color_messages(bank: u8, knob: u8, state: &KnobState) -> Vec<ConfigMessage> {
    if state.use_single_color {
        vec![ConfigMessage::KnobColor {
            bank,
            snapshot: SnapshotTarget::All,
            knob,
            color: state.color_indices[0],
        }]
    } else {
        state
            .color_indices
            .iter()
            .enumerate()
            .map(|(i, &color)| ConfigMessage::KnobColor {
                bank,
                snapshot: SnapshotTarget::One(i as u8),
                knob,
                color,
            })
            .collect()
    }
}

fn index(field: &'static str, value: u8, limit: usize) -> Result<usize, IntentError> {
    if (value as usize) < limit {
        Ok(value as usize)
    } else {
        Err(IntentError::OutOfRange { field, value })
    }
}

impl DeviceState {
    pub fn bank(&self, bank: u8) -> Option<&BankState> {
        self.banks.get(bank as usize)
    }

    pub fn knob(&self, bank: u8, knob: u8) -> Option<&KnobState> {
        self.bank(bank)?.knobs.get(knob as usize)
    }

    fn knob_mut(&mut self, bank: u8, knob: u8) -> Result<&mut KnobState, IntentError> {
        let b = index("bank", bank, BANK_COUNT)?;
        let k = index("knob", knob, KNOB_COUNT)?;
        Ok(&mut self.banks[b].knobs[k])
    }

    /// Reconcile a message received from the device.
    ///
    /// Messages are expected to come out of [`ConfigMessage::decode`], which
    /// already bounds every index. Returns `false` if nothing changed.
    pub fn apply(&mut self, message: &ConfigMessage) -> bool {
        let before = self.clone();
        match *message {
            ConfigMessage::Brightness(value) => self.brightness = value,
            ConfigMessage::FirmwareVersion { major, minor } => {
                self.firmware_version = Some(FirmwareVersion { major, minor })
            }
            ConfigMessage::KnobColor {
                bank,
                snapshot,
                knob,
                color,
            } => {
                if !in_range(snapshot) {
                    return false;
                }
                if let Ok(state) = self.knob_mut(bank, knob) {
                    state.apply_color(snapshot, color);
                }
            }
            ConfigMessage::KnobType { bank, knob, mode } => {
                if let Ok(state) = self.knob_mut(bank, knob) {
                    state.display_mode = mode;
                }
            }
            ConfigMessage::KnobCcType { bank, knob, cc_type } => {
                if let Ok(state) = self.knob_mut(bank, knob) {
                    state.cc_type = cc_type;
                }
            }
            ConfigMessage::KnobMidiChannel {
                bank,
                knob,
                channel,
            } => {
                if let Ok(state) = self.knob_mut(bank, knob) {
                    state.channel = channel;
                }
            }
            ConfigMessage::KnobMidiCc1 { bank, knob, cc } => {
                if let Ok(state) = self.knob_mut(bank, knob) {
                    state.cc = cc;
                }
            }
            ConfigMessage::KnobMidiCc2 { bank, knob, cc } => {
                if let Ok(state) = self.knob_mut(bank, knob) {
                    state.cc_lsb = cc;
                }
            }
            ConfigMessage::BankColor { bank, color } => {
                if let Some(state) = self.banks.get_mut(bank as usize) {
                    state.bank_color = color;
                }
            }
            ConfigMessage::BankSnapshotColor {
                bank,
                snapshot,
                color,
            } => {
                if !in_range(snapshot) {
                    return false;
                }
                if let Some(state) = self.banks.get_mut(bank as usize) {
                    state.apply_snapshot_color(snapshot, color);
                }
            }
            ConfigMessage::FirmwareUpload | ConfigMessage::Sync => {}
        }
        *self != before
    }

    /// Apply locally produced messages and hand them back for sending.
    fn echo(&mut self, messages: Vec<ConfigMessage>) -> Vec<ConfigMessage> {
        for message in &messages {
            self.apply(message);
        }
        messages
    }

    pub fn set_brightness(&mut self, value: u8) -> Vec<ConfigMessage> {
        self.echo(vec![ConfigMessage::Brightness(value.min(MAX_DATA_VALUE))])
    }

    /// Change one snapshot colour of a knob, or all of them when the knob is
    /// in single-colour mode.
    pub fn set_knob_color(
        &mut self,
        bank: u8,
        knob: u8,
        snapshot: u8,
        color: u8,
    ) -> Result<Vec<ConfigMessage>, IntentError> {
        index("snapshot", snapshot, SNAPSHOT_COUNT)?;
        let single = self.knob_mut(bank, knob)?.use_single_color;
        let snapshot = if single {
            SnapshotTarget::All
        } else {
            SnapshotTarget::One(snapshot)
        };
        Ok(self.echo(vec![ConfigMessage::KnobColor {
            bank,
            snapshot,
            knob,
            color,
        }]))
    }

    pub fn set_knob_single_color(
        &mut self,
        bank: u8,
        knob: u8,
        enabled: bool,
    ) -> Result<Vec<ConfigMessage>, IntentError> {
        let state = self.knob_mut(bank, knob)?;
        state.use_single_color = enabled;
        if enabled {
            let color = state.color_indices[0];
            return Ok(self.echo(vec![ConfigMessage::KnobColor {
                bank,
                snapshot: SnapshotTarget::All,
                knob,
                color,
            }]));
        }
        if all_equal(&state.color_indices) {
            return Ok(Vec::new());
        }
        let snapshot = *state;
        Ok(self.echo(knob_color_messages(bank, knob, &snapshot)))
    }

    pub fn set_display_mode(
        &mut self,
        bank: u8,
        knob: u8,
        mode: DisplayMode,
    ) -> Result<Vec<ConfigMessage>, IntentError> {
        self.knob_mut(bank, knob)?;
        Ok(self.echo(vec![ConfigMessage::KnobType { bank, knob, mode }]))
    }

    /// Switching to 14-bit CC also derives the LSB controller from the MSB.
    pub fn set_cc_type(
        &mut self,
        bank: u8,
        knob: u8,
        cc_type: CcType,
    ) -> Result<Vec<ConfigMessage>, IntentError> {
        let cc = self.knob_mut(bank, knob)?.cc;
        let mut messages = vec![ConfigMessage::KnobCcType { bank, knob, cc_type }];
        if cc_type == CcType::Standard14 {
            messages.push(ConfigMessage::KnobMidiCc2 {
                bank,
                knob,
                cc: lsb_for(cc),
            });
        }
        Ok(self.echo(messages))
    }

    pub fn set_channel(
        &mut self,
        bank: u8,
        knob: u8,
        channel: u8,
    ) -> Result<Vec<ConfigMessage>, IntentError> {
        if !(1..=16).contains(&channel) {
            return Err(IntentError::OutOfRange {
                field: "channel",
                value: channel,
            });
        }
        self.knob_mut(bank, knob)?;
        Ok(self.echo(vec![ConfigMessage::KnobMidiChannel {
            bank,
            knob,
            channel,
        }]))
    }

    pub fn set_cc(
        &mut self,
        bank: u8,
        knob: u8,
        cc: u8,
    ) -> Result<Vec<ConfigMessage>, IntentError> {
        let cc = index("cc", cc, MAX_DATA_VALUE as usize + 1)? as u8;
        let cc_type = self.knob_mut(bank, knob)?.cc_type;
        let mut messages = vec![ConfigMessage::KnobMidiCc1 { bank, knob, cc }];
        if cc_type == CcType::Standard14 {
            messages.push(ConfigMessage::KnobMidiCc2 {
                bank,
                knob,
                cc: lsb_for(cc),
            });
        }
        Ok(self.echo(messages))
    }

    pub fn set_cc_lsb(
        &mut self,
        bank: u8,
        knob: u8,
        cc: u8,
    ) -> Result<Vec<ConfigMessage>, IntentError> {
        let cc = index("cc", cc, MAX_DATA_VALUE as usize + 1)? as u8;
        self.knob_mut(bank, knob)?;
        Ok(self.echo(vec![ConfigMessage::KnobMidiCc2 { bank, knob, cc }]))
    }

    pub fn set_bank_color(
        &mut self,
        bank: u8,
        color: u8,
    ) -> Result<Vec<ConfigMessage>, IntentError> {
        index("bank", bank, BANK_COUNT)?;
        Ok(self.echo(vec![ConfigMessage::BankColor { bank, color }]))
    }

    pub fn set_snapshot_color(
        &mut self,
        bank: u8,
        snapshot: u8,
        color: u8,
    ) -> Result<Vec<ConfigMessage>, IntentError> {
        let b = index("bank", bank, BANK_COUNT)?;
        index("snapshot", snapshot, SNAPSHOT_COUNT)?;
        let snapshot = if self.banks[b].use_single_snapshot_color {
            SnapshotTarget::All
        } else {
            SnapshotTarget::One(snapshot)
        };
        Ok(self.echo(vec![ConfigMessage::BankSnapshotColor {
            bank,
            snapshot,
            color,
        }]))
    }

    pub fn set_single_snapshot_color(
        &mut self,
        bank: u8,
        enabled: bool,
    ) -> Result<Vec<ConfigMessage>, IntentError> {
        let b = index("bank", bank, BANK_COUNT)?;
        let state = &mut self.banks[b];
        state.use_single_snapshot_color = enabled;
        if enabled {
            let color = state.snapshots[0].color_index;
            return Ok(self.echo(vec![ConfigMessage::BankSnapshotColor {
                bank,
                snapshot: SnapshotTarget::All,
                color,
            }]));
        }
        let colors = state.snapshots.map(|s| s.color_index);
        if all_equal(&colors) {
            return Ok(Vec::new());
        }
        let messages = colors
            .iter()
            .enumerate()
            .map(|(i, &color)| ConfigMessage::BankSnapshotColor {
                bank,
                snapshot: SnapshotTarget::One(i as u8),
                color,
            })
            .collect();
        Ok(self.echo(messages))
    }

    /// Copy the colour settings of one knob onto others in the same bank.
    pub fn copy_knob_colors(
        &mut self,
        bank: u8,
        source: u8,
        targets: &[u8],
    ) -> Result<Vec<ConfigMessage>, IntentError> {
        let from = *self.knob_mut(bank, source)?;
        for &target in targets {
            index("knob", target, KNOB_COUNT)?;
        }
        let mut messages = Vec::new();
        for &target in targets {
            let state = self.knob_mut(bank, target)?;
            state.color_indices = from.color_indices;
            state.use_single_color = from.use_single_color;
            messages.extend(knob_color_messages(bank, target, &from));
        }
        Ok(self.echo(messages))
    }

    /// Copy a whole bank onto other banks.
    pub fn copy_bank(
        &mut self,
        source: u8,
        targets: &[u8],
    ) -> Result<Vec<ConfigMessage>, IntentError> {
        let from = self.banks[index("bank", source, BANK_COUNT)?].clone();
        let slots = targets
            .iter()
            .map(|&t| index("bank", t, BANK_COUNT))
            .collect::<Result<Vec<_>, _>>()?;
        let mut messages = Vec::new();
        for (&target, slot) in targets.iter().zip(slots) {
            self.banks[slot] = from.clone();
            messages.extend(from.messages_for(target));
        }
        Ok(self.echo(messages))
    }

    /// Messages that rebuild the entire configuration on a device.
    pub fn full_dump(&self) -> Vec<ConfigMessage> {
        let mut out = vec![ConfigMessage::Brightness(self.brightness)];
        for (i, bank) in self.banks.iter().enumerate() {
            out.extend(bank.messages_for(i as u8));
        }
        out
    }
}
