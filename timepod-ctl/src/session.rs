// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Orchestration of the device link.
//!
//! A [`Context`] is built once from [`Config`] and owns everything a
//! front-end talks to: the MIDI link, the mirrored device state and the
//! upload lock. Flashing runs discovery, trigger, re-discovery and upload in
//! that order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use timepod_common::state::IntentError;
use timepod_common::upload_fsm::UploadSession;
use timepod_common::{ConfigMessage, DeviceState, MessageType};

use crate::bootloader;
use crate::config::Config;
use crate::discovery::{self, DeviceMatcher, MidiEndpoint};
use crate::error::LinkError;
use crate::fetch::{self, UreqClient};
use crate::midi::MidiLink;
use crate::transport::SerialTransport;
use crate::uploader::{self, UploadLock};

pub struct Context {
    pub config: Config,
    pub midi: MidiLink,
    state: Arc<Mutex<DeviceState>>,
    upload_lock: UploadLock,
}

impl Context {
    pub fn new(config: Config) -> Self {
        let midi = MidiLink::new(config.address());
        let state = Arc::new(Mutex::new(DeviceState::default()));

        let mirror = Arc::clone(&state);
        midi.subscribe_all(move |message| {
            mirror.lock().apply(message);
        });
        midi.subscribe(MessageType::FirmwareVersion, |message| {
            if let ConfigMessage::FirmwareVersion { major, minor } = message {
                info!("device firmware {}.{}", major, minor);
            }
        });

        Self {
            config,
            midi,
            state,
            upload_lock: UploadLock::new(),
        }
    }

    pub fn matcher(&self) -> DeviceMatcher {
        DeviceMatcher::from_config(&self.config)
    }

    /// Snapshot of the mirrored device configuration.
    pub fn state(&self) -> DeviceState {
        self.state.lock().clone()
    }

    pub fn upload_lock(&self) -> &UploadLock {
        &self.upload_lock
    }

    /// Select the device's MIDI output and input by name.
    ///
    /// An output is required. A missing input only disables state updates.
    pub fn connect_primary(&mut self) -> Result<MidiEndpoint, LinkError> {
        let matcher = self.matcher();

        let outputs = discovery::list_outputs();
        let output = matcher
            .primary_endpoint(&outputs)
            .cloned()
            .ok_or_else(|| LinkError::EndpointNotFound(self.config.product_names.join(" / ")))?;
        self.midi.select_output(&output.id)?;

        let inputs = discovery::list_inputs();
        match matcher.primary_endpoint(&inputs) {
            Some(input) => self.midi.select_input(&input.id)?,
            None => warn!("no matching MIDI input, device state will not update"),
        }
        Ok(output)
    }

    /// Ask the device for a full dump and collect replies until it has been
    /// quiet for `quiet`.
    pub fn sync(&mut self, quiet: Duration, limit: Duration) -> Result<DeviceState, LinkError> {
        let (id, events) = self.midi.event_channel();
        let result = self.midi.send_config(&ConfigMessage::Sync);

        if result.is_ok() {
            let deadline = Instant::now() + limit;
            let mut received = 0usize;
            while Instant::now() < deadline && events.recv_timeout(quiet).is_ok() {
                received += 1;
            }
            info!(received, "sync finished");
        }

        self.midi.unsubscribe(id);
        result.map(|_| self.state())
    }

    /// Run a user intent against the mirror and send the resulting messages.
    ///
    /// The mirror is only updated once every message went out, by applying
    /// the sent messages on top of whatever the device reported meanwhile.
    pub fn apply_intent<F>(&mut self, intent: F) -> Result<usize, LinkError>
    where
        F: FnOnce(&mut DeviceState) -> Result<Vec<ConfigMessage>, IntentError>,
    {
        let mut draft = self.state();
        let messages = intent(&mut draft)?;
        for message in &messages {
            self.midi.send_config(message)?;
        }
        commit(&self.state, &messages);
        Ok(messages.len())
    }

    /// Fetch a firmware image, from `url` or the configured default.
    pub fn download_firmware<F>(
        &self,
        url: Option<&str>,
        on_progress: F,
    ) -> Result<Vec<u8>, LinkError>
    where
        F: FnMut(f32),
    {
        let url = url.unwrap_or(&self.config.firmware_url);
        info!(url, "downloading firmware");
        Ok(fetch::download(&UreqClient::new(), url, on_progress)?)
    }

    /// Reboot the device on `output_id` into its bootloader and flash `image`.
    pub fn upload_firmware<F>(
        &mut self,
        output_id: &str,
        image: &[u8],
        on_progress: F,
    ) -> Result<(), LinkError>
    where
        F: FnMut(f32),
    {
        let _guard = self.upload_lock.try_acquire()?;
        // Reject the image and page size before the device leaves its firmware.
        UploadSession::new(image, self.config.page_size)?;

        if self.midi.output_id() != Some(output_id) {
            self.midi.select_output(output_id)?;
        }
        let address = self.midi.address();
        bootloader::enter_bootloader(&mut self.midi, &address, self.config.bootloader_settle())?;

        let matcher = self.matcher();
        let port = discovery::wait_for_port(
            self.config.poll_attempts,
            self.config.poll_interval(),
            discovery::list_serial_ports,
            |ports| matcher.serial_port(ports).cloned(),
        )?;
        info!(path = %port.path, "bootloader port found");

        let mut transport = SerialTransport::open(&port.path)?;
        debug!(port = %transport.port_name(), "serial port open");
        uploader::run_upload(&mut transport, image, self.config.page_size, on_progress)
    }

    /// Flash a device that is already sitting in its bootloader.
    pub fn upload_to_port<F>(
        &self,
        path: &str,
        image: &[u8],
        on_progress: F,
    ) -> Result<(), LinkError>
    where
        F: FnMut(f32),
    {
        uploader::flash_image(
            &self.upload_lock,
            || SerialTransport::open(path),
            image,
            self.config.page_size,
            on_progress,
        )
    }
}

fn commit(state: &Mutex<DeviceState>, messages: &[ConfigMessage]) {
    let mut state = state.lock();
    for message in messages {
        state.apply(message);
    }
}
