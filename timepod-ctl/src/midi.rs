// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! MIDI connection to the controller.
//!
//! Outgoing configuration goes through the selected output. Incoming bytes
//! arrive on the backend's callback thread and are handed to the shared
//! [`EventDispatcher`].

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use tracing::{debug, info};

use timepod_common::{ConfigMessage, EventDispatcher, MessageType, SubscriptionId, SysExAddress};

use crate::error::LinkError;

const CLIENT_NAME: &str = "timepod-ctl";

/// Something that can put a raw SysEx frame on the wire.
pub trait SysExSink {
    fn send_sysex(&mut self, frame: &[u8]) -> Result<(), LinkError>;
}

pub struct MidiLink {
    address: SysExAddress,
    dispatcher: Arc<Mutex<EventDispatcher>>,
    output: Option<(String, MidiOutputConnection)>,
    input: Option<(String, MidiInputConnection<()>)>,
}

impl MidiLink {
    pub fn new(address: SysExAddress) -> Self {
        Self {
            address,
            dispatcher: Arc::new(Mutex::new(EventDispatcher::new(address))),
            output: None,
            input: None,
        }
    }

    pub fn address(&self) -> SysExAddress {
        self.address
    }

    pub fn output_id(&self) -> Option<&str> {
        self.output.as_ref().map(|(id, _)| id.as_str())
    }

    pub fn input_id(&self) -> Option<&str> {
        self.input.as_ref().map(|(id, _)| id.as_str())
    }

    /// Connect to the output named `id`, replacing any previous selection.
    pub fn select_output(&mut self, id: &str) -> Result<(), LinkError> {
        let midi_out = MidiOutput::new(CLIENT_NAME)?;
        let port = midi_out
            .ports()
            .into_iter()
            .find(|p| midi_out.port_name(p).is_ok_and(|n| n == id))
            .ok_or_else(|| LinkError::EndpointNotFound(id.to_string()))?;

        // Close the old connection before opening the new one.
        self.output = None;
        let connection = midi_out.connect(&port, "timepod-out")?;
        info!(output = id, "MIDI output selected");
        self.output = Some((id.to_string(), connection));
        Ok(())
    }

    /// Connect to the input named `id`. SysEx must not be filtered.
    pub fn select_input(&mut self, id: &str) -> Result<(), LinkError> {
        let mut midi_in = MidiInput::new(CLIENT_NAME)?;
        midi_in.ignore(Ignore::None);
        let port = midi_in
            .ports()
            .into_iter()
            .find(|p| midi_in.port_name(p).is_ok_and(|n| n == id))
            .ok_or_else(|| LinkError::EndpointNotFound(id.to_string()))?;

        self.input = None;
        let dispatcher = Arc::clone(&self.dispatcher);
        let connection = midi_in.connect(
            &port,
            "timepod-in",
            move |_stamp, message, _| {
                let delivered = dispatcher.lock().dispatch_frame(message);
                debug!(len = message.len(), delivered, "MIDI message received");
            },
            (),
        )?;
        info!(input = id, "MIDI input selected");
        self.input = Some((id.to_string(), connection));
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some((_, conn)) = self.input.take() {
            conn.close();
        }
        if let Some((_, conn)) = self.output.take() {
            conn.close();
        }
    }

    pub fn send_config(&mut self, message: &ConfigMessage) -> Result<(), LinkError> {
        let frame = message.to_frame(&self.address)?;
        debug!(?message, "sending");
        self.send_sysex(&frame)
    }

    pub fn subscribe<F>(&self, message_type: MessageType, handler: F) -> SubscriptionId
    where
        F: FnMut(&ConfigMessage) + Send + 'static,
    {
        self.dispatcher.lock().subscribe(message_type, handler)
    }

    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: FnMut(&ConfigMessage) + Send + 'static,
    {
        self.dispatcher.lock().subscribe_all(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.dispatcher.lock().unsubscribe(id)
    }

    /// Receive every decoded message on a channel instead of a callback.
    pub fn event_channel(&self) -> (SubscriptionId, Receiver<ConfigMessage>) {
        let (tx, rx) = unbounded();
        let id = self.subscribe_all(move |m| {
            let _ = tx.send(m.clone());
        });
        (id, rx)
    }

    pub fn dispatcher(&self) -> Arc<Mutex<EventDispatcher>> {
        Arc::clone(&self.dispatcher)
    }
}

impl SysExSink for MidiLink {
    fn send_sysex(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        let (_, connection) = self.output.as_mut().ok_or(LinkError::NoOutputSelected)?;
        connection.send(frame)?;
        Ok(())
    }
}

impl Drop for MidiLink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timepod_common::TIMEPOD_ADDRESS;

    #[test]
    fn test_send_without_output_fails() {
        let mut link = MidiLink::new(TIMEPOD_ADDRESS);
        assert!(link.output_id().is_none());
        let err = link.send_config(&ConfigMessage::Sync).unwrap_err();
        assert!(matches!(err, LinkError::NoOutputSelected));
    }

    #[test]
    fn test_invalid_message_is_rejected_before_sending() {
        let mut link = MidiLink::new(TIMEPOD_ADDRESS);
        let err = link
            .send_config(&ConfigMessage::BankColor { bank: 9, color: 0 })
            .unwrap_err();
        assert!(matches!(err, LinkError::Protocol(_)));
    }

    #[test]
    fn test_event_channel_receives_dispatched_frames() {
        let link = MidiLink::new(TIMEPOD_ADDRESS);
        let (id, rx) = link.event_channel();

        let frame = ConfigMessage::Brightness(42).to_frame(&TIMEPOD_ADDRESS).unwrap();
        link.dispatcher().lock().dispatch_frame(&frame);
        assert_eq!(rx.try_recv().unwrap(), ConfigMessage::Brightness(42));

        assert!(link.unsubscribe(id));
        link.dispatcher().lock().dispatch_frame(&frame);
        assert!(rx.try_recv().is_err());
    }
}
