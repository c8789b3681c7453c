// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Routing of received frames to subscribers.

use tracing::{debug, warn};

use crate::protocol::{ConfigMessage, MessageType};
use crate::sysex::{self, SysExAddress};

pub type Handler = Box<dyn FnMut(&ConfigMessage) + Send>;

/// Handle returned by [`EventDispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    filter: Option<MessageType>,
    handler: Handler,
}

/// Decodes incoming frames for one device and fans them out.
///
/// Any number of handlers may listen to the same message type; they run in
/// registration order.
pub struct EventDispatcher {
    address: SysExAddress,
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EventDispatcher {
    pub fn new(address: SysExAddress) -> Self {
        Self {
            address,
            subscriptions: Vec::new(),
            next_id: 0,
        }
    }

    pub fn address(&self) -> SysExAddress {
        self.address
    }

    fn add(&mut self, filter: Option<MessageType>, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            filter,
            handler,
        });
        id
    }

    /// Listen for one message type.
    pub fn subscribe<F>(&mut self, message_type: MessageType, handler: F) -> SubscriptionId
    where
        F: FnMut(&ConfigMessage) + Send + 'static,
    {
        self.add(Some(message_type), Box::new(handler))
    }

    /// Listen for every decoded message.
    pub fn subscribe_all<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&ConfigMessage) + Send + 'static,
    {
        self.add(None, Box::new(handler))
    }

    /// Returns `false` if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Deliver an already decoded message. Returns the number of handlers run.
    pub fn dispatch(&mut self, message: &ConfigMessage) -> usize {
        let message_type = message.message_type();
        let mut delivered = 0;
        for subscription in &mut self.subscriptions {
            if subscription.filter.map_or(true, |f| f == message_type) {
                (subscription.handler)(message);
                delivered += 1;
            }
        }
        delivered
    }

    /// Decode a raw MIDI message and deliver it.
    ///
    /// Foreign, truncated and unknown frames are dropped here and never
    /// reach a handler.
    pub fn dispatch_frame(&mut self, bytes: &[u8]) -> usize {
        let Some(frame) = sysex::decode(bytes) else {
            debug!(len = bytes.len(), "ignoring non-vendor MIDI message");
            return 0;
        };
        if frame.address != self.address {
            debug!(address = ?frame.address, "ignoring SysEx for another device");
            return 0;
        }

        match ConfigMessage::decode(frame.message_type, &frame.payload) {
            Ok(message) => self.dispatch(&message),
            Err(e) => {
                warn!("dropping SysEx message: {}", e);
                0
            }
        }
    }
}
