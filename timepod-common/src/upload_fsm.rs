// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! AVR109 upload FSM - pure logic without serial port dependencies.
//!
//! The driver feeds [`UploadEvent`]s in and executes the returned
//! [`UploadAction`]s. Commands are strictly sequential: after a `Send` the
//! driver must report exactly one `Response` or `Timeout` before anything
//! else happens.
//!
//! Page 0 holds the bootloader entry, so it is written last. The body is
//! written starting at `page_size`, then the address is rewound to 0 for
//! the first page. An interrupted upload leaves the old page 0 in place.
//!
//! A step that stays silent through [`MAX_RETRIES`] resends is abandoned and
//! the session moves on to the next step instead of failing. Many AVR109
//! bootloaders do not acknowledge every command reliably.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::avr109::{Command, EXIT_DELAY, MAX_RETRIES, PORT_SETTLE_DELAY};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadState {
    Identify,
    GetProgrammer,
    Programming,
    Erase,
    Address,
    WriteData,
    RewindAddress,
    WriteFirstPage,
    Exit,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadEvent {
    /// Port is open; begin the session.
    Start,
    /// The bootloader answered the last command.
    Response,
    /// The last command's timeout elapsed without an answer.
    Timeout,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UploadAction {
    /// Sleep before continuing.
    Delay(Duration),
    /// Write the command and wait up to `command.timeout()` for an answer.
    Send(Command),
    /// Write the command without waiting for an answer.
    SendNoReply(Command),
    /// Fraction of the image processed, in `[0, 1]`, never decreasing.
    Progress(f32),
    /// The session finished successfully.
    Complete,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("firmware image is empty")]
    EmptyImage,
    #[error("page size must be a non-zero even number, got {0}")]
    InvalidPageSize(usize),
}

/// One firmware upload attempt.
pub struct UploadSession<'a> {
    image: &'a [u8],
    page_size: usize,
    state: UploadState,
    address: usize,
    retries: u8,
    erase_abandoned: bool,
    processed: usize,
    progress: f32,
    pending: Option<Command>,
    skipped_pages: Vec<usize>,
}

impl<'a> UploadSession<'a> {
    pub fn new(image: &'a [u8], page_size: usize) -> Result<Self, SessionError> {
        if image.is_empty() {
            return Err(SessionError::EmptyImage);
        }
        if page_size == 0 || page_size % 2 != 0 {
            return Err(SessionError::InvalidPageSize(page_size));
        }

        Ok(Self {
            image,
            page_size,
            state: UploadState::Identify,
            address: page_size,
            retries: 0,
            erase_abandoned: false,
            processed: 0,
            progress: 0.0,
            pending: None,
            skipped_pages: Vec::new(),
        })
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Byte address of the next body page.
    pub fn current_address(&self) -> usize {
        self.address
    }

    pub fn retries(&self) -> u8 {
        self.retries
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_done(&self) -> bool {
        self.state == UploadState::Done
    }

    /// Addresses of body pages abandoned after exhausting their retries.
    pub fn skipped_pages(&self) -> &[usize] {
        &self.skipped_pages
    }

    /// Advance the session by one event.
    pub fn handle(&mut self, event: UploadEvent) -> Vec<UploadAction> {
        match event {
            UploadEvent::Start => {
                if self.state != UploadState::Identify || self.pending.is_some() {
                    return Vec::new();
                }
                let mut actions = vec![
                    UploadAction::Progress(0.0),
                    UploadAction::Delay(PORT_SETTLE_DELAY),
                ];
                actions.extend(self.enter(UploadState::Identify));
                actions
            }
            UploadEvent::Response => {
                if self.pending.is_none() {
                    return Vec::new();
                }
                self.retries = 0;
                self.on_response()
            }
            UploadEvent::Timeout => {
                let Some(command) = self.pending.clone() else {
                    return Vec::new();
                };
                self.retries += 1;
                if self.retries <= MAX_RETRIES {
                    debug!(state = ?self.state, attempt = self.retries, "resending after timeout");
                    return vec![UploadAction::Send(command)];
                }
                warn!(
                    state = ?self.state,
                    "no answer after {} retries, skipping step", MAX_RETRIES
                );
                self.retries = 0;
                self.on_abandon()
            }
        }
    }

    fn on_response(&mut self) -> Vec<UploadAction> {
        match self.state {
            UploadState::Identify => self.enter(UploadState::GetProgrammer),
            UploadState::GetProgrammer => self.enter(UploadState::Programming),
            UploadState::Programming => self.after_programming(),
            UploadState::Erase => self.enter(UploadState::Address),
            UploadState::Address => self.enter(UploadState::WriteData),
            UploadState::WriteData => {
                let written = self.body_len_at(self.address);
                self.finish_body_page(written)
            }
            UploadState::RewindAddress => self.enter(UploadState::WriteFirstPage),
            UploadState::WriteFirstPage => {
                self.processed += self.first_page_len();
                let mut actions = self.report_progress();
                actions.extend(self.enter(UploadState::Exit));
                actions
            }
            UploadState::Exit | UploadState::Done => Vec::new(),
        }
    }

    fn on_abandon(&mut self) -> Vec<UploadAction> {
        match self.state {
            UploadState::Identify | UploadState::GetProgrammer => {
                self.enter(UploadState::Programming)
            }
            UploadState::Programming => self.after_programming(),
            UploadState::Erase => {
                self.erase_abandoned = true;
                self.enter(UploadState::Programming)
            }
            UploadState::Address => self.enter(UploadState::WriteData),
            UploadState::WriteData => {
                self.skipped_pages.push(self.address);
                self.processed += self.body_len_at(self.address);
                self.address += self.page_size;
                let mut actions = self.report_progress();
                // The device pointer did not advance; re-address the next page.
                if self.body_len_at(self.address) > 0 {
                    actions.extend(self.enter(UploadState::Address));
                } else {
                    actions.extend(self.enter(UploadState::WriteData));
                }
                actions
            }
            UploadState::RewindAddress => self.enter(UploadState::WriteFirstPage),
            UploadState::WriteFirstPage => self.enter(UploadState::Exit),
            UploadState::Exit | UploadState::Done => Vec::new(),
        }
    }

    fn after_programming(&mut self) -> Vec<UploadAction> {
        if self.erase_abandoned {
            self.enter(UploadState::Address)
        } else {
            self.enter(UploadState::Erase)
        }
    }

    fn finish_body_page(&mut self, len: usize) -> Vec<UploadAction> {
        self.processed += len;
        self.address += self.page_size;
        let mut actions = self.report_progress();
        actions.extend(self.enter(UploadState::WriteData));
        actions
    }

    fn body_len_at(&self, address: usize) -> usize {
        self.page_size.min(self.image.len().saturating_sub(address))
    }

    fn first_page_len(&self) -> usize {
        self.page_size.min(self.image.len())
    }

    fn report_progress(&mut self) -> Vec<UploadAction> {
        let fraction = (self.processed as f32 / self.image.len() as f32).min(1.0);
        if fraction > self.progress {
            self.progress = fraction;
        }
        vec![UploadAction::Progress(self.progress)]
    }

    fn send(&mut self, command: Command) -> Vec<UploadAction> {
        self.pending = Some(command.clone());
        vec![UploadAction::Send(command)]
    }

    fn enter(&mut self, state: UploadState) -> Vec<UploadAction> {
        self.state = state;
        self.retries = 0;
        match state {
            UploadState::Identify => self.send(Command::ReadBootloaderId),
            UploadState::GetProgrammer => self.send(Command::ReadPartCode),
            UploadState::Programming => self.send(Command::EnterProgramming),
            UploadState::Erase => self.send(Command::EraseFlash),
            UploadState::Address => self.send(Command::SetAddress {
                byte_address: self.address as u32,
            }),
            UploadState::WriteData => {
                let len = self.body_len_at(self.address);
                if len == 0 {
                    return self.enter(UploadState::RewindAddress);
                }
                let data = self.image[self.address..self.address + len].to_vec();
                self.send(Command::BlockWrite { data })
            }
            UploadState::RewindAddress => self.send(Command::SetAddress { byte_address: 0 }),
            UploadState::WriteFirstPage => {
                let data = self.image[..self.first_page_len()].to_vec();
                self.send(Command::BlockWrite { data })
            }
            UploadState::Exit => {
                self.pending = None;
                self.state = UploadState::Done;
                self.progress = 1.0;
                vec![
                    UploadAction::Delay(EXIT_DELAY),
                    UploadAction::SendNoReply(Command::ExitBootloader),
                    UploadAction::Progress(1.0),
                    UploadAction::Complete,
                ]
            }
            UploadState::Done => Vec::new(),
        }
    }
}
