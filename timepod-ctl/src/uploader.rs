// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Drives an [`UploadSession`] against a bootloader port.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use timepod_common::upload_fsm::SessionError;
use timepod_common::{UploadAction, UploadEvent, UploadSession};

use crate::error::LinkError;
use crate::transport::BootloaderPort;

/// Allows at most one firmware upload at a time.
#[derive(Clone, Default)]
pub struct UploadLock(Arc<AtomicBool>);

/// Held for the duration of an upload; releases the lock when dropped.
pub struct UploadGuard(Arc<AtomicBool>);

impl UploadLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<UploadGuard, LinkError> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LinkError::UploadInProgress)?;
        Ok(UploadGuard(Arc::clone(&self.0)))
    }

    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Run one upload to completion. Port I/O errors abort; bootloader silence
/// is handled by the session's retry logic.
pub fn run_upload<P, F>(
    port: &mut P,
    image: &[u8],
    page_size: usize,
    mut on_progress: F,
) -> Result<(), LinkError>
where
    P: BootloaderPort + ?Sized,
    F: FnMut(f32),
{
    let mut session = UploadSession::new(image, page_size)?;
    let mut actions = session.handle(UploadEvent::Start);

    while !actions.is_empty() {
        let mut next = Vec::new();
        for action in actions {
            match action {
                UploadAction::Delay(d) => port.pause(d),
                UploadAction::Progress(p) => on_progress(p),
                UploadAction::Send(command) => {
                    port.send(&command.encode())?;
                    let event = match port.wait_response(command.timeout())? {
                        Some(_) => UploadEvent::Response,
                        None => UploadEvent::Timeout,
                    };
                    debug!(state = ?session.state(), ?event, "bootloader exchange");
                    next.extend(session.handle(event));
                }
                UploadAction::SendNoReply(command) => port.send(&command.encode())?,
                UploadAction::Complete => {
                    let skipped = session.skipped_pages();
                    if skipped.is_empty() {
                        info!(bytes = image.len(), "firmware upload complete");
                    } else {
                        warn!(?skipped, "firmware upload finished with unwritten pages");
                    }
                }
            }
        }
        actions = next;
    }
    Ok(())
}

/// Take the upload lock, open the port and run the upload.
///
/// The port is opened only once the lock is held and is closed when this
/// returns, on every path.
pub fn flash_image<P, O, F>(
    lock: &UploadLock,
    open: O,
    image: &[u8],
    page_size: usize,
    on_progress: F,
) -> Result<(), LinkError>
where
    P: BootloaderPort,
    O: FnOnce() -> Result<P, LinkError>,
    F: FnMut(f32),
{
    let _guard = lock.try_acquire()?;
    if image.is_empty() {
        return Err(SessionError::EmptyImage.into());
    }
    let mut port = open()?;
    run_upload(&mut port, image, page_size, on_progress)
}
