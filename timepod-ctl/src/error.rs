// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Error types for the device link and the firmware fetcher.

use std::io;

use thiserror::Error;
use timepod_common::protocol::ProtocolError;
use timepod_common::state::IntentError;
use timepod_common::upload_fsm::SessionError;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("MIDI backend unavailable: {0}")]
    MidiInit(String),

    #[error("no MIDI output selected")]
    NoOutputSelected,

    #[error("MIDI endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("MIDI connection failed: {0}")]
    Connect(String),

    #[error("MIDI send failed: {0}")]
    Send(String),

    #[error("invalid configuration message: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("invalid setting: {0}")]
    Intent(#[from] IntentError),

    #[error("failed to open serial port {path}")]
    SerialOpen {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("serial I/O error: {0}")]
    SerialIo(#[from] io::Error),

    #[error("device not found after {attempts} attempts")]
    DeviceNotFound { attempts: u32 },

    #[error("a firmware upload is already in progress")]
    UploadInProgress,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("server answered HTTP {0}")]
    Status(u16),

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("redirect without a Location header")]
    MissingLocation,

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("firmware image too large ({0} bytes)")]
    TooLarge(u64),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to read response body: {0}")]
    Io(#[from] io::Error),
}

impl From<midir::InitError> for LinkError {
    fn from(e: midir::InitError) -> Self {
        LinkError::MidiInit(e.to_string())
    }
}

impl From<midir::SendError> for LinkError {
    fn from(e: midir::SendError) -> Self {
        LinkError::Send(e.to_string())
    }
}

impl<T> From<midir::ConnectError<T>> for LinkError {
    fn from(e: midir::ConnectError<T>) -> Self {
        LinkError::Connect(e.kind().to_string())
    }
}
