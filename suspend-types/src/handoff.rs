// SPDX-License-Identifier: GPL-3.0-only

//! State handoff into the resume environment
//!
//! The registry is built where device inventory is available and replayed
//! inside the restricted root, which must not rediscover anything. Wire
//! format: a big-endian `u32` payload length followed by a JSON array of
//! volumes, in registry order. There is no version field; both sides ship
//! from the same build.
//!
//! Anything that does not decode exactly is rejected. The resume side has
//! no other source for volume order and must abort rather than guess.

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::registry::{RegistryError, VolumeRegistry};
use crate::volume::Volume;

/// Upper bound on the JSON payload; a registry is a few hundred bytes.
pub const MAX_PAYLOAD_LEN: usize = 1024 * 1024;

const LEN_PREFIX: usize = 4;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot serialize volume registry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("volume registry payload of {0} bytes exceeds limit")]
    TooLarge(usize),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("{0} unexpected bytes after payload")]
    TrailingBytes(usize),

    #[error("declared payload length {0} exceeds limit")]
    TooLarge(usize),

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid volume registry: {0}")]
    InvalidRegistry(#[from] RegistryError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub fn encode(registry: &VolumeRegistry) -> Result<Vec<u8>, EncodeError> {
    let payload = serde_json::to_vec(registry.volumes())?;
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(EncodeError::TooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(LEN_PREFIX + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

pub fn decode(frame: &[u8]) -> Result<VolumeRegistry, DecodeError> {
    let Some((prefix, payload)) = frame.split_first_chunk::<LEN_PREFIX>() else {
        return Err(DecodeError::Truncated {
            expected: LEN_PREFIX,
            actual: frame.len(),
        });
    };

    let declared = u32::from_be_bytes(*prefix) as usize;
    if declared > MAX_PAYLOAD_LEN {
        return Err(DecodeError::TooLarge(declared));
    }
    if payload.len() < declared {
        return Err(DecodeError::Truncated {
            expected: declared,
            actual: payload.len(),
        });
    }
    if payload.len() > declared {
        return Err(DecodeError::TrailingBytes(payload.len() - declared));
    }

    let volumes: Vec<Volume> = serde_json::from_slice(payload)?;
    Ok(VolumeRegistry::new(volumes)?)
}

/// Write one frame and flush. The reader sees end-of-stream once the writer
/// is dropped.
pub fn write_to<W: Write>(mut writer: W, registry: &VolumeRegistry) -> Result<(), EncodeError> {
    let frame = encode(registry)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read until end-of-stream and decode exactly one frame.
pub fn read_from<R: Read>(reader: R) -> Result<VolumeRegistry, DecodeError> {
    let mut frame = Vec::new();
    reader
        .take((LEN_PREFIX + MAX_PAYLOAD_LEN + 1) as u64)
        .read_to_end(&mut frame)?;
    decode(&frame)
}
