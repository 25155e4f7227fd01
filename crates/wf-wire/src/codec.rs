// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-delimited framing: 4-byte big-endian length prefix + JSON payload
//!. The core itself performs no I/O, so this codec is
//! synchronous and operates over any `Read`/`Write`, not an async socket.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Guards against a corrupt or adversarial length prefix demanding an
/// unreasonable allocation.
pub const MAX_MESSAGE_BYTES: u32 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message of {len} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit")]
    MessageTooLarge { len: u32 },
}

/// Encode a value as raw JSON bytes, with no length prefix.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode a value from raw JSON bytes, with no length prefix.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write `payload` to `writer` prefixed with its big-endian `u32` length.
pub fn write_message<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError> {
    let len = u32::try_from(payload.len()).map_err(|_| ProtocolError::MessageTooLarge {
        len: u32::MAX,
    })?;
    if len > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::MessageTooLarge { len });
    }
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

/// Read one length-prefixed message from `reader`.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::MessageTooLarge { len });
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}
