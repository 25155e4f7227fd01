// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire payload and the pluggable data-converter.
//!
//! A [`Payload`] is the wire representation of any value crossing the
//! sandbox boundary: command arguments, activity results, query responses.
//! [`DataConverter`] is the pluggable codec; [`JsonConverter`] is the
//! default, JSON-backed implementation.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Metadata key naming the encoding used for a payload's `data` bytes.
pub const ENCODING_METADATA_KEY: &str = "encoding";

/// Encoding tag used by [`JsonConverter`].
pub const JSON_ENCODING: &str = "json/plain";

/// A self-describing unit of wire data: raw bytes plus metadata naming how
/// to interpret them. Mirrors the shape used for command arguments,
/// activity results, and query responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Vec<u8>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
}

impl Payload {
    pub fn new(encoding: &str, data: Vec<u8>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(ENCODING_METADATA_KEY.to_string(), encoding.as_bytes().to_vec());
        Self { metadata, data }
    }

    pub fn encoding(&self) -> Option<&[u8]> {
        self.metadata.get(ENCODING_METADATA_KEY).map(Vec::as_slice)
    }

    /// The canonical payload for "no value" — used when a workflow or
    /// activity completes with no meaningful result.
    pub fn binary_null() -> Self {
        Payload::new(JSON_ENCODING, b"null".to_vec())
    }
}

/// Failure to interpret a [`Payload`]'s bytes as a value of the requested
/// type. Distinct from "the value legitimately decoded to nothing" — per
/// the decoding contract, `fromPayload` never conflates the two (Open
/// Question (a)).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload has no {ENCODING_METADATA_KEY} metadata")]
    MissingEncoding,

    #[error("unsupported payload encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("payload bytes are not valid JSON: {0}")]
    InvalidJson(String),
}

/// Pluggable codec between Rust values and [`Payload`]s. Not object-safe
/// (its methods are generic); an engine is parameterized over a concrete
/// converter type rather than boxing one.
pub trait DataConverter {
    fn to_payload<T: Serialize>(&self, value: &T) -> Result<Payload, DecodeError>;
    fn from_payload<T: DeserializeOwned>(&self, payload: &Payload) -> Result<T, DecodeError>;
}

/// Default converter: JSON in, JSON out, tagged with [`JSON_ENCODING`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter;

impl DataConverter for JsonConverter {
    fn to_payload<T: Serialize>(&self, value: &T) -> Result<Payload, DecodeError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
        Ok(Payload::new(JSON_ENCODING, bytes))
    }

    fn from_payload<T: DeserializeOwned>(&self, payload: &Payload) -> Result<T, DecodeError> {
        match payload.encoding() {
            None => Err(DecodeError::MissingEncoding),
            Some(enc) if enc != JSON_ENCODING.as_bytes() => {
                Err(DecodeError::UnsupportedEncoding(String::from_utf8_lossy(enc).into_owned()))
            }
            Some(_) => serde_json::from_slice(&payload.data)
                .map_err(|e| DecodeError::InvalidJson(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn round_trips_a_plain_record() {
        let converter = JsonConverter;
        let point = Point { x: 3, y: 4 };
        let payload = converter.to_payload(&point).unwrap();
        let back: Point = converter.from_payload(&payload).unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn round_trips_primitive_and_bytes() {
        let converter = JsonConverter;
        let payload = converter.to_payload(&42i64).unwrap();
        let back: i64 = converter.from_payload(&payload).unwrap();
        assert_eq!(back, 42);

        let bytes = vec![1u8, 2, 3, 255];
        let payload = converter.to_payload(&bytes).unwrap();
        let back: Vec<u8> = converter.from_payload(&payload).unwrap();
        assert_eq!(back, bytes);
    }

    #[test]
    fn missing_encoding_is_a_decode_error_not_a_value() {
        let payload = Payload { metadata: HashMap::new(), data: b"null".to_vec() };
        let converter = JsonConverter;
        let result: Result<serde_json::Value, DecodeError> = converter.from_payload(&payload);
        assert_eq!(result, Err(DecodeError::MissingEncoding));
    }

    #[test]
    fn unsupported_encoding_is_rejected() {
        let payload = Payload::new("proto/custom", vec![1, 2, 3]);
        let converter = JsonConverter;
        let result: Result<serde_json::Value, DecodeError> = converter.from_payload(&payload);
        assert!(matches!(result, Err(DecodeError::UnsupportedEncoding(_))));
    }

    #[test]
    fn binary_null_decodes_as_json_null() {
        let converter = JsonConverter;
        let payload = Payload::binary_null();
        let value: serde_json::Value = converter.from_payload(&payload).unwrap();
        assert!(value.is_null());
    }
}
