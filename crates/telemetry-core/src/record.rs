//! Wire Record Codec
//!
//! Layout (14 bytes, no padding, position only):
//!
//! | offset | size | field       |
//! |--------|------|-------------|
//! | 0      | 4    | timestamp   |
//! | 4      | 1    | source_id   |
//! | 5      | 1    | length      |
//! | 6      | 8    | payload     |
//!
//! The timestamp is written little-endian.

use crate::error::RecordError;
use serde::{Deserialize, Serialize};

/// Encoded size of a record
pub const RECORD_SIZE: usize = 14;

/// Payload capacity of a record
pub const MAX_PAYLOAD: usize = 8;

const SOURCE_ID_OFFSET: usize = 4;
const LENGTH_OFFSET: usize = 5;
const PAYLOAD_OFFSET: usize = 6;

/// One telemetry sample as sent to the collector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireRecord {
    timestamp: u32,
    source_id: u8,
    length: u8,
    payload: [u8; MAX_PAYLOAD],
}

impl WireRecord {
    /// Create a record, keeping at most the first 8 bytes of `data`
    pub fn new(timestamp: u32, source_id: u8, data: &[u8]) -> Self {
        let length = data.len().min(MAX_PAYLOAD);
        let mut payload = [0u8; MAX_PAYLOAD];
        payload[..length].copy_from_slice(&data[..length]);
        Self {
            timestamp,
            source_id,
            length: length as u8,
            payload,
        }
    }

    /// Milliseconds since the capture epoch (wraps after ~49.7 days)
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Folded 8-bit source identifier
    pub fn source_id(&self) -> u8 {
        self.source_id
    }

    /// Number of valid payload bytes (0-8)
    pub fn len(&self) -> usize {
        self.length as usize
    }

    /// Whether the record carries no data bytes
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The valid part of the payload
    pub fn data(&self) -> &[u8] {
        &self.payload[..self.len()]
    }

    /// The full 8-byte payload, zero past `len()`
    pub fn payload(&self) -> &[u8; MAX_PAYLOAD] {
        &self.payload
    }

    /// Serialize into the 14-byte wire layout
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[..SOURCE_ID_OFFSET].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[SOURCE_ID_OFFSET] = self.source_id;
        buf[LENGTH_OFFSET] = self.length;
        buf[PAYLOAD_OFFSET..].copy_from_slice(&self.payload);
        buf
    }

    /// Parse a record from exactly 14 bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() != RECORD_SIZE {
            return Err(RecordError::Size {
                expected: RECORD_SIZE,
                actual: bytes.len(),
            });
        }

        let length = bytes[LENGTH_OFFSET];
        if length as usize > MAX_PAYLOAD {
            return Err(RecordError::Length(length));
        }

        let mut timestamp = [0u8; 4];
        timestamp.copy_from_slice(&bytes[..SOURCE_ID_OFFSET]);

        // Bytes past `length` carry no data
        let mut payload = [0u8; MAX_PAYLOAD];
        let end = PAYLOAD_OFFSET + length as usize;
        payload[..length as usize].copy_from_slice(&bytes[PAYLOAD_OFFSET..end]);

        Ok(Self {
            timestamp: u32::from_le_bytes(timestamp),
            source_id: bytes[SOURCE_ID_OFFSET],
            length,
            payload,
        })
    }
}
