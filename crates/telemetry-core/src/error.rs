//! Record Error Types

use thiserror::Error;

/// Errors when decoding a wire record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Input is not exactly one record long
    #[error("Wire record must be {expected} bytes, got {actual}")]
    Size { expected: usize, actual: usize },

    /// Length byte exceeds the payload capacity
    #[error("Payload length {0} exceeds 8 bytes")]
    Length(u8),
}
