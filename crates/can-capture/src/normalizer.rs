//! Frame Normalization
//!
//! Maps a raw bus frame onto a wire record: error frames are dropped, the
//! identifier is folded to 8 bits and the payload is clamped to 8 bytes.

use crate::frame::RawFrame;
use std::time::Instant;
use telemetry_core::{WireRecord, MAX_PAYLOAD};

/// XOR the four bytes of `id` together.
///
/// Keeps entropy from the upper identifier bits that plain truncation
/// (`id & 0xFF`) would lose.
pub fn fold_id(id: u32) -> u8 {
    id.to_le_bytes().iter().fold(0, |acc, byte| acc ^ byte)
}

/// Normalize `frame` with an explicit timestamp
pub fn normalize_at(frame: &RawFrame, timestamp: u32) -> Option<WireRecord> {
    if frame.is_error() {
        return None;
    }

    let source_id = fold_id(frame.raw_id());
    let len = (frame.len as usize).min(MAX_PAYLOAD);

    if frame.is_remote() {
        // RTR data bytes are undefined
        let zeros = [0u8; MAX_PAYLOAD];
        return Some(WireRecord::new(timestamp, source_id, &zeros[..len]));
    }

    Some(WireRecord::new(timestamp, source_id, &frame.data[..len]))
}

/// Stamps frames with a process-local monotonic millisecond clock
#[derive(Debug, Clone)]
pub struct Normalizer {
    epoch: Instant,
}

impl Normalizer {
    /// Start the clock now
    pub fn new() -> Self {
        Self::with_epoch(Instant::now())
    }

    /// Use an existing epoch
    pub fn with_epoch(epoch: Instant) -> Self {
        Self { epoch }
    }

    /// Milliseconds since the epoch, wrapping at 2^32
    pub fn now_ms(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }

    /// Normalize `frame`, stamped with the current time
    pub fn normalize(&self, frame: &RawFrame) -> Option<WireRecord> {
        normalize_at(frame, self.now_ms())
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{EFF_FLAG, ERR_FLAG};
    use proptest::prelude::*;

    #[test]
    fn test_fold_standard_id() {
        assert_eq!(fold_id(0x123), 0x23 ^ 0x01);
        assert_eq!(fold_id(0x7FF), 0xFF ^ 0x07);
    }

    #[test]
    fn test_fold_extended_id() {
        assert_eq!(fold_id(0x18DA_F110), 0x10 ^ 0xF1 ^ 0xDA ^ 0x18);
    }

    #[test]
    fn test_fold_beats_truncation() {
        // Same low byte, different upper bytes
        assert_ne!(fold_id(0x0000_0110), fold_id(0x0000_0210));
    }

    #[test]
    fn test_standard_frame_record() {
        let frame = RawFrame::standard(0x123, &[0xAA, 0xBB]);
        let record = normalize_at(&frame, 42).unwrap();

        assert_eq!(record.timestamp(), 42);
        assert_eq!(record.source_id(), 0x22);
        assert_eq!(record.data(), &[0xAA, 0xBB]);
        assert_eq!(record.payload()[2..], [0u8; 6]);
    }

    #[test]
    fn test_length_clamp() {
        let frame = RawFrame {
            can_id: 0x100,
            len: 12,
            data: [1, 2, 3, 4, 5, 6, 7, 8],
        };
        let record = normalize_at(&frame, 0).unwrap();
        assert_eq!(record.len(), 8);
        assert_eq!(record.data(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_error_frame_dropped() {
        let frame = RawFrame {
            can_id: ERR_FLAG | 0x004,
            len: 8,
            data: [0xFF; 8],
        };
        assert!(normalize_at(&frame, 0).is_none());
    }

    #[test]
    fn test_remote_frame_zero_filled() {
        let mut frame = RawFrame::remote(0x7DF, 3);
        frame.data = [0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 0];

        let record = normalize_at(&frame, 0).unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(record.payload(), &[0u8; 8]);
    }

    #[test]
    fn test_extended_flag_selects_wide_mask() {
        let frame = RawFrame {
            can_id: EFF_FLAG | 0x0100_0000,
            len: 0,
            data: [0; 8],
        };
        assert_eq!(normalize_at(&frame, 0).unwrap().source_id(), 0x01);

        // Same bits without EFF fall outside the 11-bit mask
        let frame = RawFrame {
            can_id: 0x0100_0000,
            len: 0,
            data: [0; 8],
        };
        assert_eq!(normalize_at(&frame, 0).unwrap().source_id(), 0x00);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let normalizer = Normalizer::new();
        let first = normalizer.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(normalizer.now_ms() >= first);
    }

    proptest! {
        #[test]
        fn prop_fold_is_deterministic(id in any::<u32>()) {
            prop_assert_eq!(fold_id(id), fold_id(id));
        }

        #[test]
        fn prop_top_byte_collision_iff_folds_match(
            low in 0u32..0x0100_0000,
            a in 0u8..0x20,
            b in 0u8..0x20,
        ) {
            let id_a = low | (a as u32) << 24;
            let id_b = low | (b as u32) << 24;
            prop_assert_eq!(fold_id(id_a) == fold_id(id_b), a == b);
        }

        #[test]
        fn prop_non_error_frame_yields_one_record(
            id in 0u32..0x2000_0000,
            len in 0u8..=15,
            data in any::<[u8; 8]>(),
        ) {
            let frame = RawFrame { can_id: id | EFF_FLAG, len, data };
            let record = normalize_at(&frame, 0).unwrap();
            prop_assert_eq!(record.len(), (len as usize).min(8));
        }
    }
}
