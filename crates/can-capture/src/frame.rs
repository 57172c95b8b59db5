//! Raw CAN Frame

use crate::id::{EFF_FLAG, EFF_MASK, ERR_FLAG, RTR_FLAG, SFF_MASK};

/// Classic CAN frame as delivered by the bus driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawFrame {
    /// Identifier with EFF/RTR/ERR flags in the top three bits
    pub can_id: u32,
    /// Declared data length (may exceed 8 on malformed input)
    pub len: u8,
    /// Data bytes
    pub data: [u8; 8],
}

impl RawFrame {
    /// Standard 11-bit data frame
    pub fn standard(id: u16, data: &[u8]) -> Self {
        Self::with_id(id as u32 & SFF_MASK, data)
    }

    /// Extended 29-bit data frame
    pub fn extended(id: u32, data: &[u8]) -> Self {
        Self::with_id((id & EFF_MASK) | EFF_FLAG, data)
    }

    /// Remote request frame with the given DLC
    pub fn remote(id: u16, dlc: u8) -> Self {
        Self {
            can_id: (id as u32 & SFF_MASK) | RTR_FLAG,
            len: dlc,
            data: [0; 8],
        }
    }

    fn with_id(can_id: u32, data: &[u8]) -> Self {
        let len = data.len().min(8);
        let mut buf = [0u8; 8];
        buf[..len].copy_from_slice(&data[..len]);
        Self {
            can_id,
            len: len as u8,
            data: buf,
        }
    }

    /// Extended frame format
    pub fn is_extended(&self) -> bool {
        self.can_id & EFF_FLAG != 0
    }

    /// Remote transmission request
    pub fn is_remote(&self) -> bool {
        self.can_id & RTR_FLAG != 0
    }

    /// Error message frame
    pub fn is_error(&self) -> bool {
        self.can_id & ERR_FLAG != 0
    }

    /// Identifier with flag bits masked off
    pub fn raw_id(&self) -> u32 {
        if self.is_extended() {
            self.can_id & EFF_MASK
        } else {
            self.can_id & SFF_MASK
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_frame() {
        let frame = RawFrame::standard(0x123, &[0xAA, 0xBB]);
        assert!(!frame.is_extended());
        assert!(!frame.is_remote());
        assert_eq!(frame.raw_id(), 0x123);
        assert_eq!(frame.len, 2);
    }

    #[test]
    fn test_extended_frame_masks_flags() {
        let frame = RawFrame::extended(0x18DA_F110, &[]);
        assert!(frame.is_extended());
        assert_eq!(frame.raw_id(), 0x18DA_F110);
    }

    #[test]
    fn test_standard_mask_drops_high_bits() {
        let frame = RawFrame {
            can_id: 0x0001_0123,
            len: 0,
            data: [0; 8],
        };
        assert_eq!(frame.raw_id(), 0x123);
    }
}
