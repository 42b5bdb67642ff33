//! Target memory map configuration

use crate::META_SIZE;
use crate::error::{MergeError, Result};

/// Absolute addresses of the three image regions
///
/// The map is a property of the target hardware and its bootloader: the
/// bootloader occupies the start of flash, the application metadata block
/// sits at a fixed address just below the application, and the application
/// starts on the next flash page. All addresses are absolute; byte offset
/// `i` in the produced image corresponds to address `bootloader_base + i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    /// Start of the bootloader region (start of flash)
    pub bootloader_base: u32,
    /// Start of the application metadata block
    pub metadata_base: u32,
    /// Size of the metadata block in bytes
    pub metadata_size: u32,
    /// Start of the application region
    pub application_base: u32,
}

impl MemoryLayout {
    /// Reference map for the STM32F1 target: 16 KiB bootloader region, the
    /// 48-byte metadata block at the end of it, application at 0x08004000.
    pub const STM32F1: Self = Self {
        bootloader_base: 0x0800_0000,
        metadata_base: 0x0800_3FD0,
        metadata_size: META_SIZE as u32,
        application_base: 0x0800_4000,
    };

    /// Validate the map
    ///
    /// The regions must be in ascending address order with no overlap, and
    /// the metadata block must have the fixed size the bootloader expects.
    pub fn validate(&self) -> Result<()> {
        if self.metadata_size != META_SIZE as u32 {
            return Err(MergeError::invalid_layout(format!(
                "metadata size must be {} bytes, got {}",
                META_SIZE, self.metadata_size
            )));
        }

        if self.bootloader_base >= self.metadata_base {
            return Err(MergeError::invalid_layout(format!(
                "bootloader base {:#010x} must be below metadata base {:#010x}",
                self.bootloader_base, self.metadata_base
            )));
        }

        let metadata_end = self.metadata_base as u64 + self.metadata_size as u64;
        if metadata_end > self.application_base as u64 {
            return Err(MergeError::invalid_layout(format!(
                "metadata block ends at {:#010x}, past application base {:#010x}",
                metadata_end, self.application_base
            )));
        }

        Ok(())
    }

    /// Maximum bootloader size the map can accommodate
    pub fn bootloader_capacity(&self) -> u32 {
        self.metadata_base - self.bootloader_base
    }

    /// Offset of the metadata block from the start of the image
    pub fn metadata_offset(&self) -> usize {
        (self.metadata_base - self.bootloader_base) as usize
    }

    /// Offset of the application from the start of the image
    pub fn application_offset(&self) -> usize {
        (self.application_base - self.bootloader_base) as usize
    }
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self::STM32F1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_valid() {
        let layout = MemoryLayout::default();
        assert!(layout.validate().is_ok());
        assert_eq!(layout.bootloader_capacity(), 0x3FD0);
        assert_eq!(layout.metadata_offset(), 0x3FD0);
        assert_eq!(layout.application_offset(), 0x4000);
    }

    #[test]
    fn test_layout_wrong_metadata_size() {
        let layout = MemoryLayout {
            metadata_size: 0x20,
            ..MemoryLayout::default()
        };
        assert!(matches!(
            layout.validate(),
            Err(MergeError::InvalidLayout { .. })
        ));
    }

    #[test]
    fn test_layout_metadata_overlaps_application() {
        let layout = MemoryLayout {
            metadata_base: 0x0800_3FF0,
            ..MemoryLayout::default()
        };
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_layout_bootloader_above_metadata() {
        let layout = MemoryLayout {
            bootloader_base: 0x0800_4000,
            ..MemoryLayout::default()
        };
        assert!(layout.validate().is_err());
    }
}
