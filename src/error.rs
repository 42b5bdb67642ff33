//! Error types for fwmerge

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, MergeError>;

/// Errors that can occur while building or inspecting a firmware image
#[derive(Error, Debug)]
pub enum MergeError {
    /// The memory map constants are internally inconsistent
    #[error("invalid memory layout: {reason}")]
    InvalidLayout { reason: String },

    /// A region's content runs past the next region's fixed base address
    #[error(
        "{region} ends at {end:#010x}, past the {next} base address {next_base:#010x}"
    )]
    RegionOverflow {
        region: &'static str,
        end: u64,
        next: &'static str,
        next_base: u32,
    },

    /// The metadata block does not start with the expected magic number
    #[error("invalid metadata magic: expected {expected:#010x}, found {found:#010x}")]
    InvalidMagic { expected: u32, found: u32 },

    /// An image buffer is too short to contain the region being read
    #[error("image truncated: need {expected} bytes, got {len}")]
    TruncatedImage { len: usize, expected: usize },

    /// The stored application CRC32 does not match the recomputed one
    #[error("CRC32 mismatch: expected {expected:#010x}, calculated {calculated:#010x}")]
    CrcMismatch { expected: u32, calculated: u32 },

    /// I/O error while reading inputs or writing the image
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MergeError {
    /// Create an InvalidLayout error
    pub fn invalid_layout(reason: impl Into<String>) -> Self {
        Self::InvalidLayout {
            reason: reason.into(),
        }
    }

    /// Create a RegionOverflow error
    pub fn region_overflow(region: &'static str, end: u64, next: &'static str, next_base: u32) -> Self {
        Self::RegionOverflow {
            region,
            end,
            next,
            next_base,
        }
    }

    /// Create an InvalidMagic error
    pub fn invalid_magic(expected: u32, found: u32) -> Self {
        Self::InvalidMagic { expected, found }
    }

    /// Create a CrcMismatch error
    pub fn crc_mismatch(expected: u32, calculated: u32) -> Self {
        Self::CrcMismatch {
            expected,
            calculated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MergeError::region_overflow("bootloader", 0x0800_4000, "metadata", 0x0800_3FD0);
        let msg = err.to_string();
        assert!(msg.contains("bootloader"));
        assert!(msg.contains("0x08004000"));
        assert!(msg.contains("0x08003fd0"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MergeError = io_err.into();
        assert!(matches!(err, MergeError::Io(_)));
    }
}
