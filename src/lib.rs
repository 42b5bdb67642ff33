//! # fwmerge
//!
//! A tool for merging a bootloader and an application binary into a single
//! flashable firmware image.
//!
//! The bootloader is placed at the start of flash, a fixed-size metadata
//! block describing the application (magic, version, size, CRC32) is placed
//! at a fixed address just below the application, and every gap is filled
//! with `0xFF` so the image can be written byte-for-byte starting at the
//! bootloader's base address.
//!
//! ## Example
//!
//! ```rust
//! use fwmerge::{FirmwareMerger, MemoryLayout};
//!
//! let layout = MemoryLayout::default();
//! let image = FirmwareMerger::new(layout)
//!     .bootloader(b"\x01\x02\x03")
//!     .application(b"\xAA\xBB")
//!     .version(1)
//!     .merge()?;
//!
//! assert_eq!(image.len(), 0x4002);
//! # Ok::<(), fwmerge::MergeError>(())
//! ```

pub mod cli;
pub mod crc;
pub mod error;
pub mod layout;
pub mod merger;
pub mod metadata;

// Re-export main types for convenience
pub use crc::calculate_crc32;
pub use error::{MergeError, Result};
pub use layout::MemoryLayout;
pub use merger::{FirmwareMerger, ImageInfo};
pub use metadata::AppMetadata;

/// Current version of the fwmerge implementation
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Magic number marking the application metadata block ("BOOT")
pub const META_MAGIC: u32 = 0x424F4F54;

/// Total size of the application metadata block in bytes
pub const META_SIZE: usize = 0x30;

/// Filler value for unoccupied flash, matching the erased state of the part
pub const PAD_BYTE: u8 = 0xFF;
