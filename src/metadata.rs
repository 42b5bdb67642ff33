//! Application metadata block serialization
//!
//! The bootloader locates this block at a fixed flash address and uses it to
//! decide whether a valid application is present: it checks the magic, then
//! recomputes the CRC32 over `app_size` bytes of the application region and
//! compares it with `app_crc32`.

use crate::crc::calculate_crc32;
use crate::error::{MergeError, Result};
use crate::{META_MAGIC, META_SIZE, PAD_BYTE};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Write;

/// Application metadata block
///
/// Serialized as four little-endian `u32` fields in declaration order,
/// followed by `0xFF` filler up to the fixed 48-byte block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppMetadata {
    /// Magic number (must be META_MAGIC, "BOOT")
    pub magic: u32,
    /// Application metadata format version
    pub version: u32,
    /// Application size in bytes
    pub app_size: u32,
    /// CRC32 of the application image
    pub app_crc32: u32,
}

impl AppMetadata {
    /// Create a metadata block describing the given application buffer
    ///
    /// Any 32-bit `version` is accepted here; the CLI rejects 0 before it
    /// reaches this point.
    pub fn for_application(app: &[u8], version: u32) -> Self {
        Self {
            magic: META_MAGIC,
            version,
            app_size: app.len() as u32,
            app_crc32: calculate_crc32(app),
        }
    }

    /// Serialize the block to bytes
    ///
    /// Returns exactly [`META_SIZE`] bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(META_SIZE);
        buffer.extend_from_slice(&self.magic.to_le_bytes());
        buffer.extend_from_slice(&self.version.to_le_bytes());
        buffer.extend_from_slice(&self.app_size.to_le_bytes());
        buffer.extend_from_slice(&self.app_crc32.to_le_bytes());
        buffer.resize(META_SIZE, PAD_BYTE);
        buffer
    }

    /// Write the block to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.magic)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.app_size)?;
        writer.write_u32::<LittleEndian>(self.app_crc32)?;

        // Fill the rest of the block with the erased-flash value
        writer.write_all(&[PAD_BYTE; META_SIZE - 16])?;

        Ok(())
    }

    /// Deserialize a metadata block from bytes
    ///
    /// Checks the magic number so a reader can reject a region that does not
    /// hold a metadata block before trusting the other fields.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < META_SIZE {
            return Err(MergeError::TruncatedImage {
                len: data.len(),
                expected: META_SIZE,
            });
        }

        let mut cursor = std::io::Cursor::new(data);
        let magic = cursor.read_u32::<LittleEndian>()?;
        if magic != META_MAGIC {
            return Err(MergeError::invalid_magic(META_MAGIC, magic));
        }

        let version = cursor.read_u32::<LittleEndian>()?;
        let app_size = cursor.read_u32::<LittleEndian>()?;
        let app_crc32 = cursor.read_u32::<LittleEndian>()?;

        Ok(Self {
            magic,
            version,
            app_size,
            app_crc32,
        })
    }
}
