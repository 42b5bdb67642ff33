//! Firmware image assembly

use crate::crc::calculate_crc32;
use crate::error::{MergeError, Result};
use crate::layout::MemoryLayout;
use crate::metadata::AppMetadata;
use crate::{META_SIZE, PAD_BYTE};

/// Builder for assembling a flashable firmware image
///
/// Lays out the bootloader, the application metadata block and the
/// application at the absolute addresses given by the [`MemoryLayout`],
/// filling every gap with `0xFF`.
///
/// ```rust
/// use fwmerge::{FirmwareMerger, MemoryLayout};
///
/// let image = FirmwareMerger::new(MemoryLayout::default())
///     .bootloader(b"\x01\x02\x03")
///     .application(b"\xAA\xBB")
///     .version(1)
///     .merge()?;
/// # Ok::<(), fwmerge::MergeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FirmwareMerger {
    layout: MemoryLayout,
    bootloader: Vec<u8>,
    application: Vec<u8>,
    version: u32,
}

impl FirmwareMerger {
    /// Create a merger for the given memory map
    pub fn new(layout: MemoryLayout) -> Self {
        Self {
            layout,
            bootloader: Vec::new(),
            application: Vec::new(),
            version: 1,
        }
    }

    /// Set the bootloader image bytes
    pub fn bootloader(mut self, data: &[u8]) -> Self {
        self.bootloader = data.to_vec();
        self
    }

    /// Load the bootloader image from a file
    pub fn bootloader_from_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Result<Self> {
        self.bootloader = std::fs::read(path)?;
        Ok(self)
    }

    /// Set the application image bytes
    pub fn application(mut self, data: &[u8]) -> Self {
        self.application = data.to_vec();
        self
    }

    /// Load the application image from a file
    pub fn application_from_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Result<Self> {
        self.application = std::fs::read(path)?;
        Ok(self)
    }

    /// Set the application metadata version
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Get the memory map the merger was created with
    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// Get the bootloader bytes
    pub fn bootloader_data(&self) -> &[u8] {
        &self.bootloader
    }

    /// Get the application bytes
    pub fn application_data(&self) -> &[u8] {
        &self.application
    }

    /// Get the metadata block the merge will embed
    pub fn metadata(&self) -> AppMetadata {
        AppMetadata::for_application(&self.application, self.version)
    }

    /// Assemble the complete firmware image
    ///
    /// The result starts at `layout.bootloader_base` and is
    /// `application_base + len(application) - bootloader_base` bytes long.
    /// Fails with [`MergeError::RegionOverflow`] if the bootloader or the
    /// metadata block would run past the next region's base address; nothing
    /// is ever truncated or reordered.
    pub fn merge(&self) -> Result<Vec<u8>> {
        self.layout.validate()?;

        let metadata = self.metadata();

        let mut image = self.bootloader.clone();
        self.pad_to(&mut image, "bootloader", "metadata", self.layout.metadata_base)?;

        metadata.write_to(&mut image)?;
        self.pad_to(&mut image, "metadata", "application", self.layout.application_base)?;

        image.extend_from_slice(&self.application);

        Ok(image)
    }

    /// Assemble the image and write it to a file
    pub fn merge_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let image = self.merge()?;
        std::fs::write(path, image)?;
        Ok(())
    }

    /// Pad the image with `0xFF` up to the given absolute address
    fn pad_to(
        &self,
        image: &mut Vec<u8>,
        region: &'static str,
        next: &'static str,
        next_base: u32,
    ) -> Result<()> {
        let end = self.layout.bootloader_base as u64 + image.len() as u64;
        if end > next_base as u64 {
            return Err(MergeError::region_overflow(region, end, next, next_base));
        }
        image.resize((next_base - self.layout.bootloader_base) as usize, PAD_BYTE);
        Ok(())
    }
}

/// Parsed view of an assembled firmware image
///
/// Reads the metadata block back out of an image and checks the application
/// region against it, mirroring what the bootloader does at boot.
#[derive(Debug, Clone, Copy)]
pub struct ImageInfo {
    /// The embedded application metadata block
    pub metadata: AppMetadata,
    /// Total image size in bytes
    pub total_size: usize,
    /// CRC32 recomputed over the application region
    pub calculated_crc32: u32,
}

impl ImageInfo {
    /// Parse an assembled image
    ///
    /// Fails if the image is too short to contain the metadata block or the
    /// application region it describes, or if the magic number is wrong.
    pub fn from_image(image: &[u8], layout: &MemoryLayout) -> Result<Self> {
        layout.validate()?;

        let meta_offset = layout.metadata_offset();
        if image.len() < meta_offset + META_SIZE {
            return Err(MergeError::TruncatedImage {
                len: image.len(),
                expected: meta_offset + META_SIZE,
            });
        }

        let metadata = AppMetadata::from_bytes(&image[meta_offset..meta_offset + META_SIZE])?;

        let app_offset = layout.application_offset();
        let app_end = app_offset + metadata.app_size as usize;
        if image.len() < app_end {
            return Err(MergeError::TruncatedImage {
                len: image.len(),
                expected: app_end,
            });
        }

        Ok(Self {
            metadata,
            total_size: image.len(),
            calculated_crc32: calculate_crc32(&image[app_offset..app_end]),
        })
    }

    /// Check the stored application CRC32 against the recomputed one
    pub fn verify(&self) -> Result<()> {
        if self.metadata.app_crc32 != self.calculated_crc32 {
            return Err(MergeError::crc_mismatch(
                self.metadata.app_crc32,
                self.calculated_crc32,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::META_MAGIC;

    fn small_layout() -> MemoryLayout {
        // Compact map to keep test images small
        MemoryLayout {
            bootloader_base: 0x0800_0000,
            metadata_base: 0x0800_0100,
            metadata_size: META_SIZE as u32,
            application_base: 0x0800_0200,
        }
    }

    #[test]
    fn test_merge_layout() {
        let layout = small_layout();
        let image = FirmwareMerger::new(layout)
            .bootloader(b"BOOTCODE")
            .application(b"APPCODE")
            .version(3)
            .merge()
            .unwrap();

        assert_eq!(image.len(), 0x200 + 7);
        assert_eq!(&image[..8], b"BOOTCODE");
        assert!(image[8..0x100].iter().all(|&b| b == PAD_BYTE));
        assert_eq!(&image[0x100..0x104], &META_MAGIC.to_le_bytes());
        assert!(image[0x130..0x200].iter().all(|&b| b == PAD_BYTE));
        assert_eq!(&image[0x200..], b"APPCODE");
    }

    #[test]
    fn test_merge_embeds_app_crc() {
        let app = b"application payload";
        let image = FirmwareMerger::new(small_layout())
            .bootloader(b"\x01")
            .application(app)
            .merge()
            .unwrap();

        let stored = u32::from_le_bytes(image[0x10C..0x110].try_into().unwrap());
        assert_eq!(stored, calculate_crc32(app));
    }

    #[test]
    fn test_merge_empty_application() {
        let layout = small_layout();
        let image = FirmwareMerger::new(layout)
            .bootloader(b"\x01\x02")
            .application(b"")
            .merge()
            .unwrap();

        assert_eq!(image.len(), layout.application_offset());
        let info = ImageInfo::from_image(&image, &layout).unwrap();
        assert_eq!(info.metadata.app_size, 0);
        assert_eq!(info.metadata.app_crc32, 0x0000_0000);
        assert!(info.verify().is_ok());
    }

    #[test]
    fn test_merge_bootloader_too_large() {
        let result = FirmwareMerger::new(small_layout())
            .bootloader(&[0u8; 0x101])
            .application(b"app")
            .merge();

        assert!(matches!(
            result,
            Err(MergeError::RegionOverflow {
                region: "bootloader",
                ..
            })
        ));
    }

    #[test]
    fn test_merge_bootloader_exactly_fits() {
        let image = FirmwareMerger::new(small_layout())
            .bootloader(&[0xABu8; 0x100])
            .application(b"app")
            .merge()
            .unwrap();

        // No padding before the metadata block
        assert_eq!(image[0xFF], 0xAB);
        assert_eq!(&image[0x100..0x104], &META_MAGIC.to_le_bytes());
    }

    #[test]
    fn test_merge_rejects_invalid_layout() {
        let layout = MemoryLayout {
            metadata_base: 0x0800_01F0,
            ..small_layout()
        };
        let result = FirmwareMerger::new(layout).bootloader(b"x").merge();
        assert!(matches!(result, Err(MergeError::InvalidLayout { .. })));
    }

    #[test]
    fn test_image_info_roundtrip() {
        let layout = small_layout();
        let merger = FirmwareMerger::new(layout)
            .bootloader(b"boot")
            .application(b"the application")
            .version(5);
        let image = merger.merge().unwrap();

        let info = ImageInfo::from_image(&image, &layout).unwrap();
        assert_eq!(info.metadata, merger.metadata());
        assert_eq!(info.total_size, image.len());
        assert!(info.verify().is_ok());
    }

    #[test]
    fn test_image_info_detects_corruption() {
        let layout = small_layout();
        let mut image = FirmwareMerger::new(layout)
            .bootloader(b"boot")
            .application(b"the application")
            .merge()
            .unwrap();

        let app_offset = layout.application_offset();
        image[app_offset] ^= 0xFF;

        let info = ImageInfo::from_image(&image, &layout).unwrap();
        assert!(matches!(
            info.verify(),
            Err(MergeError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_image_info_truncated() {
        let layout = small_layout();
        let image = FirmwareMerger::new(layout)
            .bootloader(b"boot")
            .application(b"app")
            .merge()
            .unwrap();

        assert!(matches!(
            ImageInfo::from_image(&image[..0x80], &layout),
            Err(MergeError::TruncatedImage { .. })
        ));
        assert!(matches!(
            ImageInfo::from_image(&image[..image.len() - 1], &layout),
            Err(MergeError::TruncatedImage { .. })
        ));
    }
}
