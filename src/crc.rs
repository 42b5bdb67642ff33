//! CRC32 calculation (CRC-32/ISO-HDLC)
//!
//! The bootloader recomputes this checksum over the application region at
//! boot, so the table must match the standard reflected CRC-32 exactly:
//! polynomial `0xEDB88320`, initial value `0xFFFFFFFF`, final XOR
//! `0xFFFFFFFF`.

/// Reflected CRC-32 polynomial
const CRC32_POLY: u32 = 0xEDB8_8320;

/// Precomputed lookup table, one entry per input byte value
static CRC32_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC32_POLY
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Incremental CRC32 state
///
/// Useful when the input arrives in chunks; [`calculate_crc32`] covers the
/// common single-buffer case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    /// Create a fresh CRC32 state
    pub fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    /// Feed bytes into the checksum
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            let index = ((self.state ^ byte as u32) & 0xFF) as usize;
            self.state = CRC32_TABLE[index] ^ (self.state >> 8);
        }
    }

    /// Finish the computation and return the checksum
    pub fn finalize(self) -> u32 {
        !self.state
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculate the CRC32 of a byte buffer
///
/// Deterministic and total: any input is accepted, and the empty buffer
/// yields `0x00000000`.
pub fn calculate_crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finalize()
}
