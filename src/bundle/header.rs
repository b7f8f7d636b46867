//! The bundle's outer header: magic, version, section sizes, atlas
//! bucket counts, and sector alignment bookkeeping.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

/// Magic bytes identifying a fudgepack bundle.
pub const MAGIC: &[u8; 7] = b"fudgebn";

/// Bundle format version, stored at offset 0x07 right after the magic.
pub const VERSION: u8 = 0x02;

/// Size of the fixed preamble: 7-byte magic + 1-byte version + four
/// `u32` section lengths + four `u8` atlas bucket counts.
pub const PREAMBLE_SIZE: usize = 7 + 1 + 4 * 4 + 4;

/// Every section is padded out to a multiple of this many bytes.
pub const SECTOR_SIZE: usize = 2048;

/// Texture memory budget, in bytes.
pub const TEXTURE_MEMORY_SIZE: usize = 1024 * 1024;

/// Audio memory budget, in bytes.
///
/// `0x7D000`, not the `0x7A000` figure that appears in an older
/// revision of the source material; the SPU reserves the final 3
/// sectors below 0x80000 for its own use and the newer constant is the
/// one the current builder enforces.
pub const AUDIO_MEMORY_SIZE: usize = 0x7D000;

/// Main data memory budget, in bytes.
pub const MAIN_MEMORY_SIZE: usize = 1536 * 1024;

/// Rounds `len` up to the next multiple of [`SECTOR_SIZE`].
pub fn sector_align(len: usize) -> usize {
    len.div_ceil(SECTOR_SIZE) * SECTOR_SIZE
}

/// The bundle's fixed-size outer preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleHeader {
    /// Sector-aligned length of the header section (preamble + index).
    pub header_length: u32,
    /// Sector-aligned length of the texture memory section.
    pub texture_length: u32,
    /// Sector-aligned length of the audio memory section.
    pub audio_length: u32,
    /// Sector-aligned length of the main data section.
    pub main_length: u32,
    /// Atlas page counts for the 256/192/128/64-wide buckets, in that
    /// order.
    pub atlas_counts: [u8; 4],
}

impl BundleHeader {
    /// Serializes the preamble: magic, version, four `u32` section
    /// lengths, then four `u8` atlas bucket counts, all little-endian.
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(MAGIC)?;
        w.write_u8(VERSION)?;
        w.write_u32::<LittleEndian>(self.header_length)?;
        w.write_u32::<LittleEndian>(self.texture_length)?;
        w.write_u32::<LittleEndian>(self.audio_length)?;
        w.write_u32::<LittleEndian>(self.main_length)?;
        w.write_all(&self.atlas_counts)?;
        Ok(())
    }
}
