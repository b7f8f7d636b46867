//! Name and palette hashing.
//!
//! The bundle index keys entries by a 32-bit sdbm hash of their name
//! rather than storing names in the index itself. Palettes are
//! additionally hashed by content so identical palettes across images
//! collapse to a single stored copy.

/// sdbm string hash, matching the hash the bundle's chained-bucket
/// index is built around.
pub fn sdbm_hash(name: &str) -> u32 {
    sdbm_hash_bytes(name.as_bytes())
}

/// sdbm hash over raw bytes, used for content (not name) hashing where
/// the input isn't guaranteed to be valid UTF-8, e.g. string-table
/// values.
pub fn sdbm_hash_bytes(data: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    for &byte in data {
        hash = (byte as u32)
            .wrapping_add(hash.wrapping_shl(6))
            .wrapping_add(hash.wrapping_shl(16))
            .wrapping_sub(hash);
    }
    hash
}

/// LSB mask applied to each RGBA16 palette entry before hashing, unless
/// `preserve_lsb` is set. Masks out the low bits that quantizers use
/// for dithering noise so perceptually-identical palettes dedup.
const PALETTE_LSB_MASK: u16 = 0xFBDE;

/// Hashes a palette's raw RGBA16 entries for dedup purposes.
///
/// When `preserve_lsb` is false (the default), each entry is masked
/// with [`PALETTE_LSB_MASK`] first so palettes differing only in
/// dither noise hash identically.
pub fn palette_hash(entries: &[u16], preserve_lsb: bool) -> u32 {
    let mut hash: u32 = 0;
    for &entry in entries {
        let masked = if preserve_lsb {
            entry
        } else {
            entry & PALETTE_LSB_MASK
        };
        for byte in masked.to_le_bytes() {
            hash = (byte as u32)
                .wrapping_add(hash.wrapping_shl(6))
                .wrapping_add(hash.wrapping_shl(16))
                .wrapping_sub(hash);
        }
    }
    hash
}
