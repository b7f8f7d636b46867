//! Packer configuration.
//!
//! A plain typed struct rather than a dictionary of options: unknown-key
//! rejection and file parsing are a caller concern (manifest/TOML
//! layers sit above this crate), so the packing core only ever sees
//! already-validated values.

/// Tunables for the atlas builder and image packer search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackerConfig {
    /// Step size (in atlas columns/rows) below which the shrink/grow
    /// search gives up refining further and accepts its best candidate.
    pub discard_step: u32,
    /// When true, the image packer also tries the alternate ("alt")
    /// split axis at every placement, doubling search cost.
    pub try_splits: bool,
    /// When true, palette hashing preserves the low bits of each RGBA16
    /// entry instead of masking them out before hashing, so palettes
    /// that differ only in dither noise are kept distinct.
    pub preserve_palettes: bool,
}

impl Default for PackerConfig {
    fn default() -> Self {
        PackerConfig {
            discard_step: 1,
            try_splits: false,
            preserve_palettes: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = PackerConfig::default();
        assert_eq!(cfg.discard_step, 1);
        assert!(!cfg.try_splits);
        assert!(!cfg.preserve_palettes);
    }
}
