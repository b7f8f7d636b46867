//! Error types for the asset packing core.
//!
//! Modeled on this crate's format-library lineage: a plain enum with a
//! hand-written [`std::fmt::Display`] impl rather than a derive macro,
//! since every failure here is fatal to the current build and the
//! caller only ever needs to print it or match on the kind.

use std::fmt;

/// A section of the bundle with a fixed byte budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionId {
    /// Main data section (per-entry records).
    Main,
    /// Texture memory image (concatenated texture pages).
    Texture,
    /// Audio memory image (concatenated ADPCM blocks).
    Audio,
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SectionId::Main => "main",
            SectionId::Texture => "texture",
            SectionId::Audio => "audio",
        };
        f.write_str(name)
    }
}

/// Errors raised by the packing core. All are fatal to the current build.
#[derive(Debug)]
pub enum PackError {
    /// An image's inner dimension exceeds 255 pixels on an axis.
    OversizeImage {
        /// Asset name being packed when the error was raised.
        name: String,
        /// Offending width in pixels.
        width: u32,
        /// Offending height in pixels.
        height: u32,
    },
    /// A section's byte budget would be exceeded.
    BudgetExceeded {
        /// The section that overflowed.
        section: SectionId,
        /// Bytes by which the budget was exceeded.
        overage: usize,
    },
    /// Two distinct names hashed to the same 32-bit name hash, or the same
    /// name was registered twice.
    DuplicateName {
        /// The colliding name.
        name: String,
    },
    /// The atlas builder made zero progress in one iteration: neither an
    /// image nor a palette could be placed, even with flipping.
    PackingFailed {
        /// Number of images still unplaced when the failure was detected.
        remaining_images: usize,
        /// Number of palettes still unplaced when the failure was detected.
        remaining_palettes: usize,
    },
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackError::OversizeImage {
                name,
                width,
                height,
            } => write!(
                f,
                "image '{name}' is {width}x{height}, exceeding the 255x255 limit per axis"
            ),
            PackError::BudgetExceeded { section, overage } => {
                write!(f, "{section} section exceeded its budget by {overage} bytes")
            }
            PackError::DuplicateName { name } => write!(f, "duplicate entry name: '{name}'"),
            PackError::PackingFailed {
                remaining_images,
                remaining_palettes,
            } => write!(
                f,
                "packing failed: {remaining_images} image(s) and {remaining_palettes} palette(s) \
                 could not be placed in any atlas"
            ),
        }
    }
}

impl std::error::Error for PackError {}

/// Convenience alias used throughout the crate.
pub type PackResult<T> = Result<T, PackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_are_human_readable() {
        let err = PackError::OversizeImage {
            name: "sprite".into(),
            width: 300,
            height: 10,
        };
        assert!(err.to_string().contains("sprite"));

        let err = PackError::BudgetExceeded {
            section: SectionId::Audio,
            overage: 128,
        };
        assert_eq!(err.to_string(), "audio section exceeded its budget by 128 bytes");
    }
}
