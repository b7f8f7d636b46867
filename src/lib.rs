//! fudgepack: texture atlas packer and bundle assembler for
//! fixed-function console asset bundles.
//!
//! This crate converts indexed-color sprite images, pre-encoded audio
//! samples, and key/value string tables into a single binary asset
//! bundle sized for a console with 1 MB of texture memory, 512 KB of
//! audio memory (reserving headroom, see [`bundle::AUDIO_MEMORY_SIZE`]),
//! and roughly 1.5 MB of main memory. Two subsystems do the real work:
//!
//! - [`packer`] and [`palette`]: a guillotine free-rectangle bin
//!   packer that lays out image footprints and their palettes onto
//!   fixed-width atlas pages, deduping identical pixel/palette content.
//! - [`bundle`]: assembles packed pages, sound headers, and string
//!   tables into the final sector-aligned binary, keyed by a
//!   power-of-two chained-bucket name hash index.
//!
//! Image decode, color quantization, ADPCM block encoding, audio
//! resampling, and atlas metadata parsing are all out of scope; their
//! contracts are expressed as the traits in [`external`] so this
//! crate's core can be driven and tested without those subsystems
//! existing.
//!
//! # Usage
//!
//! ```ignore
//! use fudgepack::{BundleAssembler, ImageRecord, BitDepth, PackerConfig};
//!
//! let mut assembler = BundleAssembler::new(PackerConfig::default());
//! let frame = ImageRecord::new("player", 32, 32, BitDepth::Bpp8, pixels, palette);
//! assembler.add_texture("player", vec![frame], false);
//!
//! let mut out = Vec::new();
//! assembler.generate(&mut out)?;
//! # Ok::<(), fudgepack::PackError>(())
//! ```

mod atlas;
mod atlas_builder;
mod bundle;
mod config;
mod error;
mod external;
mod hash;
mod image;
mod packer;
mod palette;

pub use atlas::{Atlas, LEGAL_WIDTHS, PAGE_HEIGHT};
pub use atlas_builder::{build_atlas, BuildOutput, BuiltPage};
pub use bundle::{
    BundleAssembler, BundleHeader, EntryKind, FrameFlags, HashIndex, IndexEntry, SoundChannels,
    SoundRecord, TextureFrame, AUDIO_MEMORY_SIZE, FRAME_SIZE, MAGIC, MAIN_MEMORY_SIZE,
    PREAMBLE_SIZE, SECTOR_SIZE, TEXTURE_MEMORY_SIZE, VERSION,
};
pub use config::PackerConfig;
pub use error::{PackError, PackResult, SectionId};
pub use external::{AdpcmEncoder, AudioResampler, ImageSource, Quantizer};
pub use hash::{palette_hash, sdbm_hash, sdbm_hash_bytes};
pub use image::{BitDepth, FieldMode, ImageRecord, Orientation, PalettePlacement, Placement};
pub use packer::{attempt_pack, pack_images, AttemptResult, FreeRect, SortKey};
pub use palette::{pack_palettes, PalettePackResult};

#[cfg(any(test, feature = "testing"))]
pub use external::testing::ReferenceAdpcmEncoder;
