//! The bundle assembler: collects texture, background, audio, and
//! string-table entries and writes the final sector-aligned binary
//! bundle.
//!
//! Unlike the source material's streaming assembler, this crate builds
//! the whole atlas before any entry payload is serialized, so frame
//! records are written once with their final placement already known —
//! there is no reserve-then-patch pass.

mod entry;
mod frame;
mod header;
mod index;

pub use entry::{EntryKind, IndexEntry};
pub use frame::{FrameFlags, TextureFrame, FRAME_SIZE};
pub use header::{
    BundleHeader, AUDIO_MEMORY_SIZE, MAGIC, MAIN_MEMORY_SIZE, PREAMBLE_SIZE, SECTOR_SIZE,
    TEXTURE_MEMORY_SIZE, VERSION,
};
pub use index::HashIndex;

use byteorder::{LittleEndian, WriteBytesExt};
use hashbrown::HashMap;
use std::io::{self, Write};

use crate::error::{PackError, PackResult, SectionId};
use crate::hash::{sdbm_hash, sdbm_hash_bytes};
use crate::image::ImageRecord;

/// One audio sample's header record, stored in the main data section.
///
/// `rate` is the source sample rate in Hz; the wire header instead
/// stores `round(rate * 4096 / 44100)`, a fixed-point ratio against the
/// console's playback rate, computed at [`BundleAssembler::generate`]
/// time.
#[derive(Debug, Clone)]
pub struct SoundRecord {
    /// Name used for the index entry.
    pub name: String,
    /// Source sample rate, in Hz.
    pub rate: u32,
}

/// A sound's already block-encoded channel data. This crate does not
/// invoke [`crate::external::AdpcmEncoder`] itself, callers do.
#[derive(Debug, Clone)]
pub enum SoundChannels {
    /// Single channel; both the left and right offset fields in the
    /// wire header point at the same region.
    Mono(Vec<u8>),
    /// Two channels stored back-to-back in audio memory, left first.
    Stereo {
        /// Left channel's encoded bytes.
        left: Vec<u8>,
        /// Right channel's encoded bytes. Must be the same length as
        /// `left`.
        right: Vec<u8>,
    },
}

struct TextureRegistration {
    name: String,
    width: u32,
    height: u32,
    frame_count: u16,
    interlaced: bool,
    /// Indices into the shared atlas pool, in frame order. Interlaced
    /// textures contribute two consecutive indices (even, odd) per
    /// logical frame.
    pool_indices: Vec<usize>,
}

struct BackgroundRegistration {
    name: String,
    x: u16,
    y: u16,
    interlaced: bool,
    image: ImageRecord,
}

/// Collects assets and produces the final binary bundle.
///
/// Mirrors the builder-pattern shape of this crate's sibling format
/// writers: methods accumulate state, `generate` does the actual
/// layout and serialization work in one pass.
pub struct BundleAssembler {
    generic_entries: Vec<(String, Vec<u8>, EntryKind)>,
    textures: Vec<TextureRegistration>,
    backgrounds: Vec<BackgroundRegistration>,
    sounds: Vec<(SoundRecord, SoundChannels)>,
    string_tables: Vec<(String, Vec<(String, Vec<u8>)>)>,
    /// Every image awaiting atlas placement, shared across all
    /// registered textures. Backgrounds never enter this pool: they
    /// write their pixels directly into main data instead.
    pool: Vec<ImageRecord>,
    config: crate::config::PackerConfig,
}

impl BundleAssembler {
    /// Creates an empty assembler with the given packer configuration.
    pub fn new(config: crate::config::PackerConfig) -> Self {
        BundleAssembler {
            generic_entries: Vec::new(),
            textures: Vec::new(),
            backgrounds: Vec::new(),
            sounds: Vec::new(),
            string_tables: Vec::new(),
            pool: Vec::new(),
            config,
        }
    }

    /// Registers an opaque entry, written to main data exactly as given.
    /// `kind` determines the tag stored in the index; no interpretation
    /// of `payload` happens here.
    pub fn add_entry(&mut self, name: impl Into<String>, payload: Vec<u8>, kind: EntryKind) {
        self.generic_entries.push((name.into(), payload, kind));
    }

    /// Registers a texture's frames for atlas packing. `frames` are
    /// logical frames in draw order (an animation strip, a tileset,
    /// whatever the caller's single entry groups together); when
    /// `interlaced`, each frame is split into even/odd field images via
    /// [`ImageRecord::to_interlaced_fields`] and both fields are packed.
    pub fn add_texture(&mut self, name: impl Into<String>, frames: Vec<ImageRecord>, interlaced: bool) {
        let width = frames.first().map(|f| f.width).unwrap_or(0);
        let height = frames.first().map(|f| f.height).unwrap_or(0);
        let frame_count = frames.len() as u16;

        let mut pool_indices = Vec::with_capacity(frames.len() * if interlaced { 2 } else { 1 });
        for frame in frames {
            if interlaced {
                let (even, odd) = frame.to_interlaced_fields();
                pool_indices.push(self.pool.len());
                self.pool.push(even);
                pool_indices.push(self.pool.len());
                self.pool.push(odd);
            } else {
                pool_indices.push(self.pool.len());
                self.pool.push(frame);
            }
        }

        self.textures.push(TextureRegistration {
            name: name.into(),
            width,
            height,
            frame_count,
            interlaced,
            pool_indices,
        });
    }

    /// Registers a full-page background image. Unlike textures,
    /// backgrounds never enter the atlas: their pixels are written
    /// directly into main data, raw, at `(x, y)`.
    pub fn add_background(&mut self, name: impl Into<String>, image: ImageRecord, x: u16, y: u16, interlaced: bool) {
        self.backgrounds.push(BackgroundRegistration {
            name: name.into(),
            x,
            y,
            interlaced,
            image,
        });
    }

    /// Registers a pre-encoded ADPCM sound.
    pub fn add_sound(&mut self, record: SoundRecord, channels: SoundChannels) {
        self.sounds.push((record, channels));
    }

    /// Registers a named key/value string table. `entries` is an
    /// ordered list rather than a map: values dedup by content hash
    /// before blob offsets are assigned, but keys keep the insertion
    /// order the caller provides in the table's own nested index.
    pub fn add_string_table(&mut self, name: impl Into<String>, entries: Vec<(String, Vec<u8>)>) {
        self.string_tables.push((name.into(), entries));
    }

    /// Packs every registered asset and serializes the complete bundle.
    pub fn generate<W: Write>(mut self, w: &mut W) -> PackResult<()> {
        let mut all_images = std::mem::take(&mut self.pool);
        let output = crate::atlas_builder::build_atlas(&mut all_images, &self.config)?;

        let mut seen_names: HashMap<u32, String> = HashMap::new();
        let mut entries = Vec::new();
        let mut main_data = Vec::new();

        for (name, payload, kind) in &self.generic_entries {
            push_entry(&mut main_data, &mut seen_names, &mut entries, name, payload, *kind)?;
        }

        for tex in &self.textures {
            let mut payload = Vec::new();
            payload.write_u16::<LittleEndian>(tex.width as u16).map_err(io_as_budget)?;
            payload.write_u16::<LittleEndian>(tex.height as u16).map_err(io_as_budget)?;
            payload.write_u16::<LittleEndian>(tex.frame_count).map_err(io_as_budget)?;
            payload.write_u16::<LittleEndian>(1).map_err(io_as_budget)?; // mip levels: unsupported, always 1

            for &idx in &tex.pool_indices {
                let frame = TextureFrame::from_image(&all_images[idx]);
                frame.write(&mut payload).map_err(io_as_budget)?;
            }

            let kind = if tex.interlaced { EntryKind::InterlacedTexture } else { EntryKind::Texture };
            push_entry(&mut main_data, &mut seen_names, &mut entries, &tex.name, &payload, kind)?;
        }

        for bg in &self.backgrounds {
            let mut payload = Vec::new();
            payload.write_u16::<LittleEndian>(bg.x).map_err(io_as_budget)?;
            payload.write_u16::<LittleEndian>(bg.y).map_err(io_as_budget)?;
            payload.write_u16::<LittleEndian>(bg.image.width as u16).map_err(io_as_budget)?;
            payload.write_u16::<LittleEndian>(bg.image.height as u16).map_err(io_as_budget)?;

            let kind = if bg.interlaced {
                let (even, odd) = bg.image.to_interlaced_fields();
                payload.extend_from_slice(&even.pixels);
                payload.extend_from_slice(&odd.pixels);
                EntryKind::InterlacedBackground
            } else {
                payload.extend_from_slice(&bg.image.pixels);
                EntryKind::Background
            };

            push_entry(&mut main_data, &mut seen_names, &mut entries, &bg.name, &payload, kind)?;
        }

        let mut audio_data = Vec::new();
        for (record, channels) in &self.sounds {
            let left_offset = audio_data.len() as u32;
            let (right_offset, length) = match channels {
                SoundChannels::Mono(data) => {
                    audio_data.extend_from_slice(data);
                    (left_offset, data.len() as u32)
                }
                SoundChannels::Stereo { left, right } => {
                    audio_data.extend_from_slice(left);
                    let right_offset = audio_data.len() as u32;
                    audio_data.extend_from_slice(right);
                    (right_offset, left.len() as u32)
                }
            };
            check_budget(SectionId::Audio, audio_data.len(), AUDIO_MEMORY_SIZE)?;

            let sample_rate = ((record.rate as u64 * 4096 + 22050) / 44100) as u16;
            let mut payload = Vec::new();
            payload.write_u16::<LittleEndian>((left_offset / 8) as u16).map_err(io_as_budget)?;
            payload.write_u16::<LittleEndian>((right_offset / 8) as u16).map_err(io_as_budget)?;
            payload.write_u16::<LittleEndian>((length / 8) as u16).map_err(io_as_budget)?;
            payload.write_u16::<LittleEndian>(sample_rate).map_err(io_as_budget)?;

            push_entry(&mut main_data, &mut seen_names, &mut entries, &record.name, &payload, EntryKind::Sound)?;
        }

        for (table_name, values) in &self.string_tables {
            let mut payload = Vec::new();
            write_string_table(&mut payload, values).map_err(io_as_budget)?;
            push_entry(&mut main_data, &mut seen_names, &mut entries, table_name, &payload, EntryKind::StringTable)?;
        }

        let index = HashIndex::build(entries);
        let mut index_bytes = Vec::new();
        index.write(&mut index_bytes).map_err(io_as_budget)?;

        let mut header_section = vec![0u8; PREAMBLE_SIZE];
        header_section.extend_from_slice(&index_bytes);
        pad_to_sector(&mut header_section);

        let mut texture_section = Vec::new();
        for page in &output.pages {
            texture_section.extend_from_slice(&page.atlas.data);
        }
        check_budget(SectionId::Texture, texture_section.len(), TEXTURE_MEMORY_SIZE)?;
        pad_to_sector(&mut texture_section);

        pad_to_sector(&mut audio_data);
        pad_to_sector(&mut main_data);

        let header = BundleHeader {
            header_length: header_section.len() as u32,
            texture_length: texture_section.len() as u32,
            audio_length: audio_data.len() as u32,
            main_length: main_data.len() as u32,
            atlas_counts: output.atlas_counts,
        };
        let mut preamble = Vec::new();
        header.write(&mut preamble).map_err(io_as_budget)?;
        header_section[0..PREAMBLE_SIZE].copy_from_slice(&preamble);

        w.write_all(&header_section).map_err(io_as_budget)?;
        w.write_all(&texture_section).map_err(io_as_budget)?;
        w.write_all(&audio_data).map_err(io_as_budget)?;
        w.write_all(&main_data).map_err(io_as_budget)?;

        Ok(())
    }
}

/// Appends one index-backed record to main data: registers the name,
/// writes `payload` 4-byte-aligned, and records the resulting
/// `IndexEntry`. Shared by every `add_*` method's `generate`-time write.
fn push_entry(
    main_data: &mut Vec<u8>,
    seen_names: &mut HashMap<u32, String>,
    entries: &mut Vec<IndexEntry>,
    name: &str,
    payload: &[u8],
    kind: EntryKind,
) -> PackResult<()> {
    register_name(seen_names, name)?;
    let offset = main_data.len() as u32;
    main_data.extend_from_slice(payload);
    pad_to_4(main_data);
    check_budget(SectionId::Main, main_data.len(), MAIN_MEMORY_SIZE)?;

    entries.push(IndexEntry {
        name: name.to_string(),
        name_hash: sdbm_hash(name),
        kind,
        offset,
        length: payload.len() as u32,
    });
    Ok(())
}

/// Records `name`'s hash as seen, failing if either the same name was
/// already registered or a distinct name collided with it by sdbm hash
/// — both cases collapse to the same error per this crate's handling
/// of sdbm collisions.
fn register_name(seen: &mut HashMap<u32, String>, name: &str) -> PackResult<()> {
    let hash = sdbm_hash(name);
    if seen.contains_key(&hash) {
        return Err(PackError::DuplicateName { name: name.to_string() });
    }
    seen.insert(hash, name.to_string());
    Ok(())
}

fn check_budget(section: SectionId, len: usize, budget: usize) -> PackResult<()> {
    if len > budget {
        return Err(PackError::BudgetExceeded { section, overage: len - budget });
    }
    Ok(())
}

fn pad_to_sector(buf: &mut Vec<u8>) {
    let target = header::sector_align(buf.len());
    buf.resize(target, 0u8);
}

fn pad_to_4(buf: &mut Vec<u8>) {
    let pad = (4 - (buf.len() % 4)) % 4;
    buf.resize(buf.len() + pad, 0u8);
}

/// Values dedup by content hash before blob offsets are assigned; keys
/// keep the caller's insertion order, since `entries` is an ordered
/// `Vec` rather than a `HashMap`.
fn write_string_table(w: &mut Vec<u8>, values: &[(String, Vec<u8>)]) -> io::Result<()> {
    let mut blob_offsets: HashMap<u32, u32> = HashMap::new();
    let mut blob = Vec::new();
    let mut key_records: Vec<(String, u32, u32)> = Vec::new();

    for (key, value) in values {
        let value_hash = sdbm_hash_bytes(value);
        let offset = *blob_offsets.entry(value_hash).or_insert_with(|| {
            let off = blob.len() as u32;
            blob.extend_from_slice(value);
            off
        });
        key_records.push((key.clone(), offset, value.len() as u32));
    }

    w.write_u32::<LittleEndian>(key_records.len() as u32)?;
    for (key, offset, length) in &key_records {
        w.write_u32::<LittleEndian>(sdbm_hash(key))?;
        w.write_u32::<LittleEndian>(*offset)?;
        w.write_u32::<LittleEndian>(*length)?;
    }
    w.write_u32::<LittleEndian>(blob.len() as u32)?;
    w.write_all(&blob)?;
    Ok(())
}

fn io_as_budget(err: io::Error) -> PackError {
    PackError::BudgetExceeded {
        section: SectionId::Main,
        overage: err.raw_os_error().unwrap_or(0) as usize,
    }
}
