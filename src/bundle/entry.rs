//! Bundle entry kinds and the per-entry index record.

/// What kind of asset an index entry points to, keyed by a 16-bit tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Opaque bytes, no interpretation by the bundle format itself.
    File,
    /// A progressive texture: header + per-frame records.
    Texture,
    /// An interlaced texture: header + per-frame records, doubled for
    /// even/odd fields.
    InterlacedTexture,
    /// A progressive full-page background image.
    Background,
    /// An interlaced full-page background image.
    InterlacedBackground,
    /// An audio sample header.
    Sound,
    /// A key/value blob from a string table.
    StringTable,
    /// User-defined entry kind; the payload `0x8000 + n` is preserved.
    Custom(u16),
}

impl EntryKind {
    /// The 16-bit tag stored in the index entry.
    pub fn tag(self) -> u16 {
        match self {
            EntryKind::File => 0x0000,
            EntryKind::Texture => 0x0010,
            EntryKind::InterlacedTexture => 0x0011,
            EntryKind::Background => 0x0020,
            EntryKind::InterlacedBackground => 0x0021,
            EntryKind::Sound => 0x0030,
            EntryKind::StringTable => 0x0040,
            EntryKind::Custom(n) => 0x8000 + n,
        }
    }
}

/// One entry in the bundle's name-keyed index: a name hash, a kind tag,
/// and the byte offset/length of its record in the main data section.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Original asset name, kept for duplicate-name diagnostics; not
    /// written to the bundle (the index keys by hash only).
    pub name: String,
    /// sdbm hash of `name`.
    pub name_hash: u32,
    /// Which kind of record this entry points to.
    pub kind: EntryKind,
    /// Byte offset of the record within the main data section.
    pub offset: u32,
    /// Byte length of the record.
    pub length: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_distinct() {
        let tags: Vec<u16> = [
            EntryKind::File,
            EntryKind::Texture,
            EntryKind::InterlacedTexture,
            EntryKind::Background,
            EntryKind::InterlacedBackground,
            EntryKind::Sound,
            EntryKind::StringTable,
            EntryKind::Custom(1),
        ]
        .iter()
        .map(|k| k.tag())
        .collect();
        let mut sorted = tags.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), tags.len());
    }

    #[test]
    fn custom_tags_start_at_0x8000() {
        assert_eq!(EntryKind::Custom(0).tag(), 0x8000);
        assert_eq!(EntryKind::Custom(5).tag(), 0x8005);
    }
}
