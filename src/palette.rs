//! The palette packer: lays out each image's palette as a strip of
//! entries at the top of a shared palette page, deduping identical
//! palettes by content hash.

use hashbrown::HashMap;

use crate::image::{ImageRecord, PalettePlacement};

/// Result of one palette-packing pass over a set of images.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PalettePackResult {
    /// Rows of the palette strip left unused at the bottom, available
    /// for the next page to be packed into before allocating a new one.
    pub free_height: u32,
    /// How many images had a palette placed this pass.
    pub placed_count: usize,
}

/// Packs every 4bpp/8bpp image's palette into a page `atlas_width`
/// columns wide, starting from the top row and working down, skipping
/// (leaving `Unplaced`) any palette whose `2^bpp` entry width does not
/// fit `atlas_width` — those are retried by the caller once the atlas
/// grows.
///
/// Images sharing an identical palette hash (per [`ImageRecord::palette_hash`])
/// are pointed at the same placement rather than allocating a second
/// copy.
pub fn pack_palettes(
    images: &mut [ImageRecord],
    page: u16,
    atlas_width: u32,
    preserve_lsb: bool,
) -> PalettePackResult {
    let mut seen: HashMap<u32, PalettePlacement> = HashMap::new();
    let mut px: u32 = 0;
    let mut py: isize = 255;
    let mut placed_count = 0usize;

    for img in images.iter_mut() {
        if img.bpp.palette_size() == 0 {
            continue; // 16bpp has no palette to place
        }
        if !matches!(img.palette_placement, PalettePlacement::Unplaced) {
            continue;
        }

        let entries = img.bpp.palette_size() as u32;
        if entries > atlas_width {
            continue; // doesn't fit this atlas width yet; retry after growth
        }
        if py < 0 {
            continue; // page is full; remaining images carry over
        }

        let hash = img.palette_hash(preserve_lsb);
        if let Some(existing) = seen.get(&hash) {
            img.palette_placement = *existing;
            placed_count += 1;
            continue;
        }

        let placement = PalettePlacement::Placed {
            page,
            px,
            py: py as u32,
        };
        img.palette_placement = placement;
        seen.insert(hash, placement);
        placed_count += 1;

        px += entries;
        if px >= atlas_width {
            px %= atlas_width;
            py -= 1;
        }
    }

    // Rows below `py` (0..free_height) are untouched. If `px == 0` the
    // cursor never wrote to row `py` either, so it counts as free too.
    let free_height = if py < 0 {
        0
    } else if px == 0 {
        py as u32 + 1
    } else {
        py as u32
    };

    PalettePackResult {
        free_height,
        placed_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{BitDepth, ImageRecord};

    fn make_4bpp(name: &str, palette: Vec<u16>) -> ImageRecord {
        ImageRecord::new(name, 8, 8, BitDepth::Bpp4, vec![0u8; 64], palette)
    }

    #[test]
    fn places_single_palette_at_origin() {
        let mut images = vec![make_4bpp("a", vec![0u16; 16])];
        let result = pack_palettes(&mut images, 0, 256, false);
        assert_eq!(result.placed_count, 1);
        assert_eq!(
            images[0].palette_placement,
            PalettePlacement::Placed { page: 0, px: 0, py: 255 }
        );
    }

    #[test]
    fn identical_palettes_dedup_to_one_placement() {
        let mut images = vec![
            make_4bpp("a", vec![0x1234u16; 16]),
            make_4bpp("b", vec![0x1234u16; 16]),
        ];
        pack_palettes(&mut images, 0, 256, false);
        assert_eq!(images[0].palette_placement, images[1].palette_placement);
    }

    #[test]
    fn distinct_palettes_advance_cursor() {
        let mut images = vec![
            make_4bpp("a", vec![0x1111u16; 16]),
            make_4bpp("b", vec![0x2222u16; 16]),
        ];
        pack_palettes(&mut images, 0, 256, false);
        let PalettePlacement::Placed { px: px_a, py: py_a, .. } = images[0].palette_placement
        else {
            panic!("expected placement");
        };
        let PalettePlacement::Placed { px: px_b, py: py_b, .. } = images[1].palette_placement
        else {
            panic!("expected placement");
        };
        assert_eq!(py_a, py_b);
        assert_eq!(px_b, px_a + 16);
    }

    #[test]
    fn oversize_palette_skipped_for_narrow_atlas() {
        let mut images = vec![ImageRecord::new(
            "p",
            8,
            8,
            BitDepth::Bpp8,
            vec![0u8; 64],
            vec![0u16; 256],
        )];
        let result = pack_palettes(&mut images, 0, 128, false);
        assert_eq!(result.placed_count, 0);
        assert_eq!(images[0].palette_placement, PalettePlacement::Unplaced);
    }

    #[test]
    fn sixteen_bpp_images_are_skipped() {
        let mut images = vec![ImageRecord::new(
            "hi",
            4,
            4,
            BitDepth::Bpp16,
            vec![0u8; 32],
            vec![],
        )];
        let result = pack_palettes(&mut images, 0, 256, false);
        assert_eq!(result.placed_count, 0);
        assert_eq!(images[0].palette_placement, PalettePlacement::Unplaced);
    }
}
