//! The atlas builder: drives the palette and image packers across as
//! many pages as needed, growing page width on each pass and grouping
//! images by bit depth so each page holds one coordinate system.
//!
//! Palette and image data for a bucket's page share one [`Atlas`]
//! buffer: the palette strip occupies the bottom rows, the image
//! packer gets whatever rows are left above it. Once every bucket is
//! packed, pages are regrouped by their final column width (256, 192,
//! 128, 64) so that wider-atlas pages occupy contiguous page ranges,
//! per §4.D's bucketing rationale.

use hashbrown::HashMap;
use log::{debug, trace};

use crate::atlas::{Atlas, LEGAL_WIDTHS, PAGE_HEIGHT};
use crate::config::PackerConfig;
use crate::error::{PackError, PackResult};
use crate::image::{BitDepth, ImageRecord, PalettePlacement, Placement};
use crate::packer::pack_images;
use crate::palette::pack_palettes;

/// One fully-packed atlas page: its pixel buffer (palette strip and
/// image data already blitted together) plus the bit depth every image
/// on it shares.
#[derive(Debug)]
pub struct BuiltPage {
    /// The page's backing buffer.
    pub atlas: Atlas,
    /// Bit depth every image on this page shares.
    pub bpp: BitDepth,
}

/// Output of a full packing run: every built page, in final page-index
/// order, plus the per-bucket atlas counts the bundle header records.
#[derive(Debug)]
pub struct BuildOutput {
    /// Texture pages, already reordered into bucket order (256-wide
    /// bucket first, then 192, 128, 64).
    pub pages: Vec<BuiltPage>,
    /// Page counts for the 256/192/128/64-wide buckets, in that order.
    pub atlas_counts: [u8; 4],
}

/// Packs every image in `images` into as few atlas pages as possible.
///
/// Images are grouped by bit depth first (each page is one coordinate
/// system), then packed bucket by bucket. Each bucket repeats: place
/// palettes into the current page's palette strip, place images into
/// the same page's remaining rows, and if anything remains unplaced
/// after a pass makes no progress, either grow the page (up to
/// [`LEGAL_WIDTHS`]'s max) or open a new page. Returns
/// [`PackError::PackingFailed`] if an entire pass places nothing and no
/// further growth is possible. After every bucket is packed, pages are
/// regrouped by final column width and placements remapped to the new
/// page indices.
pub fn build_atlas(images: &mut [ImageRecord], config: &PackerConfig) -> PackResult<BuildOutput> {
    for img in images.iter() {
        if img.width == 0 || img.width > 255 || img.height == 0 || img.height > 255 {
            return Err(PackError::OversizeImage {
                name: img.name.clone(),
                width: img.width,
                height: img.height,
            });
        }
    }

    let mut by_bpp: HashMap<&'static str, Vec<usize>> = HashMap::new();
    for (idx, img) in images.iter().enumerate() {
        let key = match img.bpp {
            BitDepth::Bpp4 => "4",
            BitDepth::Bpp8 => "8",
            BitDepth::Bpp16 => "16",
        };
        by_bpp.entry(key).or_default().push(idx);
    }

    let mut pages = Vec::new();
    let mut next_page: u16 = 0;

    for bpp_key in ["4", "8", "16"] {
        let Some(indices) = by_bpp.get(&bpp_key) else {
            continue;
        };
        let bpp = match bpp_key {
            "4" => BitDepth::Bpp4,
            "8" => BitDepth::Bpp8,
            _ => BitDepth::Bpp16,
        };

        pack_bucket(images, indices, bpp, config, &mut pages, &mut next_page)?;
    }

    let (pages, atlas_counts) = regroup_by_width_bucket(pages, images);
    Ok(BuildOutput { pages, atlas_counts })
}

fn pack_bucket(
    all_images: &mut [ImageRecord],
    indices: &[usize],
    bpp: BitDepth,
    config: &PackerConfig,
    pages: &mut Vec<BuiltPage>,
    next_page: &mut u16,
) -> PackResult<()> {
    let mut remaining: Vec<usize> = indices.to_vec();

    // `LEGAL_WIDTHS` is a shared column scale across all bit depths;
    // each depth only ever uses the prefix of it up to its own maximum
    // page width (256 for 4bpp, 128 for 8bpp, 64 for 16bpp).
    let legal_widths: Vec<u32> = LEGAL_WIDTHS.iter().copied().filter(|&w| w <= bpp.page_width_units()).collect();

    while !remaining.is_empty() {
        let page_id = *next_page;
        *next_page += 1;
        debug!("opening page {page_id} for {}bpp bucket", bpp.bits());

        // An 8bpp palette needs the full 256-entry strip, so its first
        // page starts at the widest legal width immediately rather than
        // growing into it.
        let mut width_idx = if bpp == BitDepth::Bpp8 { legal_widths.len() - 1 } else { 0 };
        let mut width_units = legal_widths[width_idx];

        let mut free_height = PAGE_HEIGHT;
        if bpp != BitDepth::Bpp16 {
            loop {
                let mut subset: Vec<ImageRecord> = remaining.iter().map(|&i| all_images[i].clone()).collect();
                let result = pack_palettes(&mut subset, page_id, width_units, config.preserve_palettes);
                trace!("palette pass width={width_units} placed={}", result.placed_count);
                free_height = result.free_height;

                for (slot, &idx) in remaining.iter().enumerate() {
                    all_images[idx].palette_placement = subset[slot].palette_placement;
                }

                let still_unplaced = remaining
                    .iter()
                    .any(|&i| matches!(all_images[i].palette_placement, PalettePlacement::Unplaced));

                if !still_unplaced || width_idx >= legal_widths.len() - 1 {
                    break;
                }
                width_idx += 1;
                width_units = legal_widths[width_idx];
            }
        }

        // Images must never grow into the palette strip's row space, so
        // the image-packer height is bounded by what the palette pass
        // left free. Width growth is driven entirely by this loop's own
        // `legal_widths` stepping below, so both the starting and
        // maximum width passed to the inner packer are pinned to the
        // current legal width: the inner packer is not free to settle on
        // some arbitrary in-between width that would land in no bucket.
        let image_height = if bpp == BitDepth::Bpp16 { PAGE_HEIGHT } else { free_height };

        let mut progress;
        loop {
            let mut subset: Vec<ImageRecord> = remaining.iter().map(|&i| all_images[i].clone()).collect();
            let before_unplaced = subset.len();

            let result = pack_images(
                &mut subset,
                page_id,
                width_units,
                image_height,
                width_units,
                image_height,
                config.discard_step,
                config.try_splits,
            );
            trace!("image pass width={width_units} packed={}/{}", result.packed, before_unplaced);

            for (slot, &idx) in remaining.iter().enumerate() {
                all_images[idx].placement = subset[slot].placement;
            }

            let newly_unplaced: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&i| matches!(all_images[i].placement, Placement::Unplaced))
                .collect();

            if newly_unplaced.len() == remaining.len() && width_idx >= legal_widths.len() - 1 {
                progress = false;
                break;
            }

            if newly_unplaced.is_empty() {
                progress = true;
                remaining.clear();
                break;
            }

            if newly_unplaced.len() < remaining.len() {
                remaining = newly_unplaced;
                progress = true;
                continue;
            }

            width_idx = (width_idx + 1).min(legal_widths.len() - 1);
            width_units = legal_widths[width_idx];
        }

        if !progress {
            return Err(PackError::PackingFailed {
                remaining_images: remaining.len(),
                remaining_palettes: 0,
            });
        }

        let mut atlas = Atlas::new(width_units);
        for &idx in indices {
            if let PalettePlacement::Placed { page, px, py } = all_images[idx].palette_placement {
                if page == page_id {
                    write_palette_entries(&mut atlas, &all_images[idx].palette, px, py);
                }
            }
        }
        for &idx in indices {
            if matches!(all_images[idx].placement, Placement::Placed { page, .. } if page == page_id) {
                atlas.blit(&all_images[idx]);
            }
        }
        pages.push(BuiltPage { atlas, bpp });
    }

    Ok(())
}

/// Regroups pages by final column width into four buckets (256, 192,
/// 128, 64 columns, in that order), preserving insertion order within
/// each bucket, and remaps every image's `page`/`palette_page` fields
/// to match.
fn regroup_by_width_bucket(pages: Vec<BuiltPage>, images: &mut [ImageRecord]) -> (Vec<BuiltPage>, [u8; 4]) {
    const BUCKET_COLS: [u32; 4] = [256, 192, 128, 64];

    let mut buckets: [Vec<usize>; 4] = Default::default();
    for (old_idx, page) in pages.iter().enumerate() {
        let cols = page.atlas.width_units;
        let bucket = BUCKET_COLS
            .iter()
            .position(|&c| c == cols)
            .expect("atlas width must land on a legal column count");
        buckets[bucket].push(old_idx);
    }

    let mut old_to_new = vec![0u16; pages.len()];
    let mut new_order: Vec<usize> = Vec::with_capacity(pages.len());
    let mut atlas_counts = [0u8; 4];
    for (bucket_idx, old_indices) in buckets.iter().enumerate() {
        atlas_counts[bucket_idx] = old_indices.len() as u8;
        for &old_idx in old_indices {
            old_to_new[old_idx] = new_order.len() as u16;
            new_order.push(old_idx);
        }
    }

    let mut slots: Vec<Option<BuiltPage>> = pages.into_iter().map(Some).collect();
    let new_pages: Vec<BuiltPage> = new_order.iter().map(|&old_idx| slots[old_idx].take().unwrap()).collect();

    for img in images.iter_mut() {
        if let Placement::Placed { page, x, y, orientation } = img.placement {
            img.placement = Placement::Placed { page: old_to_new[page as usize], x, y, orientation };
        }
        if let PalettePlacement::Placed { page, px, py } = img.palette_placement {
            img.palette_placement = PalettePlacement::Placed { page: old_to_new[page as usize], px, py };
        }
    }

    (new_pages, atlas_counts)
}

fn write_palette_entries(atlas: &mut Atlas, palette: &[u16], px: u32, py: u32) {
    let row_start = py as usize * atlas.width_units as usize * 2;
    for (i, &entry) in palette.iter().enumerate() {
        let offset = row_start + (px as usize + i) * 2;
        if offset + 1 < atlas.data.len() {
            let bytes = entry.to_le_bytes();
            atlas.data[offset] = bytes[0];
            atlas.data[offset + 1] = bytes[1];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(name: &str, w: u32, h: u32, bpp: BitDepth) -> ImageRecord {
        let palette_size = bpp.palette_size() as usize;
        ImageRecord::new(
            name,
            w,
            h,
            bpp,
            vec![0u8; (w * h) as usize],
            vec![0u16; palette_size],
        )
    }

    #[test]
    fn single_small_image_packs_into_one_page() {
        let mut images = vec![img("a", 32, 32, BitDepth::Bpp4)];
        let config = PackerConfig::default();
        let output = build_atlas(&mut images, &config).unwrap();
        assert_eq!(output.pages.len(), 1);
        assert!(matches!(images[0].placement, Placement::Placed { .. }));
    }

    #[test]
    fn oversize_dimension_is_rejected() {
        let mut images = vec![img("huge", 300, 10, BitDepth::Bpp8)];
        let config = PackerConfig::default();
        let err = build_atlas(&mut images, &config).unwrap_err();
        assert!(matches!(err, PackError::OversizeImage { .. }));
    }

    #[test]
    fn mixed_bit_depths_land_on_separate_pages() {
        let mut images = vec![
            img("a4", 16, 16, BitDepth::Bpp4),
            img("a8", 16, 16, BitDepth::Bpp8),
        ];
        let config = PackerConfig::default();
        let output = build_atlas(&mut images, &config).unwrap();
        let bpps: Vec<BitDepth> = output.pages.iter().map(|p| p.bpp).collect();
        assert!(bpps.contains(&BitDepth::Bpp4));
        assert!(bpps.contains(&BitDepth::Bpp8));
    }

    #[test]
    fn eight_bit_image_shares_one_atlas_with_its_palette() {
        let mut images = vec![img("backdrop", 64, 64, BitDepth::Bpp8)];
        let config = PackerConfig::default();
        let output = build_atlas(&mut images, &config).unwrap();
        assert_eq!(output.pages.len(), 1);
        let Placement::Placed { page: image_page, .. } = images[0].placement else {
            panic!("expected placement");
        };
        let PalettePlacement::Placed { page: palette_page, .. } = images[0].palette_placement else {
            panic!("expected palette placement");
        };
        assert_eq!(image_page, palette_page);
    }

    #[test]
    fn atlas_counts_reflect_bucket_membership() {
        let mut images = vec![img("backdrop", 128, 128, BitDepth::Bpp8)];
        let config = PackerConfig::default();
        let output = build_atlas(&mut images, &config).unwrap();
        // 8bpp's widest legal page is 128 columns (256 pixels), which
        // lands in the third bucket (256, 192, 128, 64).
        assert_eq!(output.atlas_counts[2], 1);
        assert_eq!(output.atlas_counts[0] + output.atlas_counts[1] + output.atlas_counts[3], 0);
    }

    #[test]
    fn rotation_lets_complementary_images_share_a_128_wide_atlas() {
        let mut tall = img("tall", 100, 200, BitDepth::Bpp4);
        tall.allowed_flips = vec![crate::image::Orientation::Upright, crate::image::Orientation::Rotated90];
        let mut wide = img("wide", 200, 100, BitDepth::Bpp4);
        wide.allowed_flips = vec![crate::image::Orientation::Upright, crate::image::Orientation::Rotated90];
        wide.pixels.fill(1); // distinct content so it doesn't dedup with `tall`

        let mut images = vec![tall, wide];
        let config = PackerConfig::default();
        let output = build_atlas(&mut images, &config).unwrap();
        for img in &images {
            assert!(matches!(img.placement, Placement::Placed { .. }));
        }
        for page in &output.pages {
            assert!(page.atlas.width_units <= 128);
        }
    }
}
