//! An atlas page: a single fixed-height byte buffer that image and
//! palette data is blitted into once placement is decided.

use crate::image::{BitDepth, FieldMode, ImageRecord, Orientation};

/// Height of every atlas page, in pixel rows.
pub const PAGE_HEIGHT: u32 = 256;

/// Legal atlas page widths, in VRAM texel-address columns.
pub const LEGAL_WIDTHS: [u32; 4] = [64, 128, 192, 256];

/// A single texture page's backing store: `width_units * PAGE_HEIGHT`
/// bytes, addressed in the bit depth's native texel units.
#[derive(Debug, Clone)]
pub struct Atlas {
    /// Page width, in texel-address units (already bit-depth-scaled).
    pub width_units: u32,
    /// Raw bytes, row-major, `width_units * PAGE_HEIGHT` long.
    pub data: Vec<u8>,
}

impl Atlas {
    /// Creates a zero-filled atlas page of the given width.
    pub fn new(width_units: u32) -> Self {
        Atlas {
            width_units,
            data: vec![0u8; (width_units * PAGE_HEIGHT) as usize],
        }
    }

    /// Blits `image`'s pixel data into this page at its current
    /// placement. Panics if the image is not yet placed; callers only
    /// call this after the image packer has run.
    pub fn blit(&mut self, image: &ImageRecord) {
        let crate::image::Placement::Placed { x, y, orientation, .. } = image.placement else {
            panic!("blit called on an unplaced image");
        };

        // Rotated-90 swaps which source axis runs along the destination
        // row: the stored span becomes `height` columns wide by `width`
        // rows tall, matching `numpy.rot90`'s shape swap.
        let span = match orientation {
            Orientation::Upright => image.width + 2 * image.padding,
            Orientation::Rotated90 => image.height + 2 * image.padding,
        };
        let rows = match orientation {
            Orientation::Upright => image.height + 2 * image.padding,
            Orientation::Rotated90 => image.width + 2 * image.padding,
        };

        for row_idx in 0..rows {
            let src_row = self.oriented_row(image, row_idx, orientation, span);
            let packed = image.blit_columns(&src_row);

            let dest_y = match image.field_mode {
                FieldMode::Progressive => y + row_idx,
                FieldMode::InterlacedEven => y + row_idx * 2,
                FieldMode::InterlacedOdd => y + row_idx * 2,
            };
            let dest_x_start = (x % self.width_units) as usize;
            let row_start = dest_y as usize * self.width_units as usize;

            for (i, byte) in packed.iter().enumerate() {
                let dest = row_start + dest_x_start + i;
                if dest < self.data.len() {
                    self.data[dest] = *byte;
                }
            }
        }
    }

    /// Produces one padded, oriented source row for blitting.
    ///
    /// For [`Orientation::Upright`] this is simply the raw pixel row (or
    /// zero padding) with the padding border applied. For
    /// [`Orientation::Rotated90`] the row is read as a *column* of the
    /// un-rotated image, matching `numpy.rot90`'s mapping
    /// `rotated[i, j] = source[j, width - 1 - i]`: destination row `i`
    /// (here `padded_row`) pulls source column `width - 1 - i`, top to
    /// bottom, which after padding is prepended only on the left of the
    /// row per the source material's `getPackedData`.
    fn oriented_row(&self, image: &ImageRecord, padded_row: u32, orientation: Orientation, span: u32) -> Vec<u8> {
        match orientation {
            Orientation::Upright => {
                if padded_row < image.padding || padded_row >= image.padding + image.height {
                    return vec![0u8; span as usize];
                }
                let inner_row = padded_row - image.padding;
                let start = (inner_row * image.width) as usize;
                let end = start + image.width as usize;
                let row = &image.pixels[start..end];

                let mut padded = vec![0u8; span as usize];
                let offset = image.padding as usize;
                padded[offset..offset + row.len()].copy_from_slice(row);
                padded
            }
            Orientation::Rotated90 => {
                if padded_row < image.padding || padded_row >= image.padding + image.width {
                    return vec![0u8; span as usize];
                }
                let src_col = image.width - 1 - (padded_row - image.padding);
                let mut row = Vec::with_capacity(image.height as usize);
                for src_row in 0..image.height {
                    let idx = (src_row * image.width + src_col) as usize;
                    row.push(image.pixels[idx]);
                }

                let mut padded = vec![0u8; span as usize];
                let offset = image.padding as usize;
                padded[offset..offset + row.len()].copy_from_slice(&row);
                padded
            }
        }
    }

    /// Number of texel-address columns an image at `bpp` occupies per
    /// source pixel column, used by callers computing page capacity.
    pub fn columns_per_pixel(bpp: BitDepth) -> u32 {
        bpp.texels_per_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImageRecord, Placement};

    #[test]
    fn blit_writes_pixels_at_placement() {
        let mut img = ImageRecord::new(
            "a",
            2,
            2,
            BitDepth::Bpp8,
            vec![1, 2, 3, 4],
            vec![0u16; 256],
        );
        img.placement = Placement::Placed { page: 0, x: 4, y: 4, orientation: Orientation::Upright };

        let mut atlas = Atlas::new(128);
        atlas.blit(&img);

        let row0 = 4usize * 128 + 4;
        assert_eq!(atlas.data[row0], 1);
        assert_eq!(atlas.data[row0 + 1], 2);
        let row1 = 5usize * 128 + 4;
        assert_eq!(atlas.data[row1], 3);
        assert_eq!(atlas.data[row1 + 1], 4);
    }

    #[test]
    fn rotated_blit_transposes_columns_into_rows() {
        // 2x3 image (width=2, height=3):
        //  1 2
        //  3 4
        //  5 6
        // numpy.rot90 of this (CCW) is a 3x2 array:
        //  2 4 6
        //  1 3 5
        let mut img = ImageRecord::new(
            "a",
            2,
            3,
            BitDepth::Bpp8,
            vec![1, 2, 3, 4, 5, 6],
            vec![0u16; 256],
        );
        img.placement = Placement::Placed { page: 0, x: 0, y: 0, orientation: Orientation::Rotated90 };

        let mut atlas = Atlas::new(64);
        atlas.blit(&img);

        assert_eq!(&atlas.data[0..3], &[2, 4, 6]);
        assert_eq!(&atlas.data[64..67], &[1, 3, 5]);
    }

    #[test]
    fn legal_widths_are_multiples_of_64() {
        for w in LEGAL_WIDTHS {
            assert_eq!(w % 64, 0);
        }
    }
}
