//! The image record: an indexed-color sprite awaiting placement in a
//! texture atlas, plus its associated palette.

use crate::hash::palette_hash;

/// Bits per pixel for an indexed image. Only these three depths exist
/// on the target console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    /// 16 colors per palette, 2 pixels per byte.
    Bpp4,
    /// 256 colors per palette, 1 pixel per byte.
    Bpp8,
    /// Direct 16-bit color, no palette.
    Bpp16,
}

impl BitDepth {
    /// Raw bit count.
    pub fn bits(self) -> u32 {
        match self {
            BitDepth::Bpp4 => 4,
            BitDepth::Bpp8 => 8,
            BitDepth::Bpp16 => 16,
        }
    }

    /// How many texels fit in one VRAM addressing unit at this depth.
    /// `16 / bpp`: 4 at 4bpp, 2 at 8bpp, 1 at 16bpp.
    pub fn texels_per_unit(self) -> u32 {
        16 / self.bits()
    }

    /// Atlas page width, in VRAM columns, at this depth: the page is
    /// always 64 atlas-columns wide in texel-unit terms, i.e.
    /// `64 * texels_per_unit`.
    pub fn page_width_units(self) -> u32 {
        64 * self.texels_per_unit()
    }

    /// Palette size in entries (0 for 16bpp, which has no palette).
    pub fn palette_size(self) -> u16 {
        match self {
            BitDepth::Bpp4 => 16,
            BitDepth::Bpp8 => 256,
            BitDepth::Bpp16 => 0,
        }
    }
}

/// Orientations an image may be placed under, tried in the order they
/// appear in [`ImageRecord::allowed_flips`] — the first orientation
/// that yields any valid placement wins, with no cross-orientation
/// slack comparison. Order expresses caller preference, not a ranking
/// the packer optimizes.
///
/// This is *not* a mirror flip: the console's GPU has no mirror-sample
/// mode, only a 90-degree rotated upload path, so the only two legal
/// orientations are stored-as-authored and rotated 90 degrees
/// counter-clockwise (matching `numpy.rot90` in the source material).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Stored as authored.
    Upright,
    /// Rotated 90 degrees counter-clockwise before blitting; width and
    /// height swap roles for footprint and page-containment purposes.
    Rotated90,
}

/// How an image's field (interlace) lines are stored, mirroring the
/// console's interlaced texture upload mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// Progressive, all rows stored contiguously.
    Progressive,
    /// Interlaced: this record holds only the even-numbered source rows.
    InterlacedEven,
    /// Interlaced: this record holds only the odd-numbered source rows.
    InterlacedOdd,
}

/// Where an image has landed in the texture atlas, if anywhere yet.
///
/// Modeled as an explicit state machine rather than a set of
/// `Option<T>` fields that could individually be Some/None in
/// inconsistent combinations — this restates the original's
/// mutable-object late-binding (an image object whose placement
/// fields start unset and are filled in once the packer visits it) as
/// a type Rust can check at compile time instead of at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Not yet placed in any atlas page.
    Unplaced,
    /// Placed at `(x, y)` in VRAM texel-unit coordinates on `page`,
    /// under the given orientation.
    Placed {
        /// Atlas page index.
        page: u16,
        /// X coordinate, in this image's bit depth's texel units.
        x: u32,
        /// Y coordinate, in pixels.
        y: u32,
        /// Orientation under which this placement was found.
        orientation: Orientation,
    },
}

/// Where an image's palette has landed in the palette strip, if
/// anywhere yet. Kept separate from [`Placement`] because palette and
/// pixel data are placed independently and an image can have one
/// without the other at any point during packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalettePlacement {
    /// Not yet placed.
    Unplaced,
    /// Placed at `(px, py)` in the palette strip on `page`.
    Placed {
        /// Palette atlas page index.
        page: u16,
        /// X coordinate, in palette-strip units.
        px: u32,
        /// Y coordinate (row), in the palette strip.
        py: u32,
    },
}

/// An indexed-color image awaiting atlas placement.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Asset name, used for the bundle index and error messages.
    pub name: String,
    /// Inner width in pixels (excludes padding). Must be 1..=255.
    pub width: u32,
    /// Inner height in pixels (excludes padding). Must be 1..=255.
    pub height: u32,
    /// Bit depth, which fixes both the texel packing and palette size.
    pub bpp: BitDepth,
    /// Padding pixels added on every side to avoid texture bleeding.
    pub padding: u32,
    /// Cropped empty border, in pixels, to be restored at draw time:
    /// `(margin_x, margin_y)`. Not part of the stored footprint.
    pub margin: (u32, u32),
    /// Orientations to try, in preference order.
    pub allowed_flips: Vec<Orientation>,
    /// Interlace mode for this image's rows.
    pub field_mode: FieldMode,
    /// Indexed pixel data, row-major, one byte per pixel regardless of
    /// bpp (sub-byte packing happens at blit time).
    pub pixels: Vec<u8>,
    /// Palette entries as raw RGBA16 values.
    pub palette: Vec<u16>,
    /// Pixel placement, filled in by the image packer.
    pub placement: Placement,
    /// Palette placement, filled in by the palette packer.
    pub palette_placement: PalettePlacement,
}

impl ImageRecord {
    /// Creates a new, unplaced image record.
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        bpp: BitDepth,
        pixels: Vec<u8>,
        palette: Vec<u16>,
    ) -> Self {
        ImageRecord {
            name: name.into(),
            width,
            height,
            bpp,
            padding: 0,
            margin: (0, 0),
            allowed_flips: vec![Orientation::Upright],
            field_mode: FieldMode::Progressive,
            pixels,
            palette,
            placement: Placement::Unplaced,
            palette_placement: PalettePlacement::Unplaced,
        }
    }

    /// Builds an indexed image record from a decoded RGBA source by
    /// running it through a quantizer. The shape `ImageSource` and
    /// `Quantizer` implementations feed: decode stays entirely out of
    /// scope, this just wires the two traits into one `ImageRecord`.
    pub fn from_rgba(
        name: impl Into<String>,
        source: &dyn crate::external::ImageSource,
        quantizer: &mut dyn crate::external::Quantizer,
        bpp: BitDepth,
    ) -> Self {
        let width = source.width();
        let height = source.height();
        let (palette, pixels) = quantizer.quantize(source.rgba(), width, height, bpp.palette_size());
        ImageRecord::new(name, width, height, bpp, pixels, palette)
    }

    /// Splits this image's rows into two half-height field images, even
    /// rows and odd rows respectively, for interlaced storage. Mirrors
    /// the source's `toInterlaced`: each field keeps this image's width,
    /// padding, margin, and allowed orientations, differing only in
    /// pixel content, height, and `field_mode`.
    pub fn to_interlaced_fields(&self) -> (ImageRecord, ImageRecord) {
        let width = self.width;
        let even_height = self.height.div_ceil(2);
        let odd_height = self.height / 2;

        let mut even_pixels = Vec::with_capacity((width * even_height) as usize);
        let mut odd_pixels = Vec::with_capacity((width * odd_height) as usize);

        for row in 0..self.height {
            let start = (row * width) as usize;
            let end = start + width as usize;
            if row % 2 == 0 {
                even_pixels.extend_from_slice(&self.pixels[start..end]);
            } else {
                odd_pixels.extend_from_slice(&self.pixels[start..end]);
            }
        }

        let mut even = ImageRecord::new(
            format!("{}_even", self.name),
            width,
            even_height,
            self.bpp,
            even_pixels,
            self.palette.clone(),
        );
        even.field_mode = FieldMode::InterlacedEven;
        even.padding = self.padding;
        even.margin = self.margin;
        even.allowed_flips = self.allowed_flips.clone();

        let mut odd = ImageRecord::new(
            format!("{}_odd", self.name),
            width,
            odd_height,
            self.bpp,
            odd_pixels,
            self.palette.clone(),
        );
        odd.field_mode = FieldMode::InterlacedOdd;
        odd.padding = self.padding;
        odd.margin = self.margin;
        odd.allowed_flips = self.allowed_flips.clone();

        (even, odd)
    }

    /// The padded width/height span under `orientation`, before texel
    /// packing. Rotation swaps the two axes.
    fn oriented_span(&self, orientation: Orientation) -> (u32, u32) {
        let span_w = self.width + 2 * self.padding;
        let span_h = self.height + 2 * self.padding;
        match orientation {
            Orientation::Upright => (span_w, span_h),
            Orientation::Rotated90 => (span_h, span_w),
        }
    }

    /// Footprint width in this image's bit-depth texel units under
    /// `orientation`, including padding on both sides:
    /// `ceil((span + 2*padding) / texels_per_unit)`.
    pub fn footprint_width_units(&self, orientation: Orientation) -> u32 {
        let (span_w, _) = self.oriented_span(orientation);
        let tpu = self.bpp.texels_per_unit();
        span_w.div_ceil(tpu)
    }

    /// Footprint height in pixels under `orientation`, including
    /// padding on both sides. Height is never sub-byte-packed, so it
    /// stays in pixel units.
    pub fn footprint_height(&self, orientation: Orientation) -> u32 {
        let (_, span_h) = self.oriented_span(orientation);
        span_h
    }

    /// Whether a rectangle of the given footprint fits within one atlas
    /// page at this image's bit depth, starting at `(x, y)` in texel
    /// units / pixels respectively, under `orientation`. Pages wrap at
    /// `page_width_units` horizontally and 256 rows vertically.
    pub fn fits_in_page(&self, x: u32, y: u32, orientation: Orientation) -> bool {
        let page_w = self.bpp.page_width_units();
        let w = self.footprint_width_units(orientation);
        let h = self.footprint_height(orientation);
        (x % page_w) + w <= page_w && (y % 256) + h <= 256
    }

    /// Content hash of this image's pixel data, used to dedup identical
    /// sprites (including ones that happen to be stored pre-rotated,
    /// since the hash is of the stored buffer reflecting whatever
    /// orientation was chosen — no special-casing needed for rotations
    /// that happen to reproduce another image's bytes exactly).
    pub fn pixel_hash(&self) -> u32 {
        let mut hash: u32 = 0;
        for &byte in &self.pixels {
            hash = (byte as u32)
                .wrapping_add(hash.wrapping_shl(6))
                .wrapping_add(hash.wrapping_shl(16))
                .wrapping_sub(hash);
        }
        hash
    }

    /// Content hash of this image's palette, using the crate's palette
    /// hashing rules (LSB-masked unless `preserve_lsb`).
    pub fn palette_hash(&self, preserve_lsb: bool) -> u32 {
        palette_hash(&self.palette, preserve_lsb)
    }

    /// Packs this image's pixel row into bit-depth-appropriate bytes
    /// for blitting into an atlas page.
    ///
    /// At 4bpp, odd inner widths round the working width up to an even
    /// number of columns before pairing nibbles, and the extra
    /// half-column introduced by that rounding is discarded rather than
    /// stored — it exists only so every pair of source columns maps to
    /// one output byte.
    pub fn blit_columns(&self, row: &[u8]) -> Vec<u8> {
        match self.bpp {
            BitDepth::Bpp16 => row.to_vec(),
            BitDepth::Bpp8 => row.to_vec(),
            BitDepth::Bpp4 => {
                let padded_len = row.len() + (row.len() % 2);
                let mut out = Vec::with_capacity(padded_len / 2);
                let mut iter = row.chunks(2);
                while let Some(pair) = iter.next() {
                    let lo = pair[0] & 0x0F;
                    let hi = pair.get(1).copied().unwrap_or(0) & 0x0F;
                    out.push(lo | (hi << 4));
                }
                out
            }
        }
    }
}
