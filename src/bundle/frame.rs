//! The 18-byte texture frame record: one per packed image, giving the
//! runtime enough to issue a draw without re-deriving placement.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

use crate::image::{BitDepth, FieldMode, ImageRecord, Orientation, PalettePlacement, Placement};

/// Packed flag bits for a texture frame record: bpp (bits 0-1),
/// interlace field (bits 2-3), margin-present (bit 4), rotated (bit 5).
///
/// Not a [`bitflags`]-style independent-bit set: `bpp` and `field` are
/// multi-bit *value* fields, not switches, so this is a plain struct
/// with a `to_bits` method instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFlags {
    /// Color depth of the stored pixel data.
    pub bpp: BitDepth,
    /// Interlace field this record holds, if any.
    pub field: FieldMode,
    /// Whether a non-zero margin is present (restored at draw time).
    pub has_margin: bool,
    /// Whether the stored pixel data is rotated 90 degrees.
    pub rotated: bool,
}

impl FrameFlags {
    /// Packs the four fields into the 32-bit wire representation.
    pub fn to_bits(self) -> u32 {
        let bpp_bits: u32 = match self.bpp {
            BitDepth::Bpp4 => 0,
            BitDepth::Bpp8 => 1,
            BitDepth::Bpp16 => 2,
        };
        let field_bits: u32 = match self.field {
            FieldMode::Progressive => 0,
            FieldMode::InterlacedEven => 1,
            FieldMode::InterlacedOdd => 2,
        };
        bpp_bits | (field_bits << 2) | ((self.has_margin as u32) << 4) | ((self.rotated as u32) << 5)
    }
}

/// A fixed 18-byte record describing one placed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureFrame {
    /// Texture page index.
    pub image_page: u16,
    /// Palette page index (ignored for 16bpp direct-color frames).
    pub palette_page: u16,
    /// X placement, in this frame's bit-depth texel units.
    pub x: u16,
    /// Y placement, in pixels.
    pub y: u16,
    /// Cropped left/top margin restored at draw time, X axis.
    pub margin_x: u8,
    /// Cropped left/top margin restored at draw time, Y axis.
    pub margin_y: u8,
    /// Inner width in pixels (excludes margin and padding).
    pub inner_w: u8,
    /// Inner height in pixels.
    pub inner_h: u8,
    /// Palette (px, py) packed into one 16-bit field: `py << 8 | px`.
    pub palette_xy: u16,
    /// Packed orientation/interlace/color-mode flags.
    pub flags: FrameFlags,
}

impl TextureFrame {
    /// Builds a frame record from a fully-placed image. Panics if the
    /// image lacks a pixel (and, for paletted images, palette) placement
    /// — callers only build frames after the atlas builder succeeds.
    pub fn from_image(image: &ImageRecord) -> Self {
        let Placement::Placed { page, x, y, orientation } = image.placement else {
            panic!("from_image called on an unplaced image");
        };

        let (palette_page, palette_xy) = if image.bpp == BitDepth::Bpp16 {
            (0, 0)
        } else {
            match image.palette_placement {
                PalettePlacement::Placed { page, px, py } => (page, (py as u16) << 8 | px as u16),
                PalettePlacement::Unplaced => panic!("from_image called before palette placement"),
            }
        };

        let (margin_x, margin_y) = image.margin;
        let flags = FrameFlags {
            bpp: image.bpp,
            field: image.field_mode,
            has_margin: margin_x != 0 || margin_y != 0,
            rotated: orientation == Orientation::Rotated90,
        };

        TextureFrame {
            image_page: page,
            palette_page,
            x: x as u16,
            y: y as u16,
            margin_x: margin_x as u8,
            margin_y: margin_y as u8,
            inner_w: image.width as u8,
            inner_h: image.height as u8,
            palette_xy,
            flags,
        }
    }

    /// Serializes this record to its fixed 18-byte wire layout.
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u16::<LittleEndian>(self.image_page)?;
        w.write_u16::<LittleEndian>(self.palette_page)?;
        w.write_u16::<LittleEndian>(self.x)?;
        w.write_u16::<LittleEndian>(self.y)?;
        w.write_u8(self.margin_x)?;
        w.write_u8(self.margin_y)?;
        w.write_u8(self.inner_w)?;
        w.write_u8(self.inner_h)?;
        w.write_u16::<LittleEndian>(self.palette_xy)?;
        w.write_u32::<LittleEndian>(self.flags.to_bits())?;
        Ok(())
    }
}

/// Fixed wire size of a [`TextureFrame`] record.
pub const FRAME_SIZE: usize = 18;
