//! The image packer: places image footprints into free rectangles on
//! one atlas page using a guillotine free-rectangle scheme with a
//! best-fit corner search, wrapped in a shrink/grow search over
//! candidate page sizes.

use hashbrown::HashMap;

use crate::image::{ImageRecord, Orientation, Placement};

#[cfg(test)]
mod tests;

/// A free rectangle available for placement, in texel-unit (x, width)
/// and pixel (y, height) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRect {
    /// X origin.
    pub x: u32,
    /// Y origin.
    pub y: u32,
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

impl FreeRect {
    fn area(self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

/// The six orderings the outer search tries, named for the quantity
/// each sorts images by, descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// `width * height` of the padded footprint.
    InnerArea,
    /// `2 * (width + height)` of the padded footprint.
    InnerPerimeter,
    /// `max(width, height)` of the padded footprint.
    MaxSide,
    /// Footprint width alone.
    InnerWidth,
    /// Footprint height alone.
    InnerHeight,
    /// `area * max(w,h)/min(w,h)`: penalizes extreme aspect ratios so
    /// long thin sprites get placed before they become unplaceable.
    Pathological,
}

impl SortKey {
    /// All six keys, in the order the outer search tries them.
    pub const ALL: [SortKey; 6] = [
        SortKey::InnerArea,
        SortKey::InnerPerimeter,
        SortKey::MaxSide,
        SortKey::InnerWidth,
        SortKey::InnerHeight,
        SortKey::Pathological,
    ];

    fn metric(self, w: u32, h: u32) -> u64 {
        match self {
            SortKey::InnerArea => w as u64 * h as u64,
            SortKey::InnerPerimeter => 2 * (w as u64 + h as u64),
            SortKey::MaxSide => w.max(h) as u64,
            SortKey::InnerWidth => w as u64,
            SortKey::InnerHeight => h as u64,
            SortKey::Pathological => {
                let area = w as u64 * h as u64;
                let (lo, hi) = if w < h { (w, h) } else { (h, w) };
                if lo == 0 {
                    area
                } else {
                    area.saturating_mul(hi as u64) / lo as u64
                }
            }
        }
    }
}

/// Outcome of one `attempt_pack` call at a fixed page size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    /// Page width tried.
    pub width: u32,
    /// Page height tried.
    pub height: u32,
    /// How many of the input images were placed.
    pub packed: usize,
    /// Free rectangles remaining after placement (unused by the
    /// search itself, useful for diagnostics).
    pub free_rects: Vec<FreeRect>,
}

impl AttemptResult {
    fn key(&self) -> (u64, usize) {
        (self.width as u64 * self.height as u64, self.packed)
    }

    /// Whether `self` is a better packing than `other`: smaller area
    /// wins, ties broken by placing more images.
    pub fn better_than(&self, other: &AttemptResult) -> bool {
        let (area_a, packed_a) = self.key();
        let (area_b, packed_b) = other.key();
        (area_a, std::cmp::Reverse(packed_a)) < (area_b, std::cmp::Reverse(packed_b))
    }
}

/// Attempts to place every unplaced image in `images` (all assumed to
/// share one bit depth's texel-unit coordinate system) into a page of
/// `width` x `height`, trying each image's allowed flips in order and
/// taking the first orientation with any valid placement.
///
/// Returns the free rectangles left over and mutates `images` in
/// place: placed images get a `Placement::Placed`, others are left
/// untouched for the caller to retry at a larger size.
pub fn attempt_pack(
    images: &mut [ImageRecord],
    page: u16,
    width: u32,
    height: u32,
    try_alt_split: bool,
) -> AttemptResult {
    let mut free_rects = vec![FreeRect { x: 0, y: 0, w: width, h: height }];
    let mut seen: HashMap<u32, Placement> = HashMap::new();
    let mut packed = 0usize;

    for img in images.iter_mut() {
        if !matches!(img.placement, Placement::Unplaced) {
            continue;
        }

        let hash = img.pixel_hash();
        if let Some(existing) = seen.get(&hash) {
            img.placement = *existing;
            packed += 1;
            continue;
        }

        let mut found = None;
        for &orientation in &img.allowed_flips {
            let fw = img.footprint_width_units(orientation);
            let fh = img.footprint_height(orientation);
            if let Some((idx, anchor, corner)) = best_fit(&free_rects, fw, fh) {
                found = Some((idx, anchor, corner, orientation, fw, fh));
                break;
            }
        }

        let Some((idx, (ax, ay), corner, orientation, fw, fh)) = found else {
            continue;
        };

        split_free_rect(&mut free_rects, idx, corner, fw, fh, try_alt_split);

        let placement = Placement::Placed { page, x: ax, y: ay, orientation };
        img.placement = placement;
        seen.insert(hash, placement);
        packed += 1;
    }

    AttemptResult { width, height, packed, free_rects }
}

/// Which corner of the chosen free rectangle the footprint was anchored
/// to, used to decide how the leftover L-shape is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Scans every free rectangle and all four corner anchors for the
/// smallest-slack placement of a `fw` x `fh` footprint.
///
/// Returns `(free_rect index, (x, y) anchor), corner)` for the winner,
/// or `None` if no free rectangle can hold the footprint. Ties break by
/// free-rectangle index, then corner-preference order
/// (top-left, top-right, bottom-left, bottom-right).
fn best_fit(free_rects: &[FreeRect], fw: u32, fh: u32) -> Option<(usize, (u32, u32), Corner)> {
    let corners = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    let mut best: Option<(u64, usize, (u32, u32), Corner)> = None;

    for (idx, rect) in free_rects.iter().enumerate() {
        if fw > rect.w || fh > rect.h {
            continue;
        }
        let margin_x = rect.w - fw;
        let margin_y = rect.h - fh;

        for &corner in &corners {
            let (ax, ay) = match corner {
                Corner::TopLeft => (rect.x, rect.y),
                Corner::TopRight => (rect.x + margin_x, rect.y),
                Corner::BottomLeft => (rect.x, rect.y + margin_y),
                Corner::BottomRight => (rect.x + margin_x, rect.y + margin_y),
            };
            let slack = rect.area() - (fw as u64 * fh as u64);
            let candidate = (slack, idx, (ax, ay), corner);
            let better = match &best {
                None => true,
                Some((best_slack, best_idx, _, _)) => {
                    (slack, idx) < (*best_slack, *best_idx)
                }
            };
            if better {
                best = Some(candidate);
            }
        }
    }

    best.map(|(_, idx, anchor, corner)| (idx, anchor, corner))
}

/// Removes the free rectangle at `idx` and inserts the 1 or 2
/// sub-rectangles left over after carving a `fw` x `fh` footprint from
/// the corner `corner`.
///
/// The axis choice for a two-way split (full-width-strip-plus-partial
/// vs. full-height-strip-plus-partial) follows `free_w * margin_y <
/// free_h * margin_x` comparing the two leftover strips' areas without
/// division, inverted when `try_alt_split` requests the alternate axis.
fn split_free_rect(
    free_rects: &mut Vec<FreeRect>,
    idx: usize,
    corner: Corner,
    fw: u32,
    fh: u32,
    try_alt_split: bool,
) {
    let rect = free_rects.remove(idx);
    let margin_x = rect.w - fw;
    let margin_y = rect.h - fh;

    if margin_x == 0 && margin_y == 0 {
        return;
    }
    if margin_x == 0 {
        free_rects.insert(idx, y_strip(rect, corner, fh, margin_y));
        return;
    }
    if margin_y == 0 {
        free_rects.insert(idx, x_strip(rect, corner, fw, margin_x));
        return;
    }

    let prefer_horizontal_split = (rect.w as u64 * margin_y as u64) < (rect.h as u64 * margin_x as u64);
    let use_horizontal = prefer_horizontal_split != try_alt_split;

    let mut inserted = 0;
    if use_horizontal {
        // Full-width strip along the margin_y side, partial-width strip
        // filling the remaining corner.
        free_rects.insert(idx, y_strip(rect, corner, fh, margin_y));
        inserted += 1;
        free_rects.insert(
            idx + inserted,
            x_strip(
                FreeRect { x: rect.x, y: rect.y, w: rect.w, h: fh },
                corner,
                fw,
                margin_x,
            ),
        );
    } else {
        free_rects.insert(idx, x_strip(rect, corner, fw, margin_x));
        inserted += 1;
        free_rects.insert(
            idx + inserted,
            y_strip(
                FreeRect { x: rect.x, y: rect.y, w: fw, h: rect.h },
                corner,
                fh,
                margin_y,
            ),
        );
    }
}

/// The leftover strip along the x-axis margin, on the side opposite the
/// anchored corner.
fn x_strip(rect: FreeRect, corner: Corner, fw: u32, margin_x: u32) -> FreeRect {
    let x = match corner {
        Corner::TopLeft | Corner::BottomLeft => rect.x + fw,
        Corner::TopRight | Corner::BottomRight => rect.x,
    };
    FreeRect { x, y: rect.y, w: margin_x, h: rect.h }
}

/// The leftover strip along the y-axis margin, on the side opposite the
/// anchored corner.
fn y_strip(rect: FreeRect, corner: Corner, fh: u32, margin_y: u32) -> FreeRect {
    let y = match corner {
        Corner::TopLeft | Corner::TopRight => rect.y + fh,
        Corner::BottomLeft | Corner::BottomRight => rect.y,
    };
    FreeRect { x: rect.x, y, w: rect.w, h: margin_y }
}

/// Sorts `images` by `key` descending, stable on ties so caller-supplied
/// order is preserved for equal-metric images.
fn sort_by_key(images: &mut [ImageRecord], key: SortKey) {
    images.sort_by(|a, b| {
        let metric_a = key.metric(
            a.footprint_width_units(Orientation::Upright),
            a.footprint_height(Orientation::Upright),
        );
        let metric_b = key.metric(
            b.footprint_width_units(Orientation::Upright),
            b.footprint_height(Orientation::Upright),
        );
        metric_b.cmp(&metric_a)
    });
}

/// Searches over all six [`SortKey`] orderings, both split-axis
/// preferences (when `try_splits`), and a shrink/grow candidate-size
/// search, selecting the smallest-area / most-packed result, then
/// re-plays the winning configuration against the real `images` slice
/// so its placements stick.
///
/// `start_width`/`start_height` seed the search; `max_width`/
/// `max_height` bound how far it may grow; `discard_step` is the step
/// size below which the search accepts its current candidate.
#[allow(clippy::too_many_arguments)]
pub fn pack_images(
    images: &mut [ImageRecord],
    page: u16,
    start_width: u32,
    start_height: u32,
    max_width: u32,
    max_height: u32,
    discard_step: u32,
    try_splits: bool,
) -> AttemptResult {
    let split_modes: &[bool] = if try_splits { &[false, true] } else { &[false] };

    let mut best: Option<(AttemptResult, SortKey, bool, u32, u32)> = None;

    for &key in SortKey::ALL.iter() {
        for &alt_split in split_modes {
            let mut working: Vec<ImageRecord> = images.to_vec();
            sort_by_key(&mut working, key);

            let mut w = start_width;
            let mut h = start_height;
            let mut step = (w.min(h) / 2).max(1);

            loop {
                let candidates = [
                    (w, h),
                    (w + step, h),
                    (w, h + step),
                    (w + step, h + step),
                ];

                let mut round_best: Option<AttemptResult> = None;
                for &(cw, ch) in &candidates {
                    if cw > max_width || ch > max_height {
                        continue;
                    }
                    let mut trial: Vec<ImageRecord> = working.clone();
                    let result = attempt_pack(&mut trial, page, cw, ch, alt_split);
                    let is_better = match &round_best {
                        None => true,
                        Some(current) => result.better_than(current),
                    };
                    if is_better {
                        round_best = Some(result);
                    }
                }

                let Some(round_result) = round_best else {
                    break;
                };

                let grew = round_result.width > w || round_result.height > h;
                w = round_result.width;
                h = round_result.height;

                let fully_placed = round_result.packed == working.len();
                let step_exhausted = step <= discard_step;

                let is_global_best = match &best {
                    None => true,
                    Some((current, ..)) => round_result.better_than(current),
                };
                if is_global_best {
                    best = Some((round_result.clone(), key, alt_split, w, h));
                }

                if fully_placed || (step_exhausted && !grew) {
                    break;
                }
                if !grew {
                    step = (step / 2).max(discard_step.max(1));
                    if step <= discard_step && !grew {
                        break;
                    }
                }
            }
        }
    }

    let Some((_, key, alt_split, w, h)) = best else {
        return attempt_pack(images, page, start_width, start_height, false);
    };

    sort_by_key(images, key);
    attempt_pack(images, page, w, h, alt_split)
}
