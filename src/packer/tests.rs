use super::*;
use crate::image::{BitDepth, ImageRecord, Orientation};

fn img(name: &str, w: u32, h: u32) -> ImageRecord {
    ImageRecord::new(name, w, h, BitDepth::Bpp8, vec![1u8; (w * h) as usize], vec![0u16; 256])
}

#[test]
fn single_image_places_at_origin() {
    let mut images = vec![img("a", 32, 32)];
    let result = attempt_pack(&mut images, 0, 128, 128, false);
    assert_eq!(result.packed, 1);
    assert_eq!(
        images[0].placement,
        Placement::Placed { page: 0, x: 0, y: 0, orientation: Orientation::Upright }
    );
}

#[test]
fn two_images_do_not_overlap() {
    let mut images = vec![img("a", 64, 64), img("b", 64, 64)];
    let result = attempt_pack(&mut images, 0, 128, 64, false);
    assert_eq!(result.packed, 2);
    let rects: Vec<(u32, u32, u32, u32)> = images
        .iter()
        .map(|i| {
            let Placement::Placed { x, y, .. } = i.placement else { panic!() };
            (x, y, i.footprint_width_units(Orientation::Upright), i.footprint_height(Orientation::Upright))
        })
        .collect();
    let (x0, y0, w0, h0) = rects[0];
    let (x1, y1, w1, h1) = rects[1];
    let disjoint = x0 + w0 <= x1 || x1 + w1 <= x0 || y0 + h0 <= y1 || y1 + h1 <= y0;
    assert!(disjoint, "placements overlap: {:?} vs {:?}", rects[0], rects[1]);
}

#[test]
fn oversize_image_is_left_unplaced() {
    let mut images = vec![img("too-big", 200, 200)];
    let result = attempt_pack(&mut images, 0, 64, 64, false);
    assert_eq!(result.packed, 0);
    assert_eq!(images[0].placement, Placement::Unplaced);
}

#[test]
fn duplicate_pixel_content_dedups_to_shared_placement() {
    let mut images = vec![img("a", 32, 32), img("b", 32, 32)];
    // Same dimensions and same fill byte -> identical pixel_hash.
    attempt_pack(&mut images, 0, 128, 128, false);
    assert_eq!(images[0].placement, images[1].placement);
}

#[test]
fn pack_images_places_all_when_page_is_large_enough() {
    let mut images = vec![img("a", 32, 32), img("b", 48, 16), img("c", 16, 16)];
    let result = pack_images(&mut images, 0, 64, 64, 256, 256, 1, false);
    assert_eq!(result.packed, 3);
    for i in &images {
        assert!(matches!(i.placement, Placement::Placed { .. }));
    }
}

#[test]
fn sort_key_metrics_order_descending() {
    let mut images = vec![img("small", 8, 8), img("large", 64, 64), img("mid", 32, 32)];
    sort_by_key(&mut images, SortKey::InnerArea);
    assert_eq!(images[0].name, "large");
    assert_eq!(images[1].name, "mid");
    assert_eq!(images[2].name, "small");
}

#[test]
fn best_fit_prefers_smallest_slack() {
    let rects = vec![
        FreeRect { x: 0, y: 0, w: 100, h: 100 },
        FreeRect { x: 200, y: 0, w: 20, h: 20 },
    ];
    let (idx, _, _) = best_fit(&rects, 16, 16).unwrap();
    assert_eq!(idx, 1, "smaller free rect with less slack should win");
}

#[test]
fn attempt_result_ordering_prefers_smaller_area_then_more_packed() {
    let small = AttemptResult { width: 64, height: 64, packed: 2, free_rects: vec![] };
    let large = AttemptResult { width: 128, height: 128, packed: 3, free_rects: vec![] };
    assert!(small.better_than(&large));

    let fewer = AttemptResult { width: 64, height: 64, packed: 1, free_rects: vec![] };
    let more = AttemptResult { width: 64, height: 64, packed: 2, free_rects: vec![] };
    assert!(more.better_than(&fewer));
}
