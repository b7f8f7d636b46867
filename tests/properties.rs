//! Property-style checks over the packing core's invariants: the ones
//! spec.md requires hold for any valid input, not just the named
//! scenarios.

use fudgepack::{
    sdbm_hash, BitDepth, BundleAssembler, EntryKind, HashIndex, ImageRecord, IndexEntry,
    PackError, PackerConfig, Placement, SoundChannels, SoundRecord,
};

fn solid_image(name: &str, w: u32, h: u32, bpp: BitDepth) -> ImageRecord {
    let palette_size = bpp.palette_size() as usize;
    ImageRecord::new(name, w, h, bpp, vec![0u8; (w * h) as usize], vec![0u16; palette_size])
}

#[test]
fn packing_is_deterministic_across_runs() {
    let make = || {
        vec![
            solid_image("a", 32, 16, BitDepth::Bpp8),
            solid_image("b", 16, 32, BitDepth::Bpp8),
            solid_image("c", 8, 8, BitDepth::Bpp8),
        ]
    };

    let mut first = make();
    fudgepack::build_atlas(&mut first, &PackerConfig::default()).unwrap();

    let mut second = make();
    fudgepack::build_atlas(&mut second, &PackerConfig::default()).unwrap();

    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.placement, b.placement);
        assert_eq!(a.palette_placement, b.palette_placement);
    }
}

#[test]
fn every_placement_fits_within_its_page() {
    let mut images = vec![
        solid_image("a", 50, 30, BitDepth::Bpp4),
        solid_image("b", 30, 50, BitDepth::Bpp4),
        solid_image("c", 20, 20, BitDepth::Bpp4),
    ];
    fudgepack::build_atlas(&mut images, &PackerConfig::default()).unwrap();

    for img in &images {
        if let Placement::Placed { x, y, orientation, .. } = img.placement {
            assert!(img.fits_in_page(x, y, orientation));
        }
    }
}

#[test]
fn placed_images_never_overlap_on_the_same_page() {
    let mut images = vec![
        solid_image("a", 40, 40, BitDepth::Bpp8),
        solid_image("b", 40, 40, BitDepth::Bpp8),
        solid_image("c", 20, 60, BitDepth::Bpp8),
    ];
    // Distinct fill bytes so pixel hashes differ and none dedup away.
    images[1].pixels.fill(1);
    images[2].pixels.fill(2);

    fudgepack::build_atlas(&mut images, &PackerConfig::default()).unwrap();

    let rects: Vec<(u16, u32, u32, u32, u32)> = images
        .iter()
        .filter_map(|i| match i.placement {
            Placement::Placed { page, x, y, orientation } => Some((
                page,
                x,
                y,
                i.footprint_width_units(orientation),
                i.footprint_height(orientation),
            )),
            Placement::Unplaced => None,
        })
        .collect();

    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            let (pa, xa, ya, wa, ha) = rects[i];
            let (pb, xb, yb, wb, hb) = rects[j];
            if pa != pb {
                continue;
            }
            let disjoint = xa + wa <= xb || xb + wb <= xa || ya + ha <= yb || yb + hb <= ya;
            assert!(disjoint, "overlap between placements {i} and {j}");
        }
    }
}

#[test]
fn duplicate_names_fail_the_whole_build() {
    let mut assembler = BundleAssembler::new(PackerConfig::default());
    assembler.add_texture("same", vec![solid_image("same", 8, 8, BitDepth::Bpp8)], false);
    assembler.add_texture("same", vec![solid_image("same", 8, 8, BitDepth::Bpp8)], false);

    let mut buf = Vec::new();
    assert!(matches!(
        assembler.generate(&mut buf).unwrap_err(),
        PackError::DuplicateName { .. }
    ));
}

#[test]
fn index_lookup_round_trips_every_entry() {
    let entries: Vec<IndexEntry> = ["alpha", "beta", "gamma", "delta"]
        .iter()
        .enumerate()
        .map(|(i, name)| IndexEntry {
            name: name.to_string(),
            name_hash: sdbm_hash(name),
            kind: EntryKind::Texture,
            offset: i as u32 * 16,
            length: 16,
        })
        .collect();

    let index = HashIndex::build(entries.clone());
    for entry in &entries {
        let found = index.lookup(entry.name_hash).expect("entry should be found");
        assert_eq!(found.name, entry.name);
        assert_eq!(found.offset, entry.offset);
    }
}

#[test]
fn repeated_dedup_passes_are_idempotent() {
    let mut images = vec![
        solid_image("a", 16, 16, BitDepth::Bpp4),
        solid_image("b", 16, 16, BitDepth::Bpp4),
        solid_image("c", 16, 16, BitDepth::Bpp4),
    ];
    fudgepack::build_atlas(&mut images, &PackerConfig::default()).unwrap();
    let first_pass: Vec<_> = images.iter().map(|i| i.placement).collect();

    // Re-running build_atlas on already-placed images is not a
    // supported operation (placement is one-shot), but the hash
    // dedup itself should be idempotent: hashing twice yields the
    // same key both times.
    let hashes: Vec<u32> = images.iter().map(|i| i.pixel_hash()).collect();
    let hashes_again: Vec<u32> = images.iter().map(|i| i.pixel_hash()).collect();
    assert_eq!(hashes, hashes_again);
    assert!(first_pass.iter().all(|p| matches!(p, Placement::Placed { .. })));
}

#[test]
fn bundle_sections_are_sector_aligned() {
    let mut assembler = BundleAssembler::new(PackerConfig::default());
    assembler.add_texture("x", vec![solid_image("x", 16, 16, BitDepth::Bpp8)], false);
    assembler.add_sound(
        SoundRecord { name: "s".to_string(), rate: 22050 },
        SoundChannels::Mono(vec![0u8; 37]), // deliberately not sector-aligned
    );

    let mut buf = Vec::new();
    assembler.generate(&mut buf).unwrap();
    assert_eq!(buf.len() % fudgepack::SECTOR_SIZE, 0);
}
