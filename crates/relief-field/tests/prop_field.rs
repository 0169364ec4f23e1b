use proptest::prelude::*;
use relief_field::{HeightMap, MAX_VALUE, MIN_VALUE, ScalarField};

proptest! {
    #[test]
    fn stored_values_always_clamped(
        writes in proptest::collection::vec((0usize..4, 0usize..6, 0usize..4, -2000i32..2000), 1..64)
    ) {
        let mut field = ScalarField::new(4, 6, 4);
        for (x, y, z, v) in writes {
            field.set(x, y, z, v.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
            field.add(x, y, z, v);
        }
        for &v in field.values() {
            prop_assert!(v >= MIN_VALUE && v <= MAX_VALUE);
        }
    }

    #[test]
    fn height_map_is_bounded_by_field_extent(
        surface_y in 1usize..6,
        cell in 0.5f32..4.0,
    ) {
        let mut field = ScalarField::new(3, 8, 3);
        for x in 0..3 {
            for z in 0..3 {
                for y in 0..8 {
                    let v = if y <= surface_y { MAX_VALUE } else { MIN_VALUE };
                    field.set(x, y, z, v);
                }
            }
        }
        let hm = HeightMap::from_field(&field, cell, 0.0);
        let max_world = field.height() as f32 * cell;
        for x in 0..3 {
            for z in 0..3 {
                let h = hm.get(x, z);
                prop_assert!(h >= 0.0 && h <= max_world);
            }
        }
    }
}
