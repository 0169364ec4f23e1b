use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use relief_field::{MAX_VALUE, MIN_VALUE, ScalarField};
use relief_sculpt::{
    Brush, BrushMode, DirtySet, apply_brush, erode, flatten, surface_height_at,
};
use relief_world::{ErosionParams, NoiseField, TerrainConfig};

fn test_noise() -> NoiseField {
    NoiseField::new(&TerrainConfig::default())
}

/// Flat terrain with the crossing between cells `surface` and `surface + 1`.
fn flat_field(width: usize, height: usize, depth: usize, surface: usize) -> ScalarField {
    let mut f = ScalarField::new(width, height, depth);
    for x in 0..width {
        for z in 0..depth {
            for y in 0..=surface {
                f.set(x, y, z, MAX_VALUE);
            }
        }
    }
    f
}

fn brush_at(x: f32, y: f32, z: f32, radius: f32, strength: f32) -> Brush {
    Brush {
        center_x: x,
        center_y: y,
        center_z: z,
        radius,
        strength,
        falloff: 2.0,
        noise_strength: 0.0,
        noise_density: 16.0,
    }
}

#[test]
fn add_brush_raises_material_near_center() {
    let noise = test_noise();
    let mut f = flat_field(16, 20, 16, 6);
    let mut dirty = DirtySet::new();
    let brush = brush_at(8.0, 7.0, 8.0, 3.0, 4.0);

    let before = f.get(8, 7, 8);
    apply_brush(&mut f, &noise, &brush, BrushMode::Add, &mut dirty);
    assert!(f.get(8, 7, 8) > before);
    assert!(!dirty.is_empty());
    // Cells outside the sphere are untouched.
    assert_eq!(f.get(1, 7, 1), MIN_VALUE);
}

#[test]
fn remove_brush_carves_material_near_center() {
    let noise = test_noise();
    let mut f = flat_field(16, 20, 16, 6);
    let mut dirty = DirtySet::new();
    let brush = brush_at(8.0, 6.0, 8.0, 3.0, 8.0);

    apply_brush(&mut f, &noise, &brush, BrushMode::Remove, &mut dirty);
    assert!(f.get(8, 6, 8) < MAX_VALUE);
    assert_eq!(f.get(1, 6, 1), MAX_VALUE);
}

#[test]
fn flatten_pulls_columns_toward_reference() {
    let noise = test_noise();
    let mut f = flat_field(16, 24, 16, 5);
    // One bumped column well above its neighbors.
    for y in 6..=9 {
        f.set(8, y, 8, MAX_VALUE);
    }
    let mut dirty = DirtySet::new();
    let reference = surface_height_at(&f, 2, 2, 5);
    let brush = brush_at(8.0, 9.0, 8.0, 3.0, 2.0);

    let start_gap = (surface_height_at(&f, 8, 8, 9) - reference).abs();
    for _ in 0..40 {
        flatten(&mut f, &noise, &brush, reference, &mut dirty);
    }
    let end_gap = (surface_height_at(&f, 8, 8, 9) - reference).abs();
    assert!(
        end_gap < start_gap,
        "gap did not shrink: {start_gap} -> {end_gap}"
    );
    assert!(end_gap < 0.5, "column did not converge: gap {end_gap}");
}

#[test]
fn flatten_never_overshoots_reference() {
    let noise = test_noise();
    let mut f = flat_field(12, 24, 12, 4);
    let mut dirty = DirtySet::new();
    let reference = 9.5f32;
    // Strength large enough that an unclamped step would fly past.
    let brush = brush_at(6.0, 4.0, 6.0, 2.5, 50.0);

    for _ in 0..30 {
        flatten(&mut f, &noise, &brush, reference, &mut dirty);
    }
    let h = surface_height_at(&f, 6, 6, 4);
    assert!(h <= reference + 0.6, "overshot reference: {h}");
}

#[test]
fn erosion_carves_the_slope_it_ran_down() {
    let mut f = ScalarField::new(24, 24, 24);
    // A ramp descending along +x.
    for x in 0..24 {
        for z in 0..24 {
            let s = 16 - x / 2;
            for y in 0..=s {
                f.set(x, y, z, MAX_VALUE);
            }
        }
    }
    let params = ErosionParams {
        iterations: 20,
        ..ErosionParams::default()
    };
    let mut dirty = DirtySet::new();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let stats = erode(&mut f, &params, 6.0, 14.0, 12.0, 4, &mut rng, &mut dirty);
    assert!(stats.eroded > 0.0);
    assert!(!dirty.is_empty());
    for &v in f.values() {
        assert!((MIN_VALUE..=MAX_VALUE).contains(&v));
    }
}

proptest! {
    #[test]
    fn brushes_never_leave_the_valid_range(
        cx in 0.0f32..16.0,
        cy in 2.0f32..14.0,
        cz in 0.0f32..16.0,
        radius in 0.5f32..5.0,
        strength in 0.0f32..50.0,
        noise_strength in 0.0f32..2.0,
        remove in any::<bool>(),
    ) {
        let noise = test_noise();
        let mut f = flat_field(16, 16, 16, 7);
        let mut dirty = DirtySet::new();
        let brush = Brush {
            center_x: cx,
            center_y: cy,
            center_z: cz,
            radius,
            strength,
            falloff: 2.0,
            noise_strength,
            noise_density: 16.0,
        };
        let mode = if remove { BrushMode::Remove } else { BrushMode::Add };
        apply_brush(&mut f, &noise, &brush, mode, &mut dirty);
        for &v in f.values() {
            prop_assert!((MIN_VALUE..=MAX_VALUE).contains(&v));
        }
    }
}
