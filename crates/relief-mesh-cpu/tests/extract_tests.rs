use proptest::prelude::*;
use relief_field::{Grid2, MAX_VALUE, MIN_VALUE, ScalarField};
use relief_geom::Vec3;
use relief_mesh_cpu::{ExtractParams, MeshBuild, Region, ShadeParams, extract_region};
use relief_world::TextureParams;

fn params(cell: f32, interpolate: bool) -> ExtractParams {
    ExtractParams {
        threshold: 0,
        cell_size: cell,
        origin: Vec3::ZERO,
        interpolate,
    }
}

fn shade() -> ShadeParams {
    ShadeParams {
        texture: TextureParams::default(),
        height_limit: 100.0,
        seed: 42,
    }
}

fn extract_full(field: &ScalarField, p: &ExtractParams) -> MeshBuild {
    let border = Grid2::new(field.width(), field.depth());
    extract_region(field, Region::full(field), p, &shade(), &border)
}

#[test]
fn single_inside_corner_yields_one_triangle() {
    let mut field = ScalarField::new(2, 2, 2);
    field.set(0, 0, 0, MAX_VALUE);
    let mesh = extract_full(&field, &params(1.0, true));
    assert_eq!(mesh.triangle_count(), 1);
    assert_eq!(mesh.positions.len(), 3);
    assert_eq!(mesh.uvs.len(), 3);
    // Every vertex sits on an edge touching the inside corner, halfway out.
    for v in &mesh.positions {
        assert!(v.length() <= 1.0 + 1e-5);
    }
}

#[test]
fn all_inside_or_all_outside_is_empty() {
    let empty = ScalarField::new(3, 3, 3);
    assert!(extract_full(&empty, &params(1.0, true)).is_empty());

    let mut solid = ScalarField::new(3, 3, 3);
    for x in 0..3 {
        for y in 0..3 {
            for z in 0..3 {
                solid.set(x, y, z, MAX_VALUE);
            }
        }
    }
    assert!(extract_full(&solid, &params(1.0, true)).is_empty());
}

#[test]
fn symmetric_crossing_lands_on_edge_midpoint() {
    // Solid bottom plane, empty top plane: a flat sheet halfway up the cube.
    let mut field = ScalarField::new(2, 2, 2);
    for x in 0..2 {
        for z in 0..2 {
            field.set(x, 0, z, MAX_VALUE);
            field.set(x, 1, z, MIN_VALUE);
        }
    }
    let cell = 4.0;
    let mesh = extract_full(&field, &params(cell, true));
    assert_eq!(mesh.triangle_count(), 2);
    for v in &mesh.positions {
        assert!((v.y - 0.5 * cell).abs() < 1e-5, "vertex y {}", v.y);
    }

    // Disabling interpolation pins the same crossings to the midpoint too.
    let blocky = extract_full(&field, &params(cell, false));
    assert_eq!(mesh.positions, blocky.positions);
}

#[test]
fn origin_offsets_every_vertex() {
    let mut field = ScalarField::new(2, 2, 2);
    field.set(0, 0, 0, MAX_VALUE);
    let p0 = params(1.0, true);
    let mut p1 = p0;
    p1.origin = Vec3::new(10.0, -5.0, 3.0);
    let a = extract_full(&field, &p0);
    let b = extract_full(&field, &p1);
    assert_eq!(a.triangle_count(), b.triangle_count());
    for (va, vb) in a.positions.iter().zip(&b.positions) {
        let d = *vb - *va;
        assert!((d - p1.origin).length() < 1e-5);
    }
}

fn sloped_field(w: usize, h: usize, d: usize) -> ScalarField {
    let mut field = ScalarField::new(w, h, d);
    for x in 0..w {
        for z in 0..d {
            // Surface height rises along x and z.
            let surface = 1.0 + 0.3 * x as f32 + 0.2 * z as f32;
            for y in 0..h {
                let v = ((surface - y as f32) * 128.0)
                    .clamp(MIN_VALUE as f32, MAX_VALUE as f32) as i16;
                field.set(x, y, z, v);
            }
        }
    }
    field
}

#[test]
fn extraction_is_deterministic() {
    let field = sloped_field(8, 6, 8);
    let p = params(2.0, true);
    let a = extract_full(&field, &p);
    let b = extract_full(&field, &p);
    assert_eq!(a, b);
}

#[test]
fn chunked_extraction_matches_single_pass() {
    let field = sloped_field(9, 6, 9);
    let p = params(1.5, true);
    let border = Grid2::new(field.width(), field.depth());
    let sh = shade();

    let full = extract_region(&field, Region::full(&field), &p, &sh, &border);

    let chunk_cells = 4;
    let mut positions = Vec::new();
    for cx in 0..3 {
        for cz in 0..3 {
            let region = Region::for_chunk(&field, chunk_cells, cx, cz, 0, field.height());
            let mesh = extract_region(&field, region, &p, &sh, &border);
            positions.extend(mesh.positions);
        }
    }
    assert_eq!(positions.len(), full.positions.len());

    let key = |v: &Vec3| (v.x.to_bits(), v.y.to_bits(), v.z.to_bits());
    let mut a: Vec<_> = positions.iter().map(key).collect();
    let mut b: Vec<_> = full.positions.iter().map(key).collect();
    a.sort_unstable();
    b.sort_unstable();
    assert_eq!(a, b);
}

#[test]
fn uvs_stay_inside_the_atlas() {
    let field = sloped_field(8, 6, 8);
    let border = Grid2::new(field.width(), field.depth());
    let mesh = extract_region(&field, Region::full(&field), &params(2.0, true), &shade(), &border);
    assert_eq!(mesh.uvs.len(), mesh.positions.len());
    for uv in &mesh.uvs {
        assert!((0.0..=1.0).contains(&uv[0]), "u {}", uv[0]);
        assert!((0.0..=1.0).contains(&uv[1]), "v {}", uv[1]);
    }
}

#[test]
fn normals_point_away_from_solid_ground() {
    // Flat sheet from a solid floor: normals should face up.
    let mut field = ScalarField::new(4, 3, 4);
    for x in 0..4 {
        for z in 0..4 {
            field.set(x, 0, z, MAX_VALUE);
            field.set(x, 1, z, MIN_VALUE);
            field.set(x, 2, z, MIN_VALUE);
        }
    }
    let mesh = extract_full(&field, &params(1.0, true));
    assert!(!mesh.is_empty());
    let normals = mesh.compute_normals();
    for n in &normals {
        assert!(n.y.abs() > 0.99, "normal {n:?} not vertical");
    }
}

#[test]
fn isolated_spike_bumps_only_nearby_geometry() {
    let mut field = ScalarField::new(10, 20, 10);
    for x in 0..10 {
        for z in 0..10 {
            field.set(x, 0, z, MAX_VALUE);
        }
    }
    for y in 0..=2 {
        field.set(5, y, 5, MAX_VALUE);
    }
    let mesh = extract_full(&field, &params(1.0, true));
    assert!(mesh.positions.iter().any(|v| v.y > 1.5), "spike missing");
    for v in &mesh.positions {
        if v.y > 1.5 {
            assert!(
                (v.x - 5.0).abs() <= 1.5 && (v.z - 5.0).abs() <= 1.5,
                "tall vertex far from the spike: {v:?}"
            );
        }
    }
}

proptest! {
    #[test]
    fn extraction_never_emits_out_of_range_geometry(
        values in proptest::collection::vec(-256i16..=256, 64),
        interpolate in any::<bool>(),
    ) {
        let mut field = ScalarField::new(4, 4, 4);
        for (i, &v) in values.iter().enumerate() {
            let x = i % 4;
            let z = (i / 4) % 4;
            let y = i / 16;
            field.set(x, y, z, v);
        }
        let mesh = extract_full(&field, &params(1.5, interpolate));
        prop_assert_eq!(mesh.indices.len() % 3, 0);
        prop_assert_eq!(mesh.uvs.len(), mesh.positions.len());
        for &i in &mesh.indices {
            prop_assert!((i as usize) < mesh.positions.len());
        }
        for v in &mesh.positions {
            prop_assert!(v.x >= 0.0 && v.x <= 4.5);
            prop_assert!(v.y >= 0.0 && v.y <= 4.5);
            prop_assert!(v.z >= 0.0 && v.z <= 4.5);
        }
    }
}
