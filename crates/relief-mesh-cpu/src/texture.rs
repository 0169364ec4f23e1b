//! Per-triangle texture-atlas UV assignment. The atlas is a vertical strip
//! of four square material bands; every triangle is laid flat inside its
//! band at a seeded pseudo-random start point so adjacent faces do not
//! repeat visibly.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use relief_field::Grid2;
use relief_geom::Vec3;
use relief_world::TextureParams;

use crate::ExtractParams;

/// Shading inputs of one extraction pass.
#[derive(Clone, Debug)]
pub struct ShadeParams {
    pub texture: TextureParams,
    /// World-unit height the band thresholds scale against.
    pub height_limit: f32,
    /// Terrain seed; combined with triangle position for the UV start point.
    pub seed: i32,
}

pub(crate) fn push_triangle_uvs(
    uvs: &mut Vec<[f32; 2]>,
    tri: &[Vec3; 3],
    params: &ExtractParams,
    shade: &ShadeParams,
    border: &Grid2,
) {
    let [a, b, c] = *tri;
    let avg = (a + b + c) / 3.0;
    let cell = params.cell_size;

    // Band selection uses the border-wobbled height at the triangle centroid.
    let ax = ((avg.x - params.origin.x) / cell).round() as i32;
    let az = ((avg.z - params.origin.z) / cell).round() as i32;
    let tex_height = avg.y + border.get_clamped(ax, az);
    let band = shade
        .texture
        .band_for(tex_height, shade.height_limit)
        .atlas_index() as f32;

    // Position-keyed stream keeps UVs stable across re-extractions of the
    // same terrain while still varying between nearby triangles.
    let key = (shade.seed as i64 + (avg.y + avg.x + avg.z).round() as i64) as u64;
    let mut rng = ChaCha8Rng::seed_from_u64(key);
    let r: f32 = rng.gen_range(0.0..1.0);

    let tex_x = shade.texture.texture_size as f32;
    let tex_y = 4.0 * tex_x;
    let px = shade.texture.cube_pixel_size as f32;
    let ux = px / tex_x;
    let uy = px / tex_y;

    let e1 = a.distance(b);
    let e2 = a.distance(c);
    let e3 = b.distance(c);
    let longest = e1.max(e2).max(e3);

    // Keep the whole triangle inside its band: the start point backs away
    // from the atlas edges by the longest edge's pixel footprint.
    let min_px = (longest / cell) * px + 1.0;
    let sx = r * (1.0 - min_px / tex_x);
    let sy = 0.25 * band + r * (0.25 - min_px / tex_y);

    // Lay the longest edge along the atlas x axis and place the third
    // vertex by the angle it spans from that edge.
    if e1 >= e2 && e1 >= e3 {
        let ang = (b - a).angle_to(c - a);
        uvs.push([sx, sy]);
        uvs.push([sx + (e1 / cell) * ux, sy]);
        uvs.push([
            sx + (ang.cos() * e2 / cell) * ux,
            sy + (ang.sin() * e2 / cell) * uy,
        ]);
    } else if e2 >= e1 && e2 >= e3 {
        let ang = (b - a).angle_to(c - a);
        uvs.push([sx, sy]);
        uvs.push([
            sx + (ang.cos() * e1 / cell) * ux,
            sy + (ang.sin() * e1 / cell) * uy,
        ]);
        uvs.push([sx + (e2 / cell) * ux, sy]);
    } else {
        let ang = (a - b).angle_to(c - b);
        uvs.push([
            sx + (ang.cos() * e1 / cell) * ux,
            sy + (ang.sin() * e1 / cell) * uy,
        ]);
        uvs.push([sx, sy]);
        uvs.push([sx + (e3 / cell) * ux, sy]);
    }
}
