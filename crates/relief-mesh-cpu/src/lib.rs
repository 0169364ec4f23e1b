//! CPU marching-cubes mesh extraction over scalar field regions.
#![forbid(unsafe_code)]

mod tables;
mod texture;

pub use tables::{CORNER_A_FROM_EDGE, CORNER_B_FROM_EDGE, TRIANGULATION};
pub use texture::ShadeParams;

use relief_field::{Grid2, ScalarField};
use relief_geom::Vec3;

/// Per-corner cell offsets in Bourke order: corners 0..4 on the lower face,
/// 4..8 on the upper, each face wound starting from the +z edge.
const CORNER_OFFSETS: [(usize, usize, usize); 8] = [
    (0, 0, 1),
    (1, 0, 1),
    (1, 0, 0),
    (0, 0, 0),
    (0, 1, 1),
    (1, 1, 1),
    (1, 1, 0),
    (0, 1, 0),
];

/// Flat triangle soup for one extracted region. Vertices are not shared
/// between triangles so each face shades independently.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuild {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub uvs: Vec<[f32; 2]>,
}

impl MeshBuild {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Area-weighted vertex normals. With unshared vertices this reduces to
    /// per-face normals but stays correct if positions ever get welded.
    pub fn compute_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let n = (self.positions[i1] - self.positions[i0])
                .cross(self.positions[i2] - self.positions[i0]);
            normals[i0] += n;
            normals[i1] += n;
            normals[i2] += n;
        }
        for n in normals.iter_mut() {
            *n = n.normalized();
        }
        normals
    }
}

/// Half-open cube ranges of one extraction pass. A cube at (x, y, z) reads
/// corners up to (x+1, y+1, z+1), so ends must stay below the field extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x0: usize,
    pub x1: usize,
    pub y0: usize,
    pub y1: usize,
    pub z0: usize,
    pub z1: usize,
}

impl Region {
    /// Cube ranges covered by chunk (cx, cz), clamped at field edges so
    /// partial border chunks shrink instead of reading out of range.
    pub fn for_chunk(
        field: &ScalarField,
        chunk_cells: usize,
        cx: usize,
        cz: usize,
        y0: usize,
        y1: usize,
    ) -> Self {
        let x0 = chunk_cells * cx;
        let z0 = chunk_cells * cz;
        let x1 = (chunk_cells * (cx + 1)).clamp(x0, field.width() - 1);
        let z1 = (chunk_cells * (cz + 1)).clamp(z0, field.depth() - 1);
        let y1 = y1.min(field.height() - 1);
        Self {
            x0,
            x1,
            y0,
            y1,
            z0,
            z1,
        }
    }

    /// The whole field as one region.
    pub fn full(field: &ScalarField) -> Self {
        Self {
            x0: 0,
            x1: field.width() - 1,
            y0: 0,
            y1: field.height() - 1,
            z0: 0,
            z1: field.depth() - 1,
        }
    }
}

/// Geometry parameters of one extraction pass.
#[derive(Clone, Copy, Debug)]
pub struct ExtractParams {
    /// Isosurface threshold; a corner below it counts as outside.
    pub threshold: i16,
    /// World-unit edge length of one cell.
    pub cell_size: f32,
    /// World position of cell (0, 0, 0).
    pub origin: Vec3,
    /// When false every crossing sits at the edge midpoint (blocky look).
    pub interpolate: bool,
}

#[inline]
fn edge_t(threshold: i16, v1: i16, v2: i16, interpolate: bool) -> f32 {
    if !interpolate || v1 == v2 {
        0.5
    } else {
        (threshold - v1) as f32 / (v2 - v1) as f32
    }
}

/// Runs marching cubes over `region` and returns the triangle soup with
/// texture-atlas UVs. Pure over its inputs; equal inputs produce equal
/// meshes, and splitting a region into chunks produces the same triangles
/// as one pass over the union.
pub fn extract_region(
    field: &ScalarField,
    region: Region,
    params: &ExtractParams,
    shade: &ShadeParams,
    border: &Grid2,
) -> MeshBuild {
    let mut mesh = MeshBuild::default();
    let mut corner_pos = [Vec3::ZERO; 8];
    let mut corner_val = [0i16; 8];

    for y in region.y0..region.y1 {
        for x in region.x0..region.x1 {
            for z in region.z0..region.z1 {
                let mut case = 0usize;
                for (i, (dx, dy, dz)) in CORNER_OFFSETS.iter().enumerate() {
                    let (cx, cy, cz) = (x + dx, y + dy, z + dz);
                    let v = field.get(cx, cy, cz);
                    corner_val[i] = v;
                    corner_pos[i] = Vec3::new(
                        cx as f32 * params.cell_size + params.origin.x,
                        cy as f32 * params.cell_size + params.origin.y,
                        cz as f32 * params.cell_size + params.origin.z,
                    );
                    if v < params.threshold {
                        case |= 1 << i;
                    }
                }

                let row = &TRIANGULATION[case];
                let mut i = 0;
                while row[i] >= 0 {
                    let mut tri = [Vec3::ZERO; 3];
                    for (k, v) in tri.iter_mut().enumerate() {
                        let edge = row[i + k] as usize;
                        let a = CORNER_A_FROM_EDGE[edge];
                        let b = CORNER_B_FROM_EDGE[edge];
                        let t = edge_t(
                            params.threshold,
                            corner_val[a],
                            corner_val[b],
                            params.interpolate,
                        );
                        *v = corner_pos[a] + (corner_pos[b] - corner_pos[a]) * t;
                    }

                    let base = mesh.positions.len() as u32;
                    mesh.positions.extend_from_slice(&tri);
                    mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
                    texture::push_triangle_uvs(&mut mesh.uvs, &tri, params, shade, border);
                    i += 3;
                }
            }
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangulation_rows_are_well_formed() {
        for (case, row) in TRIANGULATION.iter().enumerate() {
            let used: Vec<i8> = row.iter().copied().take_while(|&e| e >= 0).collect();
            assert_eq!(used.len() % 3, 0, "case {case} not triangle aligned");
            assert!(used.len() <= 15, "case {case} too long");
            for &e in &used {
                assert!((0..12).contains(&(e as i32)), "case {case} edge {e}");
            }
        }
        assert!(TRIANGULATION[0].iter().all(|&e| e == -1));
        assert!(TRIANGULATION[255].iter().all(|&e| e == -1));
    }

    #[test]
    fn corner_offsets_match_edge_tables() {
        for e in 0..12 {
            let a = CORNER_OFFSETS[CORNER_A_FROM_EDGE[e]];
            let b = CORNER_OFFSETS[CORNER_B_FROM_EDGE[e]];
            let d = (a.0 as i32 - b.0 as i32).abs()
                + (a.1 as i32 - b.1 as i32).abs()
                + (a.2 as i32 - b.2 as i32).abs();
            assert_eq!(d, 1, "edge {e} does not join adjacent corners");
        }
    }
}
