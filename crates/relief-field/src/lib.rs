//! Scalar field storage, derived maps, and terrain generation.
#![forbid(unsafe_code)]

mod generate;

pub use generate::{
    generate_border_map, generate_heightmap_mode, generate_rock_map, generate_volumetric_mode,
    seal_column, seal_vertical_bounds,
};

/// Largest magnitude a field value can take. Sign encodes inside/outside the
/// surface, magnitude encodes distance to the surface within one cell.
pub const MAX_VALUE: i16 = 256;
pub const MIN_VALUE: i16 = -256;
/// The isosurface threshold.
pub const SURFACE: i16 = 0;

/// Dense width x height x depth grid of signed surface-distance values.
/// Owned exclusively by the terrain engine; generation and sculpting are the
/// only mutators.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarField {
    width: usize,
    height: usize,
    depth: usize,
    values: Vec<i16>,
}

impl ScalarField {
    /// Allocates a field filled with `MIN_VALUE` (everything outside).
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
            values: vec![MIN_VALUE; width * height * depth],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.depth + z) * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> i16 {
        self.values[self.idx(x, y, z)]
    }

    /// Stores a value clamped to the valid [-256, 256] range.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, v: i16) {
        let i = self.idx(x, y, z);
        self.values[i] = v.clamp(MIN_VALUE, MAX_VALUE);
    }

    /// Adds a delta, saturating at the valid range.
    #[inline]
    pub fn add(&mut self, x: usize, y: usize, z: usize, delta: i32) {
        let i = self.idx(x, y, z);
        let v = (self.values[i] as i32 + delta).clamp(MIN_VALUE as i32, MAX_VALUE as i32);
        self.values[i] = v as i16;
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && (z as usize) < self.depth
    }

    /// Signed-coordinate read; out-of-range coordinates yield `None`.
    #[inline]
    pub fn try_get(&self, x: i32, y: i32, z: i32) -> Option<i16> {
        if self.in_bounds(x, y, z) {
            Some(self.get(x as usize, y as usize, z as usize))
        } else {
            None
        }
    }

    #[inline]
    pub fn values(&self) -> &[i16] {
        &self.values
    }
}

/// Dense 2D float grid over the terrain footprint. Used for the external
/// influence (blueprint) input, texture border offsets, and the rock map.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid2 {
    width: usize,
    depth: usize,
    data: Vec<f32>,
}

impl Grid2 {
    pub fn new(width: usize, depth: usize) -> Self {
        Self {
            width,
            depth,
            data: vec![0.0; width * depth],
        }
    }

    pub fn constant(width: usize, depth: usize, v: f32) -> Self {
        Self {
            width,
            depth,
            data: vec![v; width * depth],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.data[x * self.depth + z]
    }

    #[inline]
    pub fn set(&mut self, x: usize, z: usize, v: f32) {
        self.data[x * self.depth + z] = v;
    }

    /// Clamps coordinates into range instead of failing.
    #[inline]
    pub fn get_clamped(&self, x: i32, z: i32) -> f32 {
        let x = (x.max(0) as usize).min(self.width - 1);
        let z = (z.max(0) as usize).min(self.depth - 1);
        self.get(x, z)
    }
}

/// External sculptable blueprint layer, normalized to [0, 1].
pub type InfluenceMap = Grid2;

/// Topmost surface elevation per column, in world units. Always derivable
/// from the scalar field, never authoritative.
#[derive(Clone, Debug)]
pub struct HeightMap {
    grid: Grid2,
    cell_size: f32,
    base_offset: f32,
}

impl HeightMap {
    /// Scans each column top-down for the first inside cell and linearly
    /// refines the crossing from the two adjacent magnitudes.
    pub fn from_field(field: &ScalarField, cell_size: f32, base_offset: f32) -> Self {
        let mut map = Self {
            grid: Grid2::new(field.width(), field.depth()),
            cell_size,
            base_offset,
        };
        for x in 0..field.width() {
            for z in 0..field.depth() {
                map.update_column(field, x, z);
            }
        }
        map
    }

    /// Rescans a single column after a field edit.
    pub fn update_column(&mut self, field: &ScalarField, x: usize, z: usize) {
        let h = field.height();
        let mut found = 0.0f32;
        for y in (1..h.saturating_sub(1)).rev() {
            if field.get(x, y, z) > SURFACE {
                let above = field.get(x, y + 1, z);
                let frac =
                    (field.get(x, y, z) - above).abs() as f32 / (2.0 * MAX_VALUE as f32);
                found = y as f32 * self.cell_size + self.base_offset + self.cell_size * frac;
                break;
            }
        }
        self.grid.set(x, z, found);
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.grid.get(x, z)
    }

    #[inline]
    pub fn get_clamped(&self, x: i32, z: i32) -> f32 {
        self.grid.get_clamped(x, z)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.grid.width()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.grid.depth()
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn base_offset(&self) -> f32 {
        self.base_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clamps_to_valid_range() {
        let mut f = ScalarField::new(2, 2, 2);
        f.set(0, 0, 0, 10_000);
        assert_eq!(f.get(0, 0, 0), MAX_VALUE);
        f.set(0, 0, 0, -10_000);
        assert_eq!(f.get(0, 0, 0), MIN_VALUE);
        f.add(0, 0, 0, -50);
        assert_eq!(f.get(0, 0, 0), MIN_VALUE);
        f.add(0, 0, 0, 600);
        assert_eq!(f.get(0, 0, 0), MAX_VALUE);
    }

    #[test]
    fn try_get_rejects_out_of_bounds() {
        let f = ScalarField::new(3, 3, 3);
        assert!(f.try_get(-1, 0, 0).is_none());
        assert!(f.try_get(0, 3, 0).is_none());
        assert_eq!(f.try_get(2, 2, 2), Some(MIN_VALUE));
    }

    #[test]
    fn height_map_refines_crossing() {
        // Column solid up to y=4, crossing halfway between 4 and 5.
        let mut f = ScalarField::new(3, 8, 3);
        for y in 0..8 {
            let v = if y <= 4 { MAX_VALUE } else { MIN_VALUE };
            for x in 0..3 {
                for z in 0..3 {
                    f.set(x, y, z, v);
                }
            }
        }
        let hm = HeightMap::from_field(&f, 2.0, -4.0);
        // y=4 crossing with |256 - (-256)|/512 = 1 full cell of refinement.
        let expect = 4.0 * 2.0 - 4.0 + 2.0;
        assert!((hm.get(1, 1) - expect).abs() < 1e-5);
    }

    #[test]
    fn empty_column_reports_zero_height() {
        let f = ScalarField::new(2, 6, 2);
        let hm = HeightMap::from_field(&f, 1.0, 0.0);
        assert_eq!(hm.get(0, 0), 0.0);
    }
}
