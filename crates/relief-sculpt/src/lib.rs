//! Field sculpting: brushes, column height shifts, droplet erosion.
#![forbid(unsafe_code)]

mod brush;
mod erosion;
mod probe;

pub use brush::{Brush, BrushMode, apply_brush, change_height, flatten, noise_brush};
pub use erosion::{ErosionStats, erode};
pub use probe::{HeightGradient, height_gradient, surface_cell, surface_height_at};

use hashbrown::HashSet;

/// Cells touched by one sculpt batch. Maps to the chunk dirty set at the end
/// of the batch; a cell at (x, z) also dirties the cubes starting one cell
/// back, so neighbor chunks sharing the boundary re-extract too.
#[derive(Debug, Default, Clone)]
pub struct DirtySet {
    cells: HashSet<(usize, usize)>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mark(&mut self, x: usize, z: usize) {
        self.cells.insert((x, z));
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells.iter().copied()
    }

    /// Sorted chunk coordinates covering every marked cell plus the one-cell
    /// overlap marching cubes reads.
    pub fn chunks(
        &self,
        chunk_cells: usize,
        width_chunks: usize,
        depth_chunks: usize,
    ) -> Vec<(usize, usize)> {
        let mut set = HashSet::new();
        for &(x, z) in &self.cells {
            let cx0 = x.saturating_sub(1) / chunk_cells;
            let cz0 = z.saturating_sub(1) / chunk_cells;
            let cx1 = (x / chunk_cells).min(width_chunks.saturating_sub(1));
            let cz1 = (z / chunk_cells).min(depth_chunks.saturating_sub(1));
            for cx in cx0..=cx1 {
                for cz in cz0..=cz1 {
                    set.insert((cx, cz));
                }
            }
        }
        let mut out: Vec<(usize, usize)> = set.into_iter().collect();
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_cell_maps_to_one_chunk() {
        let mut d = DirtySet::new();
        d.mark(2, 2);
        assert_eq!(d.chunks(4, 3, 3), vec![(0, 0)]);
    }

    #[test]
    fn boundary_cell_dirties_both_neighbors() {
        let mut d = DirtySet::new();
        d.mark(4, 2);
        assert_eq!(d.chunks(4, 3, 3), vec![(0, 0), (1, 0)]);

        let mut d = DirtySet::new();
        d.mark(4, 4);
        assert_eq!(d.chunks(4, 3, 3), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn chunks_are_clamped_to_grid() {
        let mut d = DirtySet::new();
        d.mark(11, 11);
        assert_eq!(d.chunks(4, 3, 3), vec![(2, 2)]);
        d.mark(100, 100);
        assert_eq!(d.chunks(4, 3, 3), vec![(2, 2)]);
    }
}
