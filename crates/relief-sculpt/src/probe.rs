//! Column surface probes: locate the sign crossing of a column and sample
//! bilinear height/gradient around a fractional position.

use relief_field::{SURFACE, ScalarField};

/// Finds the cell just below the surface crossing of column (x, z), walking
/// up or down from `y_hint`. Returns a y with `field[y] >= 0 > field[y+1]`
/// whenever the column has a crossing near the hint; columns that are all
/// air resolve to 0, all solid to the top.
pub fn surface_cell(field: &ScalarField, x: usize, z: usize, y_hint: usize) -> usize {
    let top = field.height() - 2;
    let mut y = y_hint.min(top);
    if field.get(x, y, z) >= SURFACE {
        while y < top && field.get(x, y + 1, z) > SURFACE {
            y += 1;
        }
    } else {
        while y > 0 && field.get(x, y, z) < SURFACE {
            y -= 1;
        }
    }
    y
}

/// Fractional surface height of a column in cell units, refined from the
/// magnitudes on both sides of the crossing.
pub fn surface_height_at(field: &ScalarField, x: usize, z: usize, y_hint: usize) -> f32 {
    let y = surface_cell(field, x, z, y_hint);
    column_height(field, x, z, y)
}

#[inline]
fn column_height(field: &ScalarField, x: usize, z: usize, y: usize) -> f32 {
    let below = field.get(x, y, z).abs() as f32;
    let above = field.get(x, y + 1, z).abs() as f32;
    y as f32 + below / (below + above + 0.01)
}

/// Bilinear surface height and slope at a fractional (x, z) position.
#[derive(Clone, Copy, Debug)]
pub struct HeightGradient {
    pub height: f32,
    pub grad_x: f32,
    pub grad_z: f32,
    /// Surface cells of the four corner columns, reused as shift hints.
    pub sw_y: usize,
    pub nw_y: usize,
    pub ne_y: usize,
    pub se_y: usize,
}

/// Probes the four columns around (px, pz) and bilinearly blends their
/// surface heights into a droplet height and downhill gradient.
pub fn height_gradient(field: &ScalarField, px: f32, pz: f32, y_hint: usize) -> HeightGradient {
    let x0 = (px as usize).min(field.width() - 2);
    let z0 = (pz as usize).min(field.depth() - 2);
    let fx = (px - x0 as f32).clamp(0.0, 1.0);
    let fz = (pz - z0 as f32).clamp(0.0, 1.0);

    let sw_y = surface_cell(field, x0, z0, y_hint);
    let nw_y = surface_cell(field, x0, z0 + 1, y_hint);
    let ne_y = surface_cell(field, x0 + 1, z0 + 1, y_hint);
    let se_y = surface_cell(field, x0 + 1, z0, y_hint);

    let h_sw = column_height(field, x0, z0, sw_y);
    let h_nw = column_height(field, x0, z0 + 1, nw_y);
    let h_ne = column_height(field, x0 + 1, z0 + 1, ne_y);
    let h_se = column_height(field, x0 + 1, z0, se_y);

    let grad_x = (h_ne - h_nw) * fz + (h_se - h_sw) * (1.0 - fz);
    let grad_z = (h_nw - h_sw) * (1.0 - fx) + (h_ne - h_se) * fx;
    let height = h_nw * (1.0 - fx) * fz
        + h_ne * fx * fz
        + h_sw * (1.0 - fx) * (1.0 - fz)
        + h_se * fx * (1.0 - fz);

    HeightGradient {
        height,
        grad_x,
        grad_z,
        sw_y,
        nw_y,
        ne_y,
        se_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_field::{MAX_VALUE, MIN_VALUE};

    fn flat_field(surface_y: usize) -> ScalarField {
        let mut f = ScalarField::new(6, 10, 6);
        for x in 0..6 {
            for z in 0..6 {
                for y in 0..10 {
                    let v = if y <= surface_y { MAX_VALUE } else { MIN_VALUE };
                    f.set(x, y, z, v);
                }
            }
        }
        f
    }

    #[test]
    fn surface_cell_finds_crossing_from_any_hint() {
        let f = flat_field(4);
        for hint in [0, 2, 4, 8] {
            assert_eq!(surface_cell(&f, 2, 3, hint), 4);
        }
    }

    #[test]
    fn surface_height_refines_by_magnitudes() {
        let mut f = flat_field(4);
        // Crossing a quarter of the way up from cell 4.
        f.set(2, 4, 2, 64);
        f.set(2, 5, 2, -192);
        let h = surface_height_at(&f, 2, 2, 4);
        assert!((h - 4.25).abs() < 0.01, "height {h}");
    }

    #[test]
    fn gradient_is_zero_on_flat_ground() {
        let f = flat_field(4);
        let hg = height_gradient(&f, 2.5, 2.5, 4);
        assert!(hg.grad_x.abs() < 1e-4);
        assert!(hg.grad_z.abs() < 1e-4);
        assert!((hg.height - 4.5).abs() < 0.1);
    }

    #[test]
    fn gradient_points_uphill_along_slope() {
        let mut f = ScalarField::new(8, 12, 8);
        for x in 0..8 {
            for z in 0..8 {
                // Surface rises by one cell per x cell.
                let s = 2 + x;
                for y in 0..12 {
                    let v = if y <= s { MAX_VALUE } else { MIN_VALUE };
                    f.set(x, y, z, v);
                }
            }
        }
        let hg = height_gradient(&f, 3.5, 3.5, 5);
        assert!(hg.grad_x > 0.5, "grad_x {}", hg.grad_x);
        assert!(hg.grad_z.abs() < 0.2, "grad_z {}", hg.grad_z);
    }
}
