//! Brush edits. All coordinates here are in cell units; the engine converts
//! from world space before calling in.

use relief_field::{MAX_VALUE, MIN_VALUE, SURFACE, ScalarField};
use relief_world::NoiseField;

use crate::probe::{surface_cell, surface_height_at};
use crate::DirtySet;

/// One sculpt application, never persisted beyond the mutation pass.
#[derive(Clone, Copy, Debug)]
pub struct Brush {
    /// Brush center in cell units (y measured from the field floor).
    pub center_x: f32,
    pub center_y: f32,
    pub center_z: f32,
    /// Euclidean radius in cell units.
    pub radius: f32,
    pub strength: f32,
    /// Falloff exponent; weight = (1 - d/r)^falloff.
    pub falloff: f32,
    /// How strongly 3D noise modulates the delta.
    pub noise_strength: f32,
    /// Frequency of the modulating noise.
    pub noise_density: f32,
}

impl Brush {
    #[inline]
    fn weight(&self, u: f32) -> f32 {
        (1.0 - u).max(0.0).powf(self.falloff)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrushMode {
    Add,
    Remove,
}

impl BrushMode {
    #[inline]
    fn sign(self) -> f32 {
        match self {
            BrushMode::Add => 1.0,
            BrushMode::Remove => -1.0,
        }
    }
}

fn for_each_sphere_cell(
    field: &ScalarField,
    brush: &Brush,
    mut f: impl FnMut(usize, usize, usize, f32),
) {
    let xi = brush.center_x.round() as i32;
    let yi = brush.center_y.round() as i32;
    let zi = brush.center_z.round() as i32;
    let e = brush.radius.round() as i32;
    for dx in -e - 1..e + 1 {
        let cx = xi + dx;
        if cx < 0 || cx as usize >= field.width() {
            continue;
        }
        for dz in -e - 1..e + 1 {
            let cz = zi + dz;
            if cz < 0 || cz as usize >= field.depth() {
                continue;
            }
            for dy in -e - 1..e + 1 {
                let cy = yi + dy;
                if cy < 0 || cy as usize >= field.height() {
                    continue;
                }
                let ddx = cx as f32 - brush.center_x;
                let ddy = cy as f32 - brush.center_y;
                let ddz = cz as f32 - brush.center_z;
                let d = (ddx * ddx + ddy * ddy + ddz * ddz).sqrt();
                if d <= brush.radius {
                    f(cx as usize, cy as usize, cz as usize, d);
                }
            }
        }
    }
}

/// Additive or subtractive deposition: every cell inside the radius gains
/// `sign * strength * 16`, modulated by 3D noise and the falloff curve.
pub fn apply_brush(
    field: &mut ScalarField,
    noise: &NoiseField,
    brush: &Brush,
    mode: BrushMode,
    dirty: &mut DirtySet,
) {
    let mut edits: Vec<(usize, usize, usize, i32)> = Vec::new();
    for_each_sphere_cell(field, brush, |x, y, z, d| {
        let jitter = 1.0 + (noise.sample3(x as i32, y as i32, z as i32, brush.noise_density) - 0.5)
            * brush.noise_strength;
        let delta =
            mode.sign() * brush.strength * 16.0 * jitter * brush.weight(d / brush.radius);
        edits.push((x, y, z, delta.round() as i32));
    });
    for (x, y, z, delta) in edits {
        field.add(x, y, z, delta);
        dirty.mark(x, z);
    }
}

/// Signed noise brush: pushes cells up or down by the centered noise value,
/// roughening smooth terrain or (with low strength) softening sharp edits.
pub fn noise_brush(
    field: &mut ScalarField,
    noise: &NoiseField,
    brush: &Brush,
    dirty: &mut DirtySet,
) {
    let mut edits: Vec<(usize, usize, usize, i32)> = Vec::new();
    for_each_sphere_cell(field, brush, |x, y, z, d| {
        let delta = (noise.sample3(x as i32, y as i32, z as i32, brush.noise_density) - 0.5)
            * brush.strength
            * brush.noise_strength
            * 16.0
            * brush.weight(d / brush.radius);
        edits.push((x, y, z, delta.round() as i32));
    });
    for (x, y, z, delta) in edits {
        field.add(x, y, z, delta);
        dirty.mark(x, z);
    }
}

/// Moves every column surface inside the 2D footprint toward the reference
/// height captured at the brush center, by at most a falloff-weighted step
/// per application. Repeated application converges on a plateau.
pub fn flatten(
    field: &mut ScalarField,
    noise: &NoiseField,
    brush: &Brush,
    reference_height: f32,
    dirty: &mut DirtySet,
) {
    let xi = brush.center_x.round() as i32;
    let zi = brush.center_z.round() as i32;
    let e = brush.radius.round() as i32;
    let y_hint = (brush.center_y.round().max(0.0) as usize).min(field.height() - 2);

    for dx in -e - 1..e + 1 {
        let cx = xi + dx;
        if cx < 0 || cx as usize >= field.width() {
            continue;
        }
        for dz in -e - 1..e + 1 {
            let cz = zi + dz;
            if cz < 0 || cz as usize >= field.depth() {
                continue;
            }
            let d2 = ((dx * dx + dz * dz) as f32).sqrt();
            if d2 > brush.radius {
                continue;
            }
            let (x, z) = (cx as usize, cz as usize);
            let y = surface_cell(field, x, z, y_hint);
            let current = surface_height_at(field, x, z, y);
            let jitter = 1.0
                + (noise.sample3(cx, y as i32, cz, brush.noise_density) - 0.5)
                    * brush.noise_strength;
            let step = brush.strength * 0.2 * jitter * brush.weight(d2 / brush.radius);
            let delta = (reference_height - current).clamp(-step.abs(), step.abs());
            if delta != 0.0 {
                change_height(field, x, y, z, delta);
                dirty.mark(x, z);
            }
        }
    }
}

/// Shifts the surface crossing of one column by `delta` fractional cells,
/// moving whole cells for the integer part and rewriting the crossing pair
/// for the remainder. `y_hint` speeds up locating the current crossing.
/// Shifts that would push the crossing outside the field are dropped.
pub fn change_height(field: &mut ScalarField, x: usize, y_hint: usize, z: usize, delta: f32) {
    if delta == 0.0 {
        return;
    }
    let y = surface_cell(field, x, z, y_hint);

    // Split into whole cells and a [0, 1) crossing position, folding in the
    // column's current fractional offset.
    let mut steps = delta.trunc() as i32;
    let below = field.get(x, y, z).abs() as f32;
    let above = field.get(x, y + 1, z).abs() as f32;
    let mut surface_pos = delta.fract() + below / (below + above + 0.01);
    if surface_pos < 0.0 {
        steps -= 1;
        surface_pos += 1.0;
    } else if surface_pos >= 1.0 {
        steps += 1;
        surface_pos -= 1.0;
    }

    let top = field.height() as i32 - 1;
    let yn = y as i32 + steps;
    if yn < 0 || yn + 1 > top {
        return;
    }
    let yn = yn as usize;

    if steps > 0 {
        // Raising: values above the old crossing slide up, freed cells fill
        // solid.
        for yy in (yn + 2..=top as usize).rev() {
            let src = yy - steps as usize;
            let v = field.get(x, src, z);
            field.set(x, yy, z, v);
        }
        for yy in y..yn {
            field.set(x, yy, z, MAX_VALUE);
        }
    } else if steps < 0 {
        // Lowering: values above the new crossing slide down; cells past the
        // old top keep their old top value.
        let s = (-steps) as usize;
        let top_v = field.get(x, top as usize, z);
        for yy in yn + 2..=top as usize {
            let v = if yy + s <= top as usize {
                field.get(x, yy + s, z)
            } else {
                top_v
            };
            field.set(x, yy, z, v);
        }
    }

    field.set(x, yn, z, (MAX_VALUE as f32 * surface_pos).round() as i16);
    let mut air = (MIN_VALUE as f32 * (1.0 - surface_pos)).round() as i16;
    if yn + 1 == top as usize {
        // A crossing near the cell top rounds to 0, which would leave the top
        // row reading as solid.
        air = air.min(SURFACE - 1);
    }
    field.set(x, yn + 1, z, air);
    debug_assert!(field.get(x, yn, z) >= SURFACE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_field::{MAX_VALUE, MIN_VALUE};

    fn flat_field(surface_y: usize) -> ScalarField {
        let mut f = ScalarField::new(8, 16, 8);
        for x in 0..8 {
            for z in 0..8 {
                for y in 0..16 {
                    let v = if y <= surface_y { MAX_VALUE } else { MIN_VALUE };
                    f.set(x, y, z, v);
                }
            }
        }
        f
    }

    #[test]
    fn change_height_raises_by_fractional_cells() {
        let mut f = flat_field(4);
        change_height(&mut f, 3, 4, 3, 2.5);
        let h = surface_height_at(&f, 3, 3, 4);
        // Old crossing sat at 4.5 cells; +2.5 lands at 7.0.
        assert!((h - 7.0).abs() < 0.05, "height {h}");
        // Untouched neighbor column stays put.
        let h2 = surface_height_at(&f, 4, 3, 4);
        assert!((h2 - 4.5).abs() < 0.05, "neighbor {h2}");
    }

    #[test]
    fn change_height_lowers_by_fractional_cells() {
        let mut f = flat_field(6);
        change_height(&mut f, 2, 6, 2, -1.75);
        let h = surface_height_at(&f, 2, 2, 6);
        assert!((h - 4.75).abs() < 0.05, "height {h}");
    }

    #[test]
    fn change_height_drops_out_of_range_shifts() {
        let mut f = flat_field(2);
        let before = f.clone();
        change_height(&mut f, 1, 2, 1, -40.0);
        assert_eq!(f, before);
        change_height(&mut f, 1, 2, 1, 40.0);
        assert_eq!(f, before);
    }

    #[test]
    fn change_height_keeps_top_row_open() {
        let mut f = flat_field(13);
        // 0.5 fractional offset + 0.5 delta fraction lands the crossing at
        // the very top of cell 14, rounding the row-15 air value to 0.
        change_height(&mut f, 3, 13, 3, 1.5);
        assert!(f.get(3, 14, 3) >= SURFACE);
        assert!(f.get(3, 15, 3) < SURFACE, "top row {}", f.get(3, 15, 3));
    }

    #[test]
    fn small_shift_only_touches_crossing_pair() {
        let mut f = flat_field(5);
        change_height(&mut f, 3, 5, 3, 0.25);
        for y in 0..4 {
            assert_eq!(f.get(3, y, 3), MAX_VALUE);
        }
        for y in 7..16 {
            assert_eq!(f.get(3, y, 3), MIN_VALUE);
        }
        let h = surface_height_at(&f, 3, 3, 5);
        assert!((h - 5.75).abs() < 0.05, "height {h}");
    }
}
