//! Field generation: fills a scalar field from layered noise, either as a
//! heightmap extrusion or as clipped volumetric noise.

use std::ops::Range;

use relief_world::{NoiseField, TerrainConfig};

use crate::{Grid2, InfluenceMap, MAX_VALUE, MIN_VALUE, ScalarField, SURFACE};

/// Interpolated crossing value for a cell at world height `fy` whose column
/// surface sits at `surface`. Positive side when the cell is below.
#[inline]
fn crossing_value(fy: f32, cell: f32, surface: f32) -> i32 {
    if fy <= surface {
        (((surface - fy) / cell) * MAX_VALUE as f32).round() as i32
    } else {
        (((fy - surface) / cell) * MIN_VALUE as f32).round() as i32
    }
}

/// Heightmap mode: every column is solid below its 2D surface height and
/// empty above, with one interpolated band at the crossing.
pub fn generate_heightmap_mode(
    cfg: &TerrainConfig,
    noise: &NoiseField,
    influence: &InfluenceMap,
) -> ScalarField {
    let (w, h, d) = (cfg.width(), cfg.height(), cfg.depth());
    let cell = cfg.cell_size();
    let dig = cfg.dig_depth_limit as f32;
    let mut field = ScalarField::new(w, h, d);

    for x in 0..w {
        for z in 0..d {
            let inf = influence.get_clamped(x as i32, z as i32);
            // Surface height in field space; dig limit is negative so the
            // world-zero surface sits above the field floor.
            let surface = noise.surface_height(x, z, inf) - dig;
            for y in 0..h {
                let fy = y as f32 * cell;
                let v = if fy + cell <= surface {
                    MAX_VALUE as i32
                } else if fy - cell >= surface {
                    MIN_VALUE as i32
                } else {
                    crossing_value(fy, cell, surface)
                };
                field.set(x, y, z, v as i16);
            }
        }
    }
    field
}

/// Volumetric mode: layered pseudo-3D noise shaped by a power curve, clipped
/// above the 2D surface and sealed underneath by a low bottom surface so
/// caves and overhangs never open into the void.
pub fn generate_volumetric_mode(
    cfg: &TerrainConfig,
    noise: &NoiseField,
    influence: &InfluenceMap,
) -> ScalarField {
    let (w, h, d) = (cfg.width(), cfg.height(), cfg.depth());
    let cell = cfg.cell_size();
    let dig = cfg.dig_depth_limit as f32;
    let power = cfg.noise.power_3d;
    let min_cell = cfg.min_terrain_cell();
    let max_cell = cfg.max_terrain_cell();
    let mut field = ScalarField::new(w, h, d);

    for x in 0..w {
        for z in 0..d {
            let inf = influence.get_clamped(x as i32, z as i32);
            let surface = noise.surface_height(x, z, inf) - dig;
            let bottom = noise.bottom_height(x, z) - dig;
            for y in 0..h {
                // Noise is only sampled inside the procedural band; outside
                // it the raw value resolves to empty.
                let n = if y >= min_cell && y < max_cell {
                    noise.volume_noise(x as i32, y as i32, z as i32)
                } else {
                    0.0
                };
                let mut v = ((n.powf(power) - 0.5) * 2.0 * MAX_VALUE as f32).round() as i32;
                v = v.clamp(MIN_VALUE as i32, MAX_VALUE as i32);

                let fy = y as f32 * cell;
                // Clip everything above the 2D surface.
                if fy - cell >= surface {
                    v = MIN_VALUE as i32;
                } else if v > SURFACE as i32 && fy + cell > surface {
                    v = crossing_value(fy, cell, surface);
                }

                // Seal the underside with the bottom surface.
                if v < SURFACE as i32 {
                    if fy + cell <= bottom {
                        v = MAX_VALUE as i32;
                    } else if fy <= bottom || fy - cell < bottom {
                        v = crossing_value(fy, cell, bottom);
                    }
                }
                field.set(x, y, z, v as i16);
            }
        }
    }
    field
}

/// Signed per-column offsets that wobble texture band borders.
pub fn generate_border_map(cfg: &TerrainConfig, noise: &NoiseField) -> Grid2 {
    let mut map = Grid2::new(cfg.width(), cfg.depth());
    for x in 0..cfg.width() {
        for z in 0..cfg.depth() {
            map.set(x, z, noise.border_offset_at(x, z));
        }
    }
    map
}

/// Rock scatter values in [0, 1] consumed by the vegetation collaborator.
pub fn generate_rock_map(cfg: &TerrainConfig, noise: &NoiseField) -> Grid2 {
    let mut map = Grid2::new(cfg.width(), cfg.depth());
    for x in 0..cfg.width() {
        for z in 0..cfg.depth() {
            map.set(x, z, noise.rock_value(x, z));
        }
    }
    map
}

/// Forces the field closed at its vertical bounds over the given footprint:
/// the bottom row never reads as empty and the top row never reads as solid,
/// so extracted meshes are watertight there.
pub fn seal_vertical_bounds(
    field: &mut ScalarField,
    xs: Range<usize>,
    zs: Range<usize>,
    threshold: i16,
) {
    for x in xs {
        for z in zs.clone() {
            seal_column(field, x, z, threshold);
        }
    }
}

/// Single-column form of [`seal_vertical_bounds`], for patching columns an
/// edit just touched.
pub fn seal_column(field: &mut ScalarField, x: usize, z: usize, threshold: i16) {
    let top = field.height() - 1;
    if field.get(x, 0, z) < threshold {
        field.set(x, 0, z, threshold);
    }
    if field.get(x, top, z) >= threshold {
        field.set(x, top, z, threshold - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_world::TerrainConfig;

    fn small_cfg() -> TerrainConfig {
        let mut cfg = TerrainConfig::default();
        cfg.terrain_width = 60;
        cfg.terrain_depth = 60;
        cfg.build_height_limit = 80;
        cfg.dig_depth_limit = -40;
        cfg.terrain_height_limit = 60;
        cfg.resolution = 20;
        cfg.seed = "gen-tests".to_string();
        cfg.validate().unwrap();
        cfg
    }

    #[test]
    fn heightmap_mode_columns_are_solid_prefixes() {
        let cfg = small_cfg();
        let noise = NoiseField::new(&cfg);
        let influence = InfluenceMap::constant(cfg.width(), cfg.depth(), 0.5);
        let field = generate_heightmap_mode(&cfg, &noise, &influence);

        for x in 0..field.width() {
            for z in 0..field.depth() {
                let mut seen_empty = false;
                for y in 0..field.height() {
                    let v = field.get(x, y, z);
                    if v <= SURFACE {
                        seen_empty = true;
                    } else {
                        assert!(!seen_empty, "solid above empty at ({x},{y},{z})");
                    }
                }
            }
        }
    }

    #[test]
    fn heightmap_mode_crossing_matches_noise_surface() {
        let cfg = small_cfg();
        let noise = NoiseField::new(&cfg);
        let influence = InfluenceMap::constant(cfg.width(), cfg.depth(), 0.5);
        let field = generate_heightmap_mode(&cfg, &noise, &influence);
        let cell = cfg.cell_size();
        let dig = cfg.dig_depth_limit as f32;

        let (x, z) = (7, 11);
        let surface = noise.surface_height(x, z, 0.5) - dig;
        for y in 0..field.height() {
            let fy = y as f32 * cell;
            let v = field.get(x, y, z);
            if fy + cell <= surface {
                assert_eq!(v, MAX_VALUE);
            } else if fy - cell >= surface {
                assert_eq!(v, MIN_VALUE);
            }
        }
    }

    #[test]
    fn volumetric_mode_respects_clip_and_seal() {
        let cfg = small_cfg();
        let noise = NoiseField::new(&cfg);
        let influence = InfluenceMap::constant(cfg.width(), cfg.depth(), 0.5);
        let field = generate_volumetric_mode(&cfg, &noise, &influence);
        let cell = cfg.cell_size();
        let dig = cfg.dig_depth_limit as f32;

        for x in (0..field.width()).step_by(9) {
            for z in (0..field.depth()).step_by(9) {
                let surface = noise.surface_height(x, z, 0.5) - dig;
                let bottom = noise.bottom_height(x, z) - dig;
                for y in 0..field.height() {
                    let fy = y as f32 * cell;
                    if fy - cell >= surface {
                        assert_eq!(field.get(x, y, z), MIN_VALUE);
                    }
                    if fy + cell <= bottom {
                        assert!(field.get(x, y, z) >= SURFACE);
                    }
                }
            }
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let cfg = small_cfg();
        let influence = InfluenceMap::constant(cfg.width(), cfg.depth(), 0.3);
        let a = generate_volumetric_mode(&cfg, &NoiseField::new(&cfg), &influence);
        let b = generate_volumetric_mode(&cfg, &NoiseField::new(&cfg), &influence);
        assert_eq!(a, b);
    }

    #[test]
    fn seal_closes_vertical_bounds() {
        let cfg = small_cfg();
        let noise = NoiseField::new(&cfg);
        let influence = InfluenceMap::constant(cfg.width(), cfg.depth(), 0.5);
        let mut field = generate_volumetric_mode(&cfg, &noise, &influence);
        let (w, d) = (field.width(), field.depth());
        seal_vertical_bounds(&mut field, 0..w, 0..d, SURFACE);
        let top = field.height() - 1;
        for x in 0..w {
            for z in 0..d {
                assert!(field.get(x, 0, z) >= SURFACE);
                assert!(field.get(x, top, z) < SURFACE);
            }
        }
    }

    #[test]
    fn seal_column_patches_one_column() {
        let mut field = ScalarField::new(4, 6, 4);
        field.set(1, 0, 1, MIN_VALUE);
        // Exactly at the threshold still counts as solid, so the top row
        // must end up strictly below it.
        field.set(1, 5, 1, SURFACE);
        field.set(2, 0, 2, MIN_VALUE);

        seal_column(&mut field, 1, 1, SURFACE);
        assert!(field.get(1, 0, 1) >= SURFACE);
        assert!(field.get(1, 5, 1) < SURFACE);
        assert_eq!(field.get(2, 0, 2), MIN_VALUE);
    }

    #[test]
    fn border_map_stays_centered() {
        let cfg = small_cfg();
        let noise = NoiseField::new(&cfg);
        let map = generate_border_map(&cfg, &noise);
        let bound = cfg.texture.layer_rand * cfg.terrain_height_limit as f32;
        for x in 0..map.width() {
            for z in 0..map.depth() {
                let v = map.get(x, z);
                assert!(v.abs() <= bound, "border offset {v} exceeds {bound}");
            }
        }
    }
}
