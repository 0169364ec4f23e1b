//! Layered deterministic noise. All sampling is a pure function of the seed
//! and the queried coordinate; every per-layer multiplier and offset is drawn
//! once from a seeded stream at construction.

use fastnoise_lite::{FastNoiseLite, NoiseType};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::TerrainConfig;

/// Seeded noise generators for one terrain. Construction fixes every layer
/// multiplier and coordinate offset, so equal seeds reproduce equal samples
/// bit for bit.
pub struct NoiseField {
    perlin: FastNoiseLite,
    width: f32,
    height: f32,
    depth: f32,
    quality: f32,
    cell: f32,
    resolution: i32,
    terrain_density: f32,
    height_limit: f32,

    layers_2d: usize,
    offsets_2d: Vec<f32>,
    height_mult_2d: Vec<f32>,
    height_mult_bottom: Vec<f32>,
    density_mult_2d: Vec<f32>,
    // Height band left for the influence input after noise layers are
    // budgeted for, so the final surface stays inside [0, height_limit].
    basic_min_height: f32,
    basic_max_height: f32,
    bottom_min_height: f32,

    layers_3d: usize,
    height_mult_3d: Vec<f32>,
    density_mult_3d: Vec<f32>,
    max_3d: f32,
    offsets_3d: [f32; 12],

    border_offset: f32,
    rock_offset: f32,
    layer_rand: f32,
    layer_rand_density: f32,
    rock_density: f32,
}

impl NoiseField {
    pub fn new(cfg: &TerrainConfig) -> Self {
        Self::with_seed(cfg, cfg.seed_int())
    }

    pub fn with_seed(cfg: &TerrainConfig, seed: i32) -> Self {
        let mut perlin = FastNoiseLite::with_seed(seed);
        perlin.set_noise_type(Some(NoiseType::Perlin));
        perlin.set_frequency(Some(1.0));

        let mut rng = ChaCha8Rng::seed_from_u64(seed as u32 as u64);
        let np = &cfg.noise;
        let height_limit = cfg.terrain_height_limit as f32;

        let layers_2d = np.layers_2d;
        let mut height_mult_2d = vec![0.0f32; layers_2d];
        let mut height_mult_bottom = vec![0.0f32; layers_2d];
        let mut density_mult_2d = vec![0.0f32; layers_2d];
        height_mult_2d[0] = np.height_2d;
        height_mult_bottom[0] = np.bottom_noise_height;
        density_mult_2d[0] = np.density_2d;
        let mut basic_min_height = 0.0f32;
        let mut basic_max_height = height_limit;
        let mut bottom_min_height = 0.0f32;
        for i in 1..layers_2d {
            let j0: f32 = rng.gen_range(0.0..1.0);
            let j1: f32 = rng.gen_range(0.0..1.0);
            let j2: f32 = rng.gen_range(0.0..1.0);
            height_mult_2d[i] = height_mult_2d[i - 1] / (2.0 + j0 * 0.2 - 0.1);
            height_mult_bottom[i] = height_mult_bottom[i - 1] / (2.0 + j1 * 0.2 - 0.1);
            density_mult_2d[i] =
                density_mult_2d[i - 1] * (np.density_layer_base_2d + j2 * 0.2 - 0.1);
            bottom_min_height += 0.5 * height_mult_bottom[i] * height_limit;
            basic_min_height += 0.5 * height_mult_2d[i] * height_limit;
            basic_max_height -= 0.5 * height_mult_2d[i] * height_limit;
        }

        let mut offsets_2d = vec![0.0f32; layers_2d];
        for o in offsets_2d.iter_mut() {
            *o = rng.gen_range(0.0..1.0);
        }
        let border_offset: f32 = rng.gen_range(0.0..1.0);
        let rock_offset: f32 = rng.gen_range(0.0..1.0);

        let layers_3d = np.layers_3d;
        let mut height_mult_3d = vec![0.0f32; layers_3d];
        let mut density_mult_3d = vec![0.0f32; layers_3d];
        height_mult_3d[0] = 1.0;
        density_mult_3d[0] = np.density_3d;
        for i in 1..layers_3d {
            let j0: f32 = rng.gen_range(0.0..1.0);
            let j1: f32 = rng.gen_range(0.0..1.0);
            height_mult_3d[i] = height_mult_3d[i - 1] / (2.0 + (j0 - 0.5) * np.layer_rand_3d);
            density_mult_3d[i] = density_mult_3d[i - 1] * (2.0 + (j1 - 0.5) * np.layer_rand_3d);
        }
        let max_3d: f32 = height_mult_3d.iter().sum();

        let mut offsets_3d = [0.0f32; 12];
        for o in offsets_3d.iter_mut() {
            *o = rng.gen_range(0.0..1.0);
        }

        Self {
            perlin,
            width: cfg.width() as f32,
            height: cfg.height() as f32,
            depth: cfg.depth() as f32,
            quality: cfg.quality_factor(),
            cell: cfg.cell_size(),
            resolution: cfg.resolution,
            terrain_density: cfg.terrain_density,
            height_limit,
            layers_2d,
            offsets_2d,
            height_mult_2d,
            height_mult_bottom,
            density_mult_2d,
            basic_min_height,
            basic_max_height,
            bottom_min_height,
            layers_3d,
            height_mult_3d,
            density_mult_3d,
            max_3d,
            offsets_3d,
            border_offset,
            rock_offset,
            layer_rand: cfg.texture.layer_rand,
            layer_rand_density: cfg.texture.layer_rand_density,
            rock_density: cfg.texture.rock_density,
        }
    }

    /// Base 2D noise mapped into [0, 1].
    #[inline]
    fn perlin01(&self, x: f32, y: f32) -> f32 {
        (self.perlin.get_noise_2d(x, y) + 1.0) * 0.5
    }

    /// One noise octave. The non-simple form recenters the sample so a layer
    /// of amplitude `a` contributes within [-a/2 + 2*cell, a/2].
    fn octave(&self, x: f32, z: f32, offset: f32, density: f32, amplitude: f32, simple: bool) -> f32 {
        let xc = x / self.width * (density / self.quality) + offset;
        let zc = z / self.depth * (density / self.quality) + offset;
        let n = self.perlin01(xc, zc);
        if simple {
            n * amplitude
        } else {
            n * (amplitude - 2.0 * self.cell) + 2.0 * self.cell - amplitude / 2.0
        }
    }

    /// Target surface height (world units above world zero) for one column.
    /// `influence` is the external [0, 1] blueprint value; it selects where in
    /// the allowed band the column sits before noise layers are added.
    pub fn surface_height(&self, x: usize, z: usize, influence: f32) -> f32 {
        let base = influence.clamp(0.0, 1.0) * (self.basic_max_height - self.basic_min_height)
            + self.basic_min_height;
        self.layered_height(x, z, base, &self.height_mult_2d)
    }

    /// Low-amplitude surface sealing the terrain underside in volumetric mode.
    pub fn bottom_height(&self, x: usize, z: usize) -> f32 {
        self.layered_height(x, z, self.bottom_min_height, &self.height_mult_bottom)
    }

    fn layered_height(&self, x: usize, z: usize, base: f32, multipliers: &[f32]) -> f32 {
        let fx = (x as i64 * self.resolution as i64) as f32;
        let fz = (z as i64 * self.resolution as i64) as f32;
        let mut h = base;
        for i in 0..self.layers_2d {
            h += self.octave(
                fx,
                fz,
                self.offsets_2d[i],
                self.density_mult_2d[i] * self.terrain_density,
                multipliers[i] * self.height_limit,
                false,
            );
        }
        h
    }

    /// Signed offset (world units) that wobbles texture band borders.
    pub fn border_offset_at(&self, x: usize, z: usize) -> f32 {
        let fx = (x as i64 * self.resolution as i64) as f32;
        let fz = (z as i64 * self.resolution as i64) as f32;
        self.octave(
            fx,
            fz,
            self.border_offset,
            self.layer_rand_density,
            self.layer_rand * self.height_limit,
            false,
        ) - 0.5 * self.layer_rand
    }

    /// Rock scatter value in [0, 1] for the vegetation collaborator.
    pub fn rock_value(&self, x: usize, z: usize) -> f32 {
        let fx = (x as i64 * self.resolution as i64) as f32;
        let fz = (z as i64 * self.resolution as i64) as f32;
        self.octave(fx, fz, self.rock_offset, self.rock_density, 1.0, true)
    }

    /// Pseudo-3D coherent noise in [0, 1]: the mean of six pairwise 2D
    /// samples over axis permutations, each pair with its own seeded offset.
    pub fn sample3(&self, x: i32, y: i32, z: i32, density: f32) -> f32 {
        let xc = x as f32 / self.width * (density / self.quality);
        let yc = y as f32 / self.height * (density / self.quality);
        let zc = z as f32 / self.depth * (density / self.quality);
        let o = &self.offsets_3d;

        let ab = self.perlin01(xc + o[0], yc + o[1]);
        let bc = self.perlin01(yc + o[2], zc + o[3]);
        let ac = self.perlin01(xc + o[4], zc + o[5]);
        let ba = self.perlin01(yc + o[6], zc + o[7]);
        let cb = self.perlin01(zc + o[8], yc + o[9]);
        let ca = self.perlin01(zc + o[10], xc + o[11]);

        (ab + bc + ac + ba + cb + ca) / 6.0
    }

    /// Layered pseudo-3D noise in [0, 1] used by volumetric generation.
    pub fn volume_noise(&self, x: i32, y: i32, z: i32) -> f32 {
        let mut v = 0.0f32;
        for i in 0..self.layers_3d {
            v += self.sample3(x, y, z, self.density_mult_3d[i]) * self.height_mult_3d[i];
        }
        v / self.max_3d
    }

    /// The [min, max] world-unit band procedural surface heights occupy
    /// before noise layers are applied.
    #[inline]
    pub fn height_band(&self) -> (f32, f32) {
        (self.basic_min_height, self.basic_max_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;

    fn small_cfg() -> TerrainConfig {
        let mut cfg = TerrainConfig::default();
        cfg.terrain_width = 100;
        cfg.terrain_depth = 100;
        cfg.build_height_limit = 100;
        cfg.dig_depth_limit = -50;
        cfg.terrain_height_limit = 100;
        cfg.seed = "abc".to_string();
        cfg.validate().unwrap();
        cfg
    }

    #[test]
    fn same_seed_reproduces_samples() {
        let cfg = small_cfg();
        let a = NoiseField::new(&cfg);
        let b = NoiseField::new(&cfg);
        for (x, z) in [(0usize, 0usize), (3, 7), (19, 11)] {
            assert_eq!(a.surface_height(x, z, 0.5), b.surface_height(x, z, 0.5));
            assert_eq!(a.bottom_height(x, z), b.bottom_height(x, z));
            assert_eq!(a.border_offset_at(x, z), b.border_offset_at(x, z));
            assert_eq!(a.rock_value(x, z), b.rock_value(x, z));
        }
        assert_eq!(a.volume_noise(4, 9, 2), b.volume_noise(4, 9, 2));
    }

    #[test]
    fn different_seed_changes_samples() {
        let cfg = small_cfg();
        let a = NoiseField::with_seed(&cfg, 1);
        let b = NoiseField::with_seed(&cfg, 2);
        let mut any_diff = false;
        for (x, z) in [(0usize, 0usize), (5, 5), (13, 2), (7, 17)] {
            if a.surface_height(x, z, 0.5) != b.surface_height(x, z, 0.5) {
                any_diff = true;
            }
        }
        assert!(any_diff);
    }

    #[test]
    fn height_band_is_inside_limits() {
        let cfg = small_cfg();
        let nf = NoiseField::new(&cfg);
        let (lo, hi) = nf.height_band();
        assert!(lo >= 0.0);
        assert!(hi <= cfg.terrain_height_limit as f32);
        assert!(lo < hi);
    }

    #[test]
    fn samples_stay_in_unit_range() {
        let cfg = small_cfg();
        let nf = NoiseField::new(&cfg);
        for x in 0..6 {
            for z in 0..6 {
                let r = nf.rock_value(x, z);
                assert!((0.0..=1.0).contains(&r), "rock {r}");
                for y in 0..4 {
                    let v = nf.volume_noise(x as i32, y, z as i32);
                    assert!((0.0..=1.0).contains(&v), "volume {v}");
                    let s = nf.sample3(x as i32, y, z as i32, 0.8);
                    assert!((0.0..=1.0).contains(&s), "sample3 {s}");
                }
            }
        }
    }
}
