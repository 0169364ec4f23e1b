//! Terrain configuration: dimensions, noise parameters, texture thresholds,
//! erosion tuning. Deserialized from TOML with per-field defaults.

use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::seed::hash_seed;

/// Whole-terrain configuration. Immutable during one generation pass;
/// changing any field invalidates the scalar field and all chunks.
#[derive(Clone, Debug, Deserialize)]
pub struct TerrainConfig {
    /// Terrain footprint in world units.
    #[serde(default = "default_terrain_width")]
    pub terrain_width: i32,
    #[serde(default = "default_terrain_depth")]
    pub terrain_depth: i32,
    /// Cells per 100 world units.
    #[serde(default = "default_resolution")]
    pub resolution: i32,
    /// Chunk edge length in world units.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: i32,
    /// Vertical sculpting limits in world units; dig limit is negative.
    #[serde(default = "default_build_height_limit")]
    pub build_height_limit: i32,
    #[serde(default = "default_dig_depth_limit")]
    pub dig_depth_limit: i32,
    /// Maximum height procedural terrain generates at, in world units.
    #[serde(default = "default_terrain_height_limit")]
    pub terrain_height_limit: i32,
    /// Base 2D noise frequency scale.
    #[serde(default = "default_terrain_density")]
    pub terrain_density: f32,
    #[serde(default = "default_seed")]
    pub seed: String,
    #[serde(default)]
    pub noise: NoiseParams,
    #[serde(default)]
    pub texture: TextureParams,
    #[serde(default)]
    pub erosion: ErosionParams,
}

fn default_terrain_width() -> i32 {
    1000
}
fn default_terrain_depth() -> i32 {
    1000
}
fn default_resolution() -> i32 {
    20
}
fn default_chunk_size() -> i32 {
    100
}
fn default_build_height_limit() -> i32 {
    1000
}
fn default_dig_depth_limit() -> i32 {
    -500
}
fn default_terrain_height_limit() -> i32 {
    500
}
fn default_terrain_density() -> f32 {
    0.02
}
fn default_seed() -> String {
    "example_seed".to_string()
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            terrain_width: default_terrain_width(),
            terrain_depth: default_terrain_depth(),
            resolution: default_resolution(),
            chunk_size: default_chunk_size(),
            build_height_limit: default_build_height_limit(),
            dig_depth_limit: default_dig_depth_limit(),
            terrain_height_limit: default_terrain_height_limit(),
            terrain_density: default_terrain_density(),
            seed: default_seed(),
            noise: NoiseParams::default(),
            texture: TextureParams::default(),
            erosion: ErosionParams::default(),
        }
    }
}

impl TerrainConfig {
    /// Cells per world unit.
    #[inline]
    pub fn quality_factor(&self) -> f32 {
        self.resolution as f32 / 100.0
    }

    /// Field width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        (self.terrain_width as f32 * self.quality_factor()).floor() as usize
    }

    /// Field height in cells, covering the dig-to-build band.
    #[inline]
    pub fn height(&self) -> usize {
        ((self.build_height_limit - self.dig_depth_limit) as f32 * self.quality_factor()).floor()
            as usize
    }

    /// Field depth in cells.
    #[inline]
    pub fn depth(&self) -> usize {
        (self.terrain_depth as f32 * self.quality_factor()).floor() as usize
    }

    /// World-unit size of one cell.
    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.terrain_width as f32 / self.width() as f32
    }

    /// Chunk edge length in cells.
    #[inline]
    pub fn chunk_cells(&self) -> usize {
        (self.chunk_size as f32 * self.quality_factor()).floor() as usize
    }

    /// Lowest cell index procedural terrain reaches (y of world height 0).
    #[inline]
    pub fn min_terrain_cell(&self) -> usize {
        (self.dig_depth_limit.abs() as f32 * self.quality_factor()).floor() as usize
    }

    /// Highest cell index procedural terrain reaches.
    #[inline]
    pub fn max_terrain_cell(&self) -> usize {
        ((self.dig_depth_limit.abs() + self.terrain_height_limit) as f32 * self.quality_factor())
            .floor() as usize
    }

    #[inline]
    pub fn seed_int(&self) -> i32 {
        hash_seed(&self.seed)
    }

    /// Rejects degenerate configurations before any field allocation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.terrain_width <= 0 {
            return Err(ConfigError::NonPositive("terrain_width", self.terrain_width));
        }
        if self.terrain_depth <= 0 {
            return Err(ConfigError::NonPositive("terrain_depth", self.terrain_depth));
        }
        if self.resolution <= 0 {
            return Err(ConfigError::NonPositive("resolution", self.resolution));
        }
        if self.chunk_size <= 0 {
            return Err(ConfigError::NonPositive("chunk_size", self.chunk_size));
        }
        if self.terrain_height_limit <= 0 {
            return Err(ConfigError::NonPositive(
                "terrain_height_limit",
                self.terrain_height_limit,
            ));
        }
        if self.dig_depth_limit > 0 {
            return Err(ConfigError::PositiveDigLimit(self.dig_depth_limit));
        }
        if self.build_height_limit <= self.dig_depth_limit {
            return Err(ConfigError::InvertedVerticalLimits {
                build: self.build_height_limit,
                dig: self.dig_depth_limit,
            });
        }
        if self.width() < 2 || self.height() < 2 || self.depth() < 2 {
            return Err(ConfigError::FieldTooSmall {
                width: self.width(),
                height: self.height(),
                depth: self.depth(),
            });
        }
        if self.chunk_cells() == 0 {
            return Err(ConfigError::NonPositive("chunk_size (cells)", 0));
        }
        if self.noise.layers_2d == 0 || self.noise.layers_3d == 0 {
            return Err(ConfigError::NoNoiseLayers);
        }
        for (name, v) in [
            ("texture.dirt_start", self.texture.dirt_start),
            ("texture.rock_start", self.texture.rock_start),
            ("texture.snow_start", self.texture.snow_start),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::ThresholdOutOfRange(name, v));
            }
        }
        Ok(())
    }
}

/// Layered noise parameters for both 2D height noise and the pseudo-3D
/// volumetric noise.
#[derive(Clone, Debug, Deserialize)]
pub struct NoiseParams {
    #[serde(default = "default_layers_2d")]
    pub layers_2d: usize,
    #[serde(default = "default_height_2d")]
    pub height_2d: f32,
    #[serde(default = "default_density_2d")]
    pub density_2d: f32,
    #[serde(default = "default_density_layer_base_2d")]
    pub density_layer_base_2d: f32,
    #[serde(default = "default_layers_3d")]
    pub layers_3d: usize,
    #[serde(default = "default_power_3d")]
    pub power_3d: f32,
    #[serde(default = "default_density_3d")]
    pub density_3d: f32,
    #[serde(default = "default_layer_rand_3d")]
    pub layer_rand_3d: f32,
    /// Amplitude of the low 2D surface that seals the terrain underside in
    /// volumetric mode.
    #[serde(default = "default_bottom_noise_height")]
    pub bottom_noise_height: f32,
}

fn default_layers_2d() -> usize {
    5
}
fn default_height_2d() -> f32 {
    0.2
}
fn default_density_2d() -> f32 {
    2.0
}
fn default_density_layer_base_2d() -> f32 {
    2.0
}
fn default_layers_3d() -> usize {
    5
}
fn default_power_3d() -> f32 {
    0.8
}
fn default_density_3d() -> f32 {
    0.8
}
fn default_layer_rand_3d() -> f32 {
    0.4
}
fn default_bottom_noise_height() -> f32 {
    0.1
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            layers_2d: default_layers_2d(),
            height_2d: default_height_2d(),
            density_2d: default_density_2d(),
            density_layer_base_2d: default_density_layer_base_2d(),
            layers_3d: default_layers_3d(),
            power_3d: default_power_3d(),
            density_3d: default_density_3d(),
            layer_rand_3d: default_layer_rand_3d(),
            bottom_noise_height: default_bottom_noise_height(),
        }
    }
}

/// Texture atlas banding. The atlas is a vertical strip of four square bands
/// (grass, dirt, rock, snow from the bottom), each `texture_size` texels.
#[derive(Clone, Debug, Deserialize)]
pub struct TextureParams {
    #[serde(default = "default_texture_size")]
    pub texture_size: i32,
    /// Texels one cell edge maps to in the atlas.
    #[serde(default = "default_cube_pixel_size")]
    pub cube_pixel_size: i32,
    /// Band start heights as fractions of the terrain height limit.
    #[serde(default = "default_dirt_start")]
    pub dirt_start: f32,
    #[serde(default = "default_rock_start")]
    pub rock_start: f32,
    #[serde(default = "default_snow_start")]
    pub snow_start: f32,
    /// Amplitude and frequency of the noise that wobbles band borders.
    #[serde(default = "default_layer_rand")]
    pub layer_rand: f32,
    #[serde(default = "default_layer_rand_density")]
    pub layer_rand_density: f32,
    /// Rock scatter map tuning (consumed by the vegetation collaborator).
    #[serde(default = "default_rock_threshold")]
    pub rock_threshold: f32,
    #[serde(default = "default_rock_density")]
    pub rock_density: f32,
}

fn default_texture_size() -> i32 {
    512
}
fn default_cube_pixel_size() -> i32 {
    70
}
fn default_dirt_start() -> f32 {
    0.4
}
fn default_rock_start() -> f32 {
    0.65
}
fn default_snow_start() -> f32 {
    0.9
}
fn default_layer_rand() -> f32 {
    0.2
}
fn default_layer_rand_density() -> f32 {
    0.12
}
fn default_rock_threshold() -> f32 {
    0.8
}
fn default_rock_density() -> f32 {
    0.1
}

impl Default for TextureParams {
    fn default() -> Self {
        Self {
            texture_size: default_texture_size(),
            cube_pixel_size: default_cube_pixel_size(),
            dirt_start: default_dirt_start(),
            rock_start: default_rock_start(),
            snow_start: default_snow_start(),
            layer_rand: default_layer_rand(),
            layer_rand_density: default_layer_rand_density(),
            rock_threshold: default_rock_threshold(),
            rock_density: default_rock_density(),
        }
    }
}

impl TextureParams {
    /// Classifies a border-offset height (world units) into a material band.
    pub fn band_for(&self, height: f32, height_limit: f32) -> TerrainBand {
        let mut band = TerrainBand::Grass;
        if height > height_limit * self.dirt_start {
            band = TerrainBand::Dirt;
        }
        if height > height_limit * self.rock_start {
            band = TerrainBand::Rock;
        }
        if height > height_limit * self.snow_start {
            band = TerrainBand::Snow;
        }
        band
    }
}

/// Material band of the surface at a point, ordered from low to high ground.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TerrainBand {
    Grass,
    Dirt,
    Rock,
    Snow,
}

impl TerrainBand {
    /// Vertical atlas band index, grass at the bottom.
    #[inline]
    pub fn atlas_index(self) -> i32 {
        match self {
            TerrainBand::Grass => 0,
            TerrainBand::Dirt => 1,
            TerrainBand::Rock => 2,
            TerrainBand::Snow => 3,
        }
    }
}

/// Droplet erosion tuning.
#[derive(Clone, Debug, Deserialize)]
pub struct ErosionParams {
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_droplet_lifetime")]
    pub max_droplet_lifetime: usize,
    /// 0 = water turns downhill instantly, 1 = it never changes direction.
    #[serde(default = "default_inertia")]
    pub inertia: f32,
    #[serde(default = "default_capacity_factor")]
    pub sediment_capacity_factor: f32,
    #[serde(default = "default_min_capacity")]
    pub min_sediment_capacity: f32,
    #[serde(default = "default_erode_speed")]
    pub erode_speed: f32,
    #[serde(default = "default_deposit_speed")]
    pub deposit_speed: f32,
    #[serde(default = "default_evaporate_speed")]
    pub evaporate_speed: f32,
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_initial_water")]
    pub initial_water: f32,
    #[serde(default = "default_initial_speed")]
    pub initial_speed: f32,
    /// Radius in cells that a single erosion step spreads over.
    #[serde(default = "default_erode_radius")]
    pub erode_radius: i32,
}

fn default_iterations() -> usize {
    3
}
fn default_droplet_lifetime() -> usize {
    30
}
fn default_inertia() -> f32 {
    0.05
}
fn default_capacity_factor() -> f32 {
    4.0
}
fn default_min_capacity() -> f32 {
    0.5
}
fn default_erode_speed() -> f32 {
    0.3
}
fn default_deposit_speed() -> f32 {
    0.3
}
fn default_evaporate_speed() -> f32 {
    0.01
}
fn default_gravity() -> f32 {
    4.0
}
fn default_initial_water() -> f32 {
    1.0
}
fn default_initial_speed() -> f32 {
    1.0
}
fn default_erode_radius() -> i32 {
    2
}

impl Default for ErosionParams {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            max_droplet_lifetime: default_droplet_lifetime(),
            inertia: default_inertia(),
            sediment_capacity_factor: default_capacity_factor(),
            min_sediment_capacity: default_min_capacity(),
            erode_speed: default_erode_speed(),
            deposit_speed: default_deposit_speed(),
            evaporate_speed: default_evaporate_speed(),
            gravity: default_gravity(),
            initial_water: default_initial_water(),
            initial_speed: default_initial_speed(),
            erode_radius: default_erode_radius(),
        }
    }
}

/// Configuration rejected before allocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NonPositive(&'static str, i32),
    PositiveDigLimit(i32),
    InvertedVerticalLimits { build: i32, dig: i32 },
    FieldTooSmall { width: usize, height: usize, depth: usize },
    NoNoiseLayers,
    ThresholdOutOfRange(&'static str, f32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositive(name, v) => {
                write!(f, "{name} must be positive (got {v})")
            }
            ConfigError::PositiveDigLimit(v) => {
                write!(f, "dig_depth_limit must be <= 0 (got {v})")
            }
            ConfigError::InvertedVerticalLimits { build, dig } => {
                write!(
                    f,
                    "build_height_limit ({build}) must exceed dig_depth_limit ({dig})"
                )
            }
            ConfigError::FieldTooSmall {
                width,
                height,
                depth,
            } => {
                write!(
                    f,
                    "field dimensions too small for extraction: {width}x{height}x{depth}"
                )
            }
            ConfigError::NoNoiseLayers => write!(f, "noise layer counts must be at least 1"),
            ConfigError::ThresholdOutOfRange(name, v) => {
                write!(f, "{name} must lie in [0, 1] (got {v})")
            }
        }
    }
}

impl Error for ConfigError {}

/// Loads a TOML config file; missing fields fall back to defaults.
pub fn load_config_from_path(path: &Path) -> Result<TerrainConfig, Box<dyn Error>> {
    let txt = fs::read_to_string(path)?;
    let cfg: TerrainConfig = toml::from_str(&txt)?;
    cfg.validate()?;
    Ok(cfg)
}
