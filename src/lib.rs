//! Voxel terrain engine: scalar-field generation, chunked marching-cubes
//! extraction on a worker pool, and interactive sculpting.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use relief_field::{
    Grid2, HeightMap, ScalarField, generate_border_map, generate_heightmap_mode,
    generate_rock_map, generate_volumetric_mode, seal_column, seal_vertical_bounds,
};
use relief_mesh_cpu::{ExtractParams, ShadeParams};
use relief_runtime::{ChunkScheduler, RenderPass};
use relief_sculpt::{Brush, BrushMode, DirtySet};
use relief_world::{ConfigError, NoiseField};

pub use relief_field::{InfluenceMap, MAX_VALUE, MIN_VALUE, SURFACE};
pub use relief_geom::Vec3;
pub use relief_mesh_cpu::MeshBuild;
pub use relief_runtime::{ChunkState, ChunkSurface};
pub use relief_sculpt::ErosionStats;
pub use relief_world::{TerrainBand, TerrainConfig, load_config_from_path};

/// How the scalar field is filled from noise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerateMode {
    /// Layered 2D noise defines one surface height per column.
    Heightmap,
    /// Pseudo-3D noise carves caves and overhangs, clipped under the 2D
    /// surface.
    Volumetric,
}

/// A sculpt brush in world units. Converted to cell units against the
/// engine's resolution before it touches the field.
#[derive(Clone, Copy, Debug)]
pub struct SculptBrush {
    pub center: Vec3,
    pub radius: f32,
    pub strength: f32,
    pub falloff: f32,
    pub noise_strength: f32,
    pub noise_density: f32,
}

/// Sculpt operation applied under a brush.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BrushOp {
    /// Deposit material inside the sphere.
    Add,
    /// Carve material out of the sphere.
    Remove,
    /// Displace the surface with signed 3D noise.
    Noise,
    /// Move columns toward a captured reference height (world units).
    Flatten { reference_height: f32 },
}

impl Default for SculptBrush {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: 10.0,
            strength: 1.0,
            falloff: 2.0,
            noise_strength: 0.3,
            noise_density: 16.0,
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    Config(ConfigError),
    /// An influence map whose footprint does not match the field's.
    InfluenceSizeMismatch {
        got: (usize, usize),
        want: (usize, usize),
    },
    /// A render pass is in flight; sculpting against the snapshot being
    /// extracted would tear the mesh.
    RenderInFlight,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Config(e) => write!(f, "{e}"),
            EngineError::InfluenceSizeMismatch { got, want } => write!(
                f,
                "influence map is {}x{}, field needs {}x{}",
                got.0, got.1, want.0, want.1
            ),
            EngineError::RenderInFlight => write!(f, "a render pass is still in flight"),
        }
    }
}

impl Error for EngineError {}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::Config(e)
    }
}

/// Owns the scalar field and every map derived from it, plus the chunk
/// scheduler. One engine per terrain; all methods run on the controller
/// thread, only extraction fans out to workers.
pub struct TerrainEngine {
    cfg: TerrainConfig,
    noise: NoiseField,
    mode: GenerateMode,
    interpolate: bool,

    field: Arc<ScalarField>,
    influence: InfluenceMap,
    border_map: Arc<Grid2>,
    rock_map: Grid2,
    height_map: HeightMap,

    scheduler: ChunkScheduler,
    rng: ChaCha8Rng,
}

impl TerrainEngine {
    pub fn new(cfg: TerrainConfig) -> Result<Self, EngineError> {
        cfg.validate()?;
        let scheduler = ChunkScheduler::new(cfg.width(), cfg.depth(), cfg.chunk_cells());
        Ok(Self::build(cfg, scheduler))
    }

    pub fn with_workers(cfg: TerrainConfig, workers: usize) -> Result<Self, EngineError> {
        cfg.validate()?;
        let scheduler =
            ChunkScheduler::with_workers(cfg.width(), cfg.depth(), cfg.chunk_cells(), workers);
        Ok(Self::build(cfg, scheduler))
    }

    fn build(cfg: TerrainConfig, scheduler: ChunkScheduler) -> Self {
        let noise = NoiseField::new(&cfg);
        let field = Arc::new(ScalarField::new(cfg.width(), cfg.height(), cfg.depth()));
        let influence = InfluenceMap::constant(cfg.width(), cfg.depth(), 1.0);
        let border_map = Arc::new(Grid2::new(cfg.width(), cfg.depth()));
        let rock_map = Grid2::new(cfg.width(), cfg.depth());
        let height_map =
            HeightMap::from_field(&field, cfg.cell_size(), cfg.dig_depth_limit as f32);
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed_int() as u32 as u64);
        Self {
            cfg,
            noise,
            mode: GenerateMode::Heightmap,
            interpolate: true,
            field,
            influence,
            border_map,
            rock_map,
            height_map,
            scheduler,
            rng,
        }
    }

    /// Fills the field from noise and rebuilds every derived map. Discards
    /// any sculpted state.
    pub fn generate(&mut self, mode: GenerateMode) -> Result<(), EngineError> {
        if self.scheduler.is_rendering() {
            return Err(EngineError::RenderInFlight);
        }
        self.mode = mode;
        let mut field = match mode {
            GenerateMode::Heightmap => {
                generate_heightmap_mode(&self.cfg, &self.noise, &self.influence)
            }
            GenerateMode::Volumetric => {
                generate_volumetric_mode(&self.cfg, &self.noise, &self.influence)
            }
        };
        let (w, d) = (field.width(), field.depth());
        seal_vertical_bounds(&mut field, 0..w, 0..d, SURFACE);
        self.field = Arc::new(field);
        self.border_map = Arc::new(generate_border_map(&self.cfg, &self.noise));
        self.rock_map = generate_rock_map(&self.cfg, &self.noise);
        self.height_map = HeightMap::from_field(
            &self.field,
            self.cfg.cell_size(),
            self.cfg.dig_depth_limit as f32,
        );
        self.rng = ChaCha8Rng::seed_from_u64(self.cfg.seed_int() as u32 as u64);
        log::info!(
            "generated {}x{}x{} field ({:?} mode)",
            self.field.width(),
            self.field.height(),
            self.field.depth(),
            mode
        );
        Ok(())
    }

    /// Replaces the external influence layer. Takes effect on the next
    /// `generate`.
    pub fn set_influence(&mut self, influence: InfluenceMap) -> Result<(), EngineError> {
        if influence.width() != self.cfg.width() || influence.depth() != self.cfg.depth() {
            return Err(EngineError::InfluenceSizeMismatch {
                got: (influence.width(), influence.depth()),
                want: (self.cfg.width(), self.cfg.depth()),
            });
        }
        self.influence = influence;
        Ok(())
    }

    /// When false every surface crossing snaps to the cell-edge midpoint.
    pub fn set_interpolate(&mut self, interpolate: bool) {
        self.interpolate = interpolate;
    }

    /// World position of cell (0, 0, 0). World height 0 sits at the dig
    /// depth limit above the field floor.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        Vec3::new(0.0, self.cfg.dig_depth_limit as f32, 0.0)
    }

    fn render_pass(&self) -> RenderPass {
        RenderPass {
            field: Arc::clone(&self.field),
            border: Arc::clone(&self.border_map),
            params: ExtractParams {
                threshold: SURFACE,
                cell_size: self.cfg.cell_size(),
                origin: self.origin(),
                interpolate: self.interpolate,
            },
            shade: ShadeParams {
                texture: self.cfg.texture.clone(),
                height_limit: self.cfg.terrain_height_limit as f32,
                seed: self.cfg.seed_int(),
            },
            y_min: 0,
            y_max: self.field.height() - 1,
        }
    }

    /// Rebuilds the maps derived from the current field and noise without
    /// regenerating the field itself.
    pub fn regenerate_derived(&mut self) {
        self.border_map = Arc::new(generate_border_map(&self.cfg, &self.noise));
        self.rock_map = generate_rock_map(&self.cfg, &self.noise);
        self.height_map = HeightMap::from_field(
            &self.field,
            self.cfg.cell_size(),
            self.cfg.dig_depth_limit as f32,
        );
    }

    /// Queues extraction of the given chunks, or of every chunk when `None`.
    /// Returns false if a pass is already in flight.
    pub fn render(&mut self, chunks: Option<&[(usize, usize)]>) -> bool {
        let pass = self.render_pass();
        self.scheduler.render(&pass, chunks)
    }

    /// Drains finished chunk meshes onto `surface`. Returns the number of
    /// chunks committed this call.
    pub fn pump(&mut self, surface: &mut dyn ChunkSurface) -> usize {
        self.scheduler.pump(surface)
    }

    #[inline]
    pub fn is_rendering(&self) -> bool {
        self.scheduler.is_rendering()
    }

    #[inline]
    pub fn chunk_mesh(&self, cx: usize, cz: usize) -> Option<&MeshBuild> {
        self.scheduler.chunk_mesh(cx, cz)
    }

    #[inline]
    pub fn width_chunks(&self) -> usize {
        self.scheduler.width_chunks()
    }

    #[inline]
    pub fn depth_chunks(&self) -> usize {
        self.scheduler.depth_chunks()
    }

    #[inline]
    pub fn config(&self) -> &TerrainConfig {
        &self.cfg
    }

    #[inline]
    pub fn field(&self) -> &ScalarField {
        &self.field
    }

    #[inline]
    pub fn rock_map(&self) -> &Grid2 {
        &self.rock_map
    }

    fn cell_brush(&self, brush: &SculptBrush) -> Brush {
        let cell = self.cfg.cell_size();
        Brush {
            center_x: brush.center.x / cell,
            center_y: (brush.center.y - self.cfg.dig_depth_limit as f32) / cell,
            center_z: brush.center.z / cell,
            radius: brush.radius / cell,
            strength: brush.strength,
            falloff: brush.falloff,
            noise_strength: brush.noise_strength,
            noise_density: brush.noise_density,
        }
    }

    /// Applies a field edit, refreshes touched height-map columns, and
    /// queues re-extraction of the dirty chunks.
    fn sculpt_with(
        &mut self,
        edit: impl FnOnce(&mut ScalarField, &NoiseField, &mut ChaCha8Rng, &mut DirtySet),
    ) -> Result<DirtySet, EngineError> {
        if self.scheduler.is_rendering() {
            log::debug!("sculpt refused, render pass in flight");
            return Err(EngineError::RenderInFlight);
        }
        let mut dirty = DirtySet::new();
        let field = Arc::make_mut(&mut self.field);
        edit(field, &self.noise, &mut self.rng, &mut dirty);
        // Edits write straight through the vertical bounds; patch the touched
        // columns closed again before anything extracts this snapshot.
        for (x, z) in dirty.iter() {
            seal_column(field, x, z, SURFACE);
            self.height_map.update_column(field, x, z);
        }
        if !dirty.is_empty() {
            let chunks = dirty.chunks(
                self.cfg.chunk_cells(),
                self.scheduler.width_chunks(),
                self.scheduler.depth_chunks(),
            );
            let pass = self.render_pass();
            self.scheduler.render(&pass, Some(&chunks));
        }
        Ok(dirty)
    }

    /// Applies one sculpt operation under the brush. Fails with
    /// `RenderInFlight` while a pass is running; otherwise the edit lands,
    /// touched height-map columns refresh, and the dirty chunks re-extract.
    pub fn apply_brush(&mut self, brush: &SculptBrush, op: BrushOp) -> Result<(), EngineError> {
        let b = self.cell_brush(brush);
        match op {
            BrushOp::Add => self.sculpt_with(|field, noise, _, dirty| {
                relief_sculpt::apply_brush(field, noise, &b, BrushMode::Add, dirty);
            }),
            BrushOp::Remove => self.sculpt_with(|field, noise, _, dirty| {
                relief_sculpt::apply_brush(field, noise, &b, BrushMode::Remove, dirty);
            }),
            BrushOp::Noise => self.sculpt_with(|field, noise, _, dirty| {
                relief_sculpt::noise_brush(field, noise, &b, dirty);
            }),
            BrushOp::Flatten { reference_height } => {
                let reference =
                    (reference_height - self.cfg.dig_depth_limit as f32) / self.cfg.cell_size();
                self.sculpt_with(|field, noise, _, dirty| {
                    relief_sculpt::flatten(field, noise, &b, reference, dirty);
                })
            }
        }
        .map(|_| ())
    }

    /// Runs one hydraulic erosion pass of droplets spawned around `center`
    /// (world units) within `radius` world units.
    pub fn apply_erosion(
        &mut self,
        center: Vec3,
        radius: f32,
    ) -> Result<ErosionStats, EngineError> {
        let cell = self.cfg.cell_size();
        let cx = center.x / cell;
        let cy = (center.y - self.cfg.dig_depth_limit as f32) / cell;
        let cz = center.z / cell;
        let radius_cells = (radius / cell).round().max(1.0) as i32;
        let params = self.cfg.erosion.clone();
        let mut stats = ErosionStats::default();
        self.sculpt_with(|field, _, rng, dirty| {
            stats = relief_sculpt::erode(field, &params, cx, cy, cz, radius_cells, rng, dirty);
        })?;
        Ok(stats)
    }

    /// Surface elevation at a world-space point, bilinear over the four
    /// surrounding columns.
    pub fn get_height_at(&self, wx: f32, wz: f32) -> f32 {
        let cell = self.cfg.cell_size();
        let fx = wx / cell;
        let fz = wz / cell;
        let x0 = fx.floor() as i32;
        let z0 = fz.floor() as i32;
        let tx = (fx - x0 as f32).clamp(0.0, 1.0);
        let tz = (fz - z0 as f32).clamp(0.0, 1.0);
        let h00 = self.height_map.get_clamped(x0, z0);
        let h10 = self.height_map.get_clamped(x0 + 1, z0);
        let h01 = self.height_map.get_clamped(x0, z0 + 1);
        let h11 = self.height_map.get_clamped(x0 + 1, z0 + 1);
        (h00 * (1.0 - tx) + h10 * tx) * (1.0 - tz) + (h01 * (1.0 - tx) + h11 * tx) * tz
    }

    /// Material band at a world-space point, using the same border-wobbled
    /// thresholds the mesh UVs use.
    pub fn get_terrain_band(&self, wx: f32, wz: f32) -> TerrainBand {
        let cell = self.cfg.cell_size();
        let x = (wx / cell).round() as i32;
        let z = (wz / cell).round() as i32;
        let h = self.get_height_at(wx, wz) + self.border_map.get_clamped(x, z);
        self.cfg
            .texture
            .band_for(h, self.cfg.terrain_height_limit as f32)
    }

    /// Mode of the last `generate` call.
    #[inline]
    pub fn generate_mode(&self) -> GenerateMode {
        self.mode
    }

    /// Raw field value at a world-space point, `None` outside the field.
    pub fn get_field_value(&self, p: Vec3) -> Option<i16> {
        let cell = self.cfg.cell_size();
        let x = (p.x / cell).round() as i32;
        let y = ((p.y - self.cfg.dig_depth_limit as f32) / cell).round() as i32;
        let z = (p.z / cell).round() as i32;
        self.field.try_get(x, y, z)
    }
}
