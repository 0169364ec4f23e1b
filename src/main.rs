use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use relief::{
    ChunkSurface, GenerateMode, MeshBuild, TerrainConfig, TerrainEngine, Vec3,
    load_config_from_path,
};

#[derive(Parser, Debug)]
#[command(name = "relief", about = "Procedural voxel terrain generator")]
struct Args {
    /// TOML terrain config; missing fields fall back to defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed string override.
    #[arg(long)]
    seed: Option<String>,
    /// Carve caves and overhangs with 3D noise instead of a heightmap.
    #[arg(long)]
    volumetric: bool,
    /// Snap surface crossings to cell-edge midpoints.
    #[arg(long)]
    blocky: bool,
    /// Worker threads for chunk extraction; defaults to the CPU count.
    #[arg(long)]
    workers: Option<usize>,
    /// Hydraulic erosion passes to run at random spots after generation.
    #[arg(long, default_value_t = 0)]
    erode: usize,
}

#[derive(Default)]
struct StatsSurface {
    chunks: usize,
    vertices: usize,
    triangles: usize,
}

impl ChunkSurface for StatsSurface {
    fn apply_chunk_mesh(&mut self, cx: usize, cz: usize, mesh: &MeshBuild) {
        self.chunks += 1;
        self.vertices += mesh.positions.len();
        self.triangles += mesh.triangle_count();
        log::debug!(
            "chunk ({cx}, {cz}): {} vertices, {} triangles",
            mesh.positions.len(),
            mesh.triangle_count()
        );
    }
}

fn drain(engine: &mut TerrainEngine, surface: &mut StatsSurface) {
    while engine.is_rendering() {
        if engine.pump(surface) == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => load_config_from_path(path)?,
        None => TerrainConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }

    let mut engine = match args.workers {
        Some(n) => TerrainEngine::with_workers(cfg, n)?,
        None => TerrainEngine::new(cfg)?,
    };
    engine.set_interpolate(!args.blocky);

    let mode = if args.volumetric {
        GenerateMode::Volumetric
    } else {
        GenerateMode::Heightmap
    };

    let t0 = Instant::now();
    engine.generate(mode)?;
    log::info!("generation took {:.1?}", t0.elapsed());

    if args.erode > 0 {
        let cfg = engine.config();
        let width = cfg.terrain_width as f32;
        let depth = cfg.terrain_depth as f32;
        let seed = cfg.seed_int() as u32 as u64;
        let mut spots = ChaCha8Rng::seed_from_u64(seed ^ 0x45524f44);
        let t1 = Instant::now();
        for _ in 0..args.erode {
            let x = spots.gen_range(0.0..width);
            let z = spots.gen_range(0.0..depth);
            let center = Vec3::new(x, engine.get_height_at(x, z), z);
            let stats = engine.apply_erosion(center, width * 0.05)?;
            log::debug!(
                "erosion at ({x:.0}, {z:.0}): {} droplets, eroded {:.2}, deposited {:.2}",
                stats.droplets,
                stats.eroded,
                stats.deposited
            );
            // Each erosion pass queues its dirty chunks; let them finish
            // before sculpting against the field again.
            let mut sink = StatsSurface::default();
            drain(&mut engine, &mut sink);
        }
        log::info!("{} erosion passes took {:.1?}", args.erode, t1.elapsed());
    }

    let t2 = Instant::now();
    engine.render(None);
    let mut surface = StatsSurface::default();
    drain(&mut engine, &mut surface);
    log::info!(
        "extracted {} chunks ({} vertices, {} triangles) in {:.1?}",
        surface.chunks,
        surface.vertices,
        surface.triangles,
        t2.elapsed()
    );

    Ok(())
}
