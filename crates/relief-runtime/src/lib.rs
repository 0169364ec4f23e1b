//! Chunk render scheduling and worker orchestration.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};

use relief_field::{Grid2, ScalarField};
use relief_mesh_cpu::{ExtractParams, MeshBuild, Region, ShadeParams, extract_region};

/// One chunk extraction handed to a worker. Carries field and border map
/// snapshots so sculpting can continue on fresh copies while workers read.
#[derive(Clone)]
pub struct RenderJob {
    pub cx: usize,
    pub cz: usize,
    pub pass_id: u64,
    pub field: Arc<ScalarField>,
    pub border: Arc<Grid2>,
    pub params: ExtractParams,
    pub shade: ShadeParams,
    pub region: Region,
}

pub struct JobOut {
    pub cx: usize,
    pub cz: usize,
    pub pass_id: u64,
    pub mesh: MeshBuild,
    pub t_mesh_ms: u32,
}

/// Inputs shared by every chunk of one render pass.
#[derive(Clone)]
pub struct RenderPass {
    pub field: Arc<ScalarField>,
    pub border: Arc<Grid2>,
    pub params: ExtractParams,
    pub shade: ShadeParams,
    /// Cube y range worth extracting; anything outside is known empty.
    pub y_min: usize,
    pub y_max: usize,
}

/// Lifecycle of one chunk's mesh within the current pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    Idle,
    Queued,
    Committed,
}

struct ChunkSlot {
    state: ChunkState,
    mesh: Option<MeshBuild>,
}

/// Where committed chunk meshes land: a GPU uploader, a file writer, a test
/// recorder. Called on the controller thread only.
pub trait ChunkSurface {
    fn apply_chunk_mesh(&mut self, cx: usize, cz: usize, mesh: &MeshBuild);
}

fn process_render_job(job: RenderJob, tx: &Sender<JobOut>) {
    let t0 = Instant::now();
    let mesh = extract_region(
        job.field.as_ref(),
        job.region,
        &job.params,
        &job.shade,
        job.border.as_ref(),
    );
    let t_mesh_ms = t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32;
    let _ = tx.send(JobOut {
        cx: job.cx,
        cz: job.cz,
        pass_id: job.pass_id,
        mesh,
        t_mesh_ms,
    });
}

/// Single-controller chunk scheduler. `render` fans chunk jobs out to the
/// worker pool; `pump` drains finished meshes back on the caller's thread.
/// At most one pass runs at a time; results from an abandoned pass are
/// discarded by pass id.
pub struct ChunkScheduler {
    job_tx: Sender<RenderJob>,
    res_rx: Receiver<JobOut>,
    _pool: Arc<ThreadPool>,
    queued: Arc<AtomicUsize>,
    inflight: Arc<AtomicUsize>,
    workers: usize,

    chunk_cells: usize,
    width_chunks: usize,
    depth_chunks: usize,
    slots: Vec<ChunkSlot>,

    pass_id: u64,
    outstanding: usize,
    rendering: bool,
}

impl ChunkScheduler {
    pub fn new(width_cells: usize, depth_cells: usize, chunk_cells: usize) -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::with_workers(width_cells, depth_cells, chunk_cells, workers)
    }

    pub fn with_workers(
        width_cells: usize,
        depth_cells: usize,
        chunk_cells: usize,
        workers: usize,
    ) -> Self {
        let workers = workers.max(1);
        let (job_tx, job_rx) = unbounded::<RenderJob>();
        let (res_tx, res_rx) = unbounded::<JobOut>();
        let queued = Arc::new(AtomicUsize::new(0));
        let inflight = Arc::new(AtomicUsize::new(0));

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("relief-chunk-{i}"))
                .build()
                .expect("chunk pool"),
        );
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let queued = queued.clone();
            let inflight = inflight.clone();
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    queued.fetch_sub(1, Ordering::Relaxed);
                    inflight.fetch_add(1, Ordering::Relaxed);
                    process_render_job(job, &tx);
                    inflight.fetch_sub(1, Ordering::Relaxed);
                }
            });
        }

        let width_chunks = width_cells.div_ceil(chunk_cells);
        let depth_chunks = depth_cells.div_ceil(chunk_cells);
        let mut slots = Vec::with_capacity(width_chunks * depth_chunks);
        for _ in 0..width_chunks * depth_chunks {
            slots.push(ChunkSlot {
                state: ChunkState::Idle,
                mesh: None,
            });
        }

        Self {
            job_tx,
            res_rx,
            _pool: pool,
            queued,
            inflight,
            workers,
            chunk_cells,
            width_chunks,
            depth_chunks,
            slots,
            pass_id: 0,
            outstanding: 0,
            rendering: false,
        }
    }

    #[inline]
    pub fn width_chunks(&self) -> usize {
        self.width_chunks
    }

    #[inline]
    pub fn depth_chunks(&self) -> usize {
        self.depth_chunks
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[inline]
    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    #[inline]
    fn slot_idx(&self, cx: usize, cz: usize) -> usize {
        cx * self.depth_chunks + cz
    }

    /// Last committed mesh of a chunk, if it has ever rendered.
    pub fn chunk_mesh(&self, cx: usize, cz: usize) -> Option<&MeshBuild> {
        self.slots[self.slot_idx(cx, cz)].mesh.as_ref()
    }

    pub fn chunk_state(&self, cx: usize, cz: usize) -> ChunkState {
        self.slots[self.slot_idx(cx, cz)].state
    }

    pub fn queue_debug_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.inflight.load(Ordering::Relaxed),
        )
    }

    /// Starts a render pass over all chunks, or only `chunks` when given.
    /// Returns false without queueing anything if a pass is still running.
    pub fn render(&mut self, pass: &RenderPass, chunks: Option<&[(usize, usize)]>) -> bool {
        if self.rendering {
            log::debug!("render pass {} still in flight, request dropped", self.pass_id);
            return false;
        }

        self.pass_id += 1;
        self.outstanding = 0;

        let queue = |sched: &mut Self, cx: usize, cz: usize| {
            let region = Region::for_chunk(
                pass.field.as_ref(),
                sched.chunk_cells,
                cx,
                cz,
                pass.y_min,
                pass.y_max,
            );
            let idx = sched.slot_idx(cx, cz);
            sched.slots[idx].state = ChunkState::Queued;
            sched.queued.fetch_add(1, Ordering::Relaxed);
            let job = RenderJob {
                cx,
                cz,
                pass_id: sched.pass_id,
                field: pass.field.clone(),
                border: pass.border.clone(),
                params: pass.params,
                shade: pass.shade.clone(),
                region,
            };
            if sched.job_tx.send(job).is_err() {
                sched.queued.fetch_sub(1, Ordering::Relaxed);
                sched.slots[idx].state = ChunkState::Idle;
            } else {
                sched.outstanding += 1;
            }
        };

        match chunks {
            Some(list) => {
                for &(cx, cz) in list {
                    if cx < self.width_chunks && cz < self.depth_chunks {
                        queue(self, cx, cz);
                    }
                }
            }
            None => {
                for cx in 0..self.width_chunks {
                    for cz in 0..self.depth_chunks {
                        queue(self, cx, cz);
                    }
                }
            }
        }

        self.rendering = self.outstanding > 0;
        log::debug!(
            "render pass {} queued {} chunk(s)",
            self.pass_id,
            self.outstanding
        );
        true
    }

    /// Commits finished chunk meshes to `surface`. Returns the number of
    /// chunks committed; the pass ends once every queued chunk came back.
    pub fn pump(&mut self, surface: &mut dyn ChunkSurface) -> usize {
        let mut committed = 0;
        for out in self.res_rx.try_iter() {
            if out.pass_id != self.pass_id {
                log::trace!(
                    "dropping stale chunk ({}, {}) from pass {}",
                    out.cx,
                    out.cz,
                    out.pass_id
                );
                continue;
            }
            let idx = out.cx * self.depth_chunks + out.cz;
            surface.apply_chunk_mesh(out.cx, out.cz, &out.mesh);
            self.slots[idx].mesh = Some(out.mesh);
            self.slots[idx].state = ChunkState::Committed;
            self.outstanding -= 1;
            committed += 1;
            log::trace!(
                "chunk ({}, {}) committed in {} ms",
                out.cx,
                out.cz,
                out.t_mesh_ms
            );
        }
        if self.rendering && self.outstanding == 0 {
            self.rendering = false;
            log::debug!("render pass {} complete", self.pass_id);
        }
        committed
    }
}
