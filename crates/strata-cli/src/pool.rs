//! Chunk generation on a pool of worker threads.
//!
//! Jobs go out over a bounded channel, so submission blocks while every worker is
//! busy; results come back over an unbounded one and are collected by
//! [`GenerationPool::finish`].

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use glam::IVec3;
use strata_mapgen::{ChunkGenerator, GenerationReport};
use strata_voxel::{BLOCK_SIZE, VoxelArea, VoxelRegion};

/// One chunk to generate, in map blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkJob {
    pub blockpos_min: IVec3,
    pub blockpos_max: IVec3,
}

impl ChunkJob {
    /// Node area of the chunk plus a one-block margin on every side.
    pub fn region_area(&self) -> VoxelArea {
        let margin = IVec3::splat(BLOCK_SIZE);
        VoxelArea::new(
            self.blockpos_min * BLOCK_SIZE - margin,
            (self.blockpos_max + IVec3::ONE) * BLOCK_SIZE - IVec3::ONE + margin,
        )
    }
}

/// Summary of one generated chunk. The region itself is dropped on the worker.
#[derive(Clone, Debug)]
pub struct ChunkOutcome {
    pub job: ChunkJob,
    pub fingerprint: u64,
    pub report: GenerationReport,
    /// Number of recorded generation events.
    pub events: usize,
    pub elapsed: Duration,
}

/// Generates one job synchronously.
pub fn run_job(generator: &ChunkGenerator, job: ChunkJob) -> ChunkOutcome {
    let mut region = VoxelRegion::new(job.region_area());
    let chunk = generator.generate(&mut region, job.blockpos_min, job.blockpos_max);
    ChunkOutcome {
        job,
        fingerprint: chunk.fingerprint(&region),
        report: chunk.report,
        events: chunk.notifications.values().map(Vec::len).sum(),
        elapsed: chunk.elapsed,
    }
}

pub struct GenerationPool {
    job_sender: Option<Sender<ChunkJob>>,
    result_receiver: Receiver<ChunkOutcome>,
    workers: Vec<JoinHandle<()>>,
}

impl GenerationPool {
    /// Starts `threads` workers (at least one) sharing `generator`.
    pub fn new(
        generator: Arc<ChunkGenerator>,
        threads: usize,
        queue_capacity: usize,
    ) -> std::io::Result<Self> {
        let (job_sender, job_receiver) = bounded::<ChunkJob>(queue_capacity.max(1));
        let (result_sender, result_receiver) = unbounded::<ChunkOutcome>();

        let mut workers = Vec::with_capacity(threads.max(1));
        for i in 0..threads.max(1) {
            let receiver = job_receiver.clone();
            let sender = result_sender.clone();
            let generator = Arc::clone(&generator);
            let handle = std::thread::Builder::new()
                .name(format!("chunk-gen-{i}"))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        if sender.send(run_job(&generator, job)).is_err() {
                            break;
                        }
                    }
                })?;
            workers.push(handle);
        }
        tracing::debug!("Started {} generation workers", workers.len());

        Ok(Self {
            job_sender: Some(job_sender),
            result_receiver,
            workers,
        })
    }

    /// Queues a job, blocking while the queue is full.
    ///
    /// Returns `false` if every worker has exited.
    pub fn submit(&self, job: ChunkJob) -> bool {
        self.job_sender
            .as_ref()
            .is_some_and(|sender| sender.send(job).is_ok())
    }

    /// Waits for all queued jobs and returns their outcomes, sorted by chunk position.
    pub fn finish(mut self) -> Vec<ChunkOutcome> {
        self.job_sender = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("A generation worker panicked");
            }
        }
        let mut outcomes: Vec<ChunkOutcome> = self.result_receiver.try_iter().collect();
        outcomes.sort_by_key(|o| {
            let p = o.job.blockpos_min;
            (p.z, p.y, p.x)
        });
        outcomes
    }
}
