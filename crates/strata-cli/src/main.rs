//! `strata`: generates the chunks around the world origin and reports what was placed.

mod error;
mod pool;

use std::collections::hash_map::DefaultHasher;
use std::error::Error;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::IVec3;
use strata_config::{CliArgs, Config, default_config_dir};
use strata_mapgen::{
    ChunkGenerator, ContentPack, GenNotifyFilter, GenerationReport, MapgenContent, MapgenParams,
    create_schematic,
};
use strata_voxel::{NodeRegistry, VoxelRegion, node_to_block};

use crate::error::CliError;
use crate::pool::{ChunkJob, ChunkOutcome, GenerationPool};

fn main() {
    let args = CliArgs::parse();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn run(args: &CliArgs) -> Result<(), CliError> {
    let config_dir = match &args.config {
        Some(dir) => dir.clone(),
        None => default_config_dir().ok_or(CliError::NoConfigDir)?,
    };
    let mut config = Config::load_or_create(&config_dir)?;
    config.apply_cli_overrides(args);
    config.validate()?;
    strata_log::init_logging(
        Some(&config_dir.join("logs")),
        config.debug.log_to_file,
        Some(&config),
    );

    let (nodes, content) = load_content(&config)?;
    let (resolved, report) = content.resolve(&nodes);
    for err in &report.errors {
        tracing::warn!("{err}");
    }

    let mut generator =
        ChunkGenerator::new(config.mapgen.clone(), Arc::new(resolved), Arc::new(nodes))?;
    let notify_flags = GenNotifyFilter::parse_flags(&config.content.gennotify)?;
    generator.set_gen_notify(GenNotifyFilter::new(notify_flags));
    let generator = Arc::new(generator);

    let jobs = chunk_jobs(
        &config.mapgen,
        config.worker.radius,
        config.worker.vertical_radius,
    );
    let threads = config.worker_threads();
    tracing::info!(
        "Generating {} chunks with seed {} on {} threads",
        jobs.len(),
        config.mapgen.seed,
        threads
    );

    let start = Instant::now();
    let pool = GenerationPool::new(Arc::clone(&generator), threads, threads * 2)
        .map_err(CliError::Spawn)?;
    for job in &jobs {
        if !pool.submit(*job) {
            tracing::error!("Generation workers exited early");
            break;
        }
    }
    let outcomes = pool.finish();
    print_summary(&outcomes, config.worker.print_hashes, start.elapsed());

    if let Some(path) = &args.export_schematic {
        export_schematic(&generator, path)?;
    }
    Ok(())
}

/// The configured content pack, or the built-in one.
fn load_content(config: &Config) -> Result<(NodeRegistry, MapgenContent), CliError> {
    let Some(path) = &config.content.pack else {
        return Ok(ContentPack::builtin().build(None)?);
    };
    let pack = ContentPack::load(path)?;
    tracing::info!("Loaded content pack {}", path.display());
    Ok(pack.build(path.parent())?)
}

/// The origin chunk and its neighbours within `radius` chunks horizontally and
/// `vertical_radius` chunks vertically.
fn chunk_jobs(params: &MapgenParams, radius: i32, vertical_radius: i32) -> Vec<ChunkJob> {
    let (origin_min, origin_max) = params.chunk_containing(IVec3::ZERO);
    let size = params.chunksize;
    let (r, v) = (radius.max(0), vertical_radius.max(0));
    let mut jobs = Vec::new();
    for cz in -r..=r {
        for cy in -v..=v {
            for cx in -r..=r {
                let offset = IVec3::new(cx, cy, cz) * size;
                jobs.push(ChunkJob {
                    blockpos_min: origin_min + offset,
                    blockpos_max: origin_max + offset,
                });
            }
        }
    }
    jobs
}

fn world_hash(outcomes: &[ChunkOutcome]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for outcome in outcomes {
        outcome.job.blockpos_min.hash(&mut hasher);
        outcome.fingerprint.hash(&mut hasher);
    }
    hasher.finish()
}

fn print_summary(outcomes: &[ChunkOutcome], print_hashes: bool, wall: Duration) {
    let mut total = GenerationReport::default();
    let mut events = 0;
    let mut busy = Duration::ZERO;
    for outcome in outcomes {
        let r = &outcome.report;
        total.caves_carved += r.caves_carved;
        total.trees += r.trees;
        total.grass += r.grass;
        total.ores_placed += r.ores_placed;
        total.decorations_placed += r.decorations_placed;
        total.dust_placed += r.dust_placed;
        total.inert_ores = total.inert_ores.max(r.inert_ores);
        total.inert_decorations = total.inert_decorations.max(r.inert_decorations);
        events += outcome.events;
        busy += outcome.elapsed;
        if print_hashes {
            println!(
                "chunk {:>4} {:>4} {:>4}  {:016x}",
                outcome.job.blockpos_min.x,
                outcome.job.blockpos_min.y,
                outcome.job.blockpos_min.z,
                outcome.fingerprint
            );
        }
    }

    println!("Strata chunk generation");
    println!("  chunks:      {}", outcomes.len());
    println!("  caves:       {} nodes carved", total.caves_carved);
    println!("  trees:       {} ({} grass)", total.trees, total.grass);
    println!("  ores:        {} nodes", total.ores_placed);
    println!("  decorations: {}", total.decorations_placed);
    println!("  dust:        {}", total.dust_placed);
    println!(
        "  inert:       {} ores, {} decorations",
        total.inert_ores, total.inert_decorations
    );
    println!("  events:      {events}");
    println!(
        "  time:        {:.1}ms wall, {:.1}ms generating",
        wall.as_secs_f64() * 1000.0,
        busy.as_secs_f64() * 1000.0
    );
    println!("  world hash:  {:016x}", world_hash(outcomes));
}

/// Captures a 16×16 patch of the origin column's surface and saves it as MTSM.
fn export_schematic(generator: &ChunkGenerator, path: &Path) -> Result<(), CliError> {
    let surface = generator.surface_at(0, 0);
    let (blockpos_min, blockpos_max) = generator
        .params()
        .chunk_containing(node_to_block(IVec3::new(0, surface, 0)));
    let job = ChunkJob {
        blockpos_min,
        blockpos_max,
    };
    let mut region = VoxelRegion::new(job.region_area());
    generator.generate(&mut region, blockpos_min, blockpos_max);

    let p1 = IVec3::new(-8, surface - 3, -8);
    let p2 = IVec3::new(7, surface + 12, 7);
    let schematic = create_schematic(&region, p1, p2, &[], &[]);
    schematic.to_def(generator.nodes()).save_mts(path)?;
    tracing::info!(
        "Exported {:?} schematic at surface {} to {}",
        schematic.size(),
        surface,
        path.display()
    );
    Ok(())
}
