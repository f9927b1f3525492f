//! Ore deposit strategies.

use glam::{DVec3, IVec2, IVec3};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use strata_voxel::{BLOCK_VOLUME, VoxelArea};

use super::{Ore, OreHandle, OreKind};
use crate::context::GenContext;
use crate::noise::{NoiseField, NoiseSampler};
use crate::notify::GenNotifyKind;
use crate::seed::{det_cos, det_sin, det_sqrt, stream_rng};

/// Runtime data for one ore: the resolved record plus its seeded noise.
#[derive(Clone, Debug)]
struct PreparedOre {
    handle: OreHandle,
    ore: Ore,
    noise: Option<NoiseSampler>,
    /// World-wide centre height of sheet ores.
    sheet_y: i32,
}

/// Places every resolved ore into a chunk.
#[derive(Clone, Debug, Default)]
pub struct OrePlacer {
    ores: Vec<PreparedOre>,
    inert: usize,
}

impl OrePlacer {
    /// Prepares ores for a world. `None` entries are inert ores and only counted.
    pub fn new(ores: &[Option<Ore>], world_seed: u64) -> Self {
        let mut prepared = Vec::new();
        let mut inert = 0;
        for (i, ore) in ores.iter().enumerate() {
            let Some(ore) = ore else {
                inert += 1;
                continue;
            };
            let sheet_y = if ore.y_min <= ore.y_max {
                stream_rng(world_seed, ore.salt).random_range(ore.y_min..=ore.y_max)
            } else {
                ore.y_min
            };
            prepared.push(PreparedOre {
                handle: OreHandle(i as u32),
                noise: ore.noise_params.map(|np| NoiseSampler::new(np, world_seed)),
                ore: ore.clone(),
                sheet_y,
            });
        }
        Self {
            ores: prepared,
            inert,
        }
    }

    /// Number of active ores.
    pub fn len(&self) -> usize {
        self.ores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ores.is_empty()
    }

    /// Number of ores skipped because their names did not resolve.
    pub fn inert_count(&self) -> usize {
        self.inert
    }

    /// Places all ores inside `pmin..=pmax`, in registration order.
    ///
    /// Returns the number of nodes written.
    pub fn place_all(&self, ctx: &mut GenContext<'_>, block_seed: u64, pmin: IVec3, pmax: IVec3) -> usize {
        let mut placed = 0;
        for prepared in &self.ores {
            let mut rng = stream_rng(block_seed, prepared.ore.salt);
            for (ymin, ymax, mirrored) in y_ranges(&prepared.ore, pmin.y, pmax.y) {
                if prepared.ore.clust_size as i32 >= ymax - ymin + 1 {
                    continue;
                }
                let bounds = VoxelArea::new(
                    IVec3::new(pmin.x, ymin, pmin.z),
                    IVec3::new(pmax.x, ymax, pmax.z),
                );
                placed += match prepared.ore.kind {
                    OreKind::Scatter => scatter(ctx, prepared, &bounds, &mut rng),
                    OreKind::Sheet => sheet(ctx, prepared, &bounds, mirrored),
                    OreKind::Blob => blob(ctx, prepared, &bounds, &mut rng),
                    OreKind::Vein => vein(ctx, prepared, &bounds, &mut rng),
                };
            }
        }
        placed
    }
}

/// The ore's y range clamped to `pmin_y..=pmax_y`, plus the mirrored range for absheight ores.
fn y_ranges(ore: &Ore, pmin_y: i32, pmax_y: i32) -> Vec<(i32, i32, bool)> {
    let mut ranges = Vec::with_capacity(2);
    let mut push = |lo: i32, hi: i32, mirrored: bool| {
        let (lo, hi) = (lo.max(pmin_y), hi.min(pmax_y));
        if lo <= hi {
            ranges.push((lo, hi, mirrored));
        }
    };
    push(ore.y_min, ore.y_max, false);
    if ore.absheight && (-ore.y_max, -ore.y_min) != (ore.y_min, ore.y_max) {
        push(-ore.y_max, -ore.y_min, true);
    }
    ranges
}

/// Number of cluster attempts: one per `clust_scarcity` map blocks, rounded up.
fn cluster_count(bounds: &VoxelArea, scarcity: u32) -> usize {
    let per_cluster = scarcity as usize * BLOCK_VOLUME;
    bounds.volume().div_ceil(per_cluster)
}

fn random_point(rng: &mut ChaCha8Rng, bounds: &VoxelArea) -> IVec3 {
    IVec3::new(
        rng.random_range(bounds.min_edge.x..=bounds.max_edge.x),
        rng.random_range(bounds.min_edge.y..=bounds.max_edge.y),
        rng.random_range(bounds.min_edge.z..=bounds.max_edge.z),
    )
}

/// Noise gate at an attempt centre. Ores without noise always pass.
fn passes_noise(prepared: &PreparedOre, p: IVec3) -> bool {
    match &prepared.noise {
        Some(noise) => noise.sample_3d(p.as_dvec3()) >= prepared.ore.noise_threshold,
        None => true,
    }
}

/// Writes the ore at `p` if it is in bounds and currently a `wherein` node.
fn try_place(ctx: &mut GenContext<'_>, prepared: &PreparedOre, bounds: &VoxelArea, p: IVec3) -> bool {
    if !bounds.contains(p) {
        return false;
    }
    let Some(i) = ctx.region.area().try_index(p) else {
        return false;
    };
    if !prepared.ore.replaces(ctx.region.get_index(i).content) {
        return false;
    }
    ctx.region.set_index(i, prepared.ore.ore);
    true
}

fn record(ctx: &mut GenContext<'_>, prepared: &PreparedOre, pos: IVec3) {
    ctx.notify
        .record(GenNotifyKind::Ore, Some(prepared.handle.0), pos);
}

/// Spherical clusters with a soft falloff towards the rim.
fn scatter(
    ctx: &mut GenContext<'_>,
    prepared: &PreparedOre,
    bounds: &VoxelArea,
    rng: &mut ChaCha8Rng,
) -> usize {
    let ore = &prepared.ore;
    let radius = ore.clust_size as i32;
    let mut placed = 0;
    let mut cells: Vec<(IVec3, f64)> = Vec::new();

    for _ in 0..cluster_count(bounds, ore.clust_scarcity) {
        let centre = random_point(rng, bounds);
        if !passes_noise(prepared, centre) || !ore.replaces(ctx.region.content(centre)) {
            continue;
        }

        if radius == 0 {
            if try_place(ctx, prepared, bounds, centre) {
                placed += 1;
                record(ctx, prepared, centre);
            }
            continue;
        }

        cells.clear();
        let r1 = f64::from(radius + 1);
        for dz in -radius..=radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let d2 = f64::from(dx * dx + dy * dy + dz * dz);
                    if d2 > f64::from(radius * radius) {
                        continue;
                    }
                    let w = 1.0 - d2 / (r1 * r1);
                    cells.push((centre + IVec3::new(dx, dy, dz), w));
                }
            }
        }
        let total: f64 = cells.iter().map(|&(_, w)| w).sum();
        let wanted = f64::from(ore.clust_num_ores);

        let mut any = false;
        for &(p, w) in &cells {
            let keep = (wanted * w / total).min(1.0);
            if rng.random::<f64>() < keep && try_place(ctx, prepared, bounds, p) {
                placed += 1;
                any = true;
            }
        }
        if any {
            record(ctx, prepared, centre);
        }
    }
    placed
}

/// Horizontal layers where the 2D noise exceeds the threshold.
fn sheet(
    ctx: &mut GenContext<'_>,
    prepared: &PreparedOre,
    bounds: &VoxelArea,
    mirrored: bool,
) -> usize {
    let Some(sampler) = &prepared.noise else {
        return 0;
    };
    let ore = &prepared.ore;
    let centre_y = if mirrored { -prepared.sheet_y } else { prepared.sheet_y };
    let extent = bounds.extent();
    let mut field = NoiseField::from_sampler(sampler.clone());
    let values = field
        .evaluate_2d(
            IVec2::new(bounds.min_edge.x, bounds.min_edge.z),
            IVec2::new(extent.x, extent.z),
            1.0,
        )
        .to_vec();

    let mut placed = 0;
    let mut first = None;
    for (i, &n) in values.iter().enumerate() {
        if n <= ore.noise_threshold {
            continue;
        }
        let x = bounds.min_edge.x + i as i32 % extent.x;
        let z = bounds.min_edge.z + i as i32 / extent.x;
        let thickness = 1 + ((n - ore.noise_threshold) * f64::from(ore.clust_size)).round() as i32;
        let y0 = centre_y - thickness / 2;
        for y in y0..y0 + thickness {
            let p = IVec3::new(x, y, z);
            if try_place(ctx, prepared, bounds, p) {
                placed += 1;
                first.get_or_insert(p);
            }
        }
    }
    if let Some(p) = first {
        record(ctx, prepared, p);
    }
    placed
}

/// Noise-perturbed ellipsoids.
fn blob(
    ctx: &mut GenContext<'_>,
    prepared: &PreparedOre,
    bounds: &VoxelArea,
    rng: &mut ChaCha8Rng,
) -> usize {
    let Some(sampler) = &prepared.noise else {
        return 0;
    };
    let ore = &prepared.ore;
    let size = f64::from(ore.clust_size.max(1));
    let reach = ore.clust_size.max(1) as i32 + 1;
    let mut placed = 0;

    for _ in 0..cluster_count(bounds, ore.clust_scarcity) {
        let centre = random_point(rng, bounds);
        if !passes_noise(prepared, centre) {
            continue;
        }
        let radii = DVec3::new(
            size * rng.random_range(0.75..1.25),
            size * rng.random_range(0.75..1.25),
            size * rng.random_range(0.75..1.25),
        );

        let mut any = false;
        for dz in -reach..=reach {
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let offset = DVec3::new(f64::from(dx), f64::from(dy), f64::from(dz));
                    let p = centre + IVec3::new(dx, dy, dz);
                    let scaled = offset / radii;
                    let dist = det_sqrt(scaled.length_squared());
                    let wobble = 0.5 * (sampler.sample_3d(p.as_dvec3()) - ore.noise_threshold);
                    if dist > 1.0 + wobble {
                        continue;
                    }
                    if try_place(ctx, prepared, bounds, p) {
                        placed += 1;
                        any = true;
                    }
                }
            }
        }
        if any {
            record(ctx, prepared, centre);
        }
    }
    placed
}

/// Random-walk strands of `clust_num_ores` steps.
fn vein(
    ctx: &mut GenContext<'_>,
    prepared: &PreparedOre,
    bounds: &VoxelArea,
    rng: &mut ChaCha8Rng,
) -> usize {
    let ore = &prepared.ore;
    let mut placed = 0;

    for _ in 0..cluster_count(bounds, ore.clust_scarcity) {
        let start = random_point(rng, bounds);
        if !passes_noise(prepared, start) {
            continue;
        }
        let theta = rng.random_range(0.0..std::f64::consts::TAU);
        let phi = rng.random_range(-0.5..0.5) * std::f64::consts::PI;
        let mut dir = DVec3::new(
            det_cos(theta) * det_cos(phi),
            det_sin(phi),
            det_sin(theta) * det_cos(phi),
        );
        let mut pos = start.as_dvec3();

        let mut any = false;
        for _ in 0..ore.clust_num_ores {
            let cell = pos.round().as_ivec3();
            if try_place(ctx, prepared, bounds, cell) {
                placed += 1;
                any = true;
            }
            let jitter = DVec3::new(
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
            ) * ore.random_factor;
            dir = (dir + jitter).try_normalize().unwrap_or(dir);
            pos += dir;
        }
        if any {
            record(ctx, prepared, start);
        }
    }
    placed
}
