//! Decoration placement.

use glam::{IVec2, IVec3};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use strata_voxel::{MapNode, NodeId};

use super::{Decoration, DecorationHandle, DecorationPayload};
use crate::context::GenContext;
use crate::noise::NoiseSampler;
use crate::notify::GenNotifyKind;
use crate::seed::stream_rng;

/// The 8 horizontal neighbours checked for `spawn_by`.
const MOORE_NEIGHBOURS: [IVec2; 8] = [
    IVec2::new(1, 0),
    IVec2::new(-1, 0),
    IVec2::new(0, 1),
    IVec2::new(0, -1),
    IVec2::new(1, 1),
    IVec2::new(-1, 1),
    IVec2::new(1, -1),
    IVec2::new(-1, -1),
];

#[derive(Clone, Debug)]
struct PreparedDecoration {
    handle: DecorationHandle,
    deco: Decoration,
    noise: Option<NoiseSampler>,
}

/// Places every resolved decoration into a chunk.
#[derive(Clone, Debug, Default)]
pub struct DecorationPlacer {
    decos: Vec<PreparedDecoration>,
    inert: usize,
}

impl DecorationPlacer {
    /// Prepares decorations for a world. `None` entries are inert and only counted.
    pub fn new(decos: &[Option<Decoration>], world_seed: u64) -> Self {
        let mut prepared = Vec::new();
        let mut inert = 0;
        for (i, deco) in decos.iter().enumerate() {
            let Some(deco) = deco else {
                inert += 1;
                continue;
            };
            prepared.push(PreparedDecoration {
                handle: DecorationHandle(i as u32),
                noise: deco.noise_params.map(|np| NoiseSampler::new(np, world_seed)),
                deco: deco.clone(),
            });
        }
        Self {
            decos: prepared,
            inert,
        }
    }

    pub fn len(&self) -> usize {
        self.decos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decos.is_empty()
    }

    /// Number of decorations skipped because their references did not resolve.
    pub fn inert_count(&self) -> usize {
        self.inert
    }

    /// Places all decorations inside `pmin..=pmax`, in registration order.
    ///
    /// Returns the number of successful placements.
    pub fn place_all(&self, ctx: &mut GenContext<'_>, block_seed: u64, pmin: IVec3, pmax: IVec3) -> usize {
        self.decos
            .iter()
            .map(|prepared| place_one(ctx, prepared, block_seed, pmin, pmax))
            .sum()
    }
}

/// Side lengths of the parts `pmin..=pmax` is divided into.
///
/// Falls back to a single part when `sidelen` does not divide the horizontal extent.
fn part_size(name: &str, sidelen: i32, extent: IVec2) -> IVec2 {
    if extent.x % sidelen == 0 && extent.y % sidelen == 0 {
        IVec2::splat(sidelen)
    } else {
        tracing::warn!(
            "decoration '{name}': sidelen {sidelen} does not divide chunk extent {}x{}; using one part",
            extent.x,
            extent.y
        );
        extent
    }
}

fn place_one(
    ctx: &mut GenContext<'_>,
    prepared: &PreparedDecoration,
    block_seed: u64,
    pmin: IVec3,
    pmax: IVec3,
) -> usize {
    let deco = &prepared.deco;
    let mut rng = stream_rng(block_seed, deco.salt);
    let extent = IVec2::new(pmax.x - pmin.x + 1, pmax.z - pmin.z + 1);
    let part = part_size(&deco.name, deco.sidelen, extent);
    let divs = extent / part;
    let area = f64::from(part.x * part.y);
    let mut placed = 0;

    for z0 in 0..divs.y {
        for x0 in 0..divs.x {
            let part_min = IVec2::new(pmin.x + x0 * part.x, pmin.z + z0 * part.y);
            let part_max = part_min + part - IVec2::ONE;
            let centre = part_min + part / 2;

            let density = match &prepared.noise {
                Some(noise) => noise.sample_2d(f64::from(centre.x), f64::from(centre.y)),
                None => deco.fill_ratio,
            };
            let count = (area * density.max(0.0)).floor() as usize;

            for _ in 0..count {
                let x = rng.random_range(part_min.x..=part_max.x);
                let z = rng.random_range(part_min.y..=part_max.y);

                let Some(y) = ctx.ground_level(x, z, pmin.y, pmax.y) else {
                    continue;
                };
                if y < pmin.y || y > pmax.y || y < deco.y_min || y > deco.y_max {
                    continue;
                }
                // A constrained decoration needs a known biome; no maps means no match.
                if !deco.biomes.is_empty() {
                    let biome = ctx.maps.and_then(|m| m.biome_at(x, z));
                    if !biome.is_some_and(|b| deco.biomes.contains(&b)) {
                        continue;
                    }
                }

                let ground = IVec3::new(x, y, z);
                if generate(ctx, prepared, ground, &mut rng) {
                    placed += 1;
                    ctx.notify
                        .record(GenNotifyKind::Decoration, Some(prepared.handle.0), ground);
                }
            }
        }
    }
    placed
}

fn generate(
    ctx: &mut GenContext<'_>,
    prepared: &PreparedDecoration,
    ground: IVec3,
    rng: &mut ChaCha8Rng,
) -> bool {
    let deco = &prepared.deco;
    if !deco.place_on.contains(&ctx.region.content(ground)) {
        return false;
    }
    match &deco.payload {
        DecorationPayload::Simple {
            decoration,
            height,
            height_max,
            spawn_by,
            num_spawn_by,
        } => {
            if *num_spawn_by >= 0 && count_neighbours(ctx, ground, spawn_by) < *num_spawn_by as usize {
                return false;
            }
            let node = if decoration.len() == 1 {
                decoration[0]
            } else {
                decoration[rng.random_range(0..decoration.len())]
            };
            let height = if *height_max > 0 {
                rng.random_range(*height..=(*height_max).max(*height))
            } else {
                *height
            };
            stack_column(ctx, ground, node, height) > 0
        }
        DecorationPayload::Schematic {
            schematic,
            rotation,
            force_placement,
        } => {
            let rotation = rotation.pick(rng);
            let size = schematic.rotated_size(rotation);
            let mut origin = ground + IVec3::Y;
            if deco.place_center.x {
                origin.x -= (size.x - 1) / 2;
            }
            if deco.place_center.y {
                origin.y -= (size.y - 1) / 2;
            }
            if deco.place_center.z {
                origin.z -= (size.z - 1) / 2;
            }
            schematic.place(ctx.region, origin, rotation, *force_placement, rng, ctx.nodes);
            ctx.notify.record(GenNotifyKind::Schematic, None, origin);
            true
        }
    }
}

/// Counts `spawn_by` nodes among the horizontal neighbours at the ground and placement levels.
fn count_neighbours(ctx: &GenContext<'_>, ground: IVec3, spawn_by: &[NodeId]) -> usize {
    [ground.y, ground.y + 1]
        .into_iter()
        .flat_map(|y| {
            MOORE_NEIGHBOURS
                .iter()
                .map(move |d| IVec3::new(ground.x + d.x, y, ground.z + d.y))
        })
        .filter(|&p| spawn_by.contains(&ctx.region.content(p)))
        .count()
}

/// Stacks `height` copies of `node` above `ground`, stopping at the first occupied cell.
fn stack_column(ctx: &mut GenContext<'_>, ground: IVec3, node: NodeId, height: i32) -> usize {
    let mut written = 0;
    for dy in 1..=height {
        let p = ground + IVec3::new(0, dy, 0);
        if !ctx.region.contains(p) || !ctx.region.content(p).is_air_or_ignore() {
            break;
        }
        ctx.region.set(p, MapNode::new(node));
        written += 1;
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeId;
    use crate::context::ColumnMaps;
    use crate::decoration::{DecorationDef, SchematicSource};
    use crate::notify::{GenNotify, GenNotifyFilter};
    use crate::resolve::ResolveReport;
    use crate::schematic::{RotationPolicy, Schematic};
    use std::sync::Arc;
    use strata_voxel::{NodeDef, NodeRegistry, VoxelArea, VoxelRegion};

    struct World {
        nodes: NodeRegistry,
        dirt: NodeId,
        grass: NodeId,
        stone: NodeId,
    }

    fn world() -> World {
        let mut nodes = NodeRegistry::new();
        let dirt = nodes.register(NodeDef::solid("dirt")).unwrap();
        let grass = nodes.register(NodeDef::plant("grass")).unwrap();
        let stone = nodes.register(NodeDef::solid("stone")).unwrap();
        World {
            nodes,
            dirt,
            grass,
            stone,
        }
    }

    /// A 16x16x16 region with a flat dirt floor at y = 4.
    fn flat_region(w: &World) -> VoxelRegion {
        let area = VoxelArea::new(IVec3::ZERO, IVec3::splat(15));
        let mut region = VoxelRegion::filled(area, MapNode::AIR);
        for z in 0..16 {
            for x in 0..16 {
                for y in 0..=4 {
                    region.set_content(IVec3::new(x, y, z), w.dirt);
                }
            }
        }
        region
    }

    fn resolve(w: &World, def: DecorationDef, schematic: Option<&Arc<Schematic>>) -> Decoration {
        let mut report = ResolveReport::default();
        Decoration::resolve(&def, Vec::new(), schematic, &w.nodes, &mut report).unwrap()
    }

    fn run(w: &World, region: &mut VoxelRegion, decos: &[Option<Decoration>], seed: u64) -> (usize, GenNotify) {
        run_with_maps(w, region, decos, seed, None)
    }

    fn run_with_maps(
        w: &World,
        region: &mut VoxelRegion,
        decos: &[Option<Decoration>],
        seed: u64,
        maps: Option<&ColumnMaps>,
    ) -> (usize, GenNotify) {
        let mut notify = GenNotify::new(GenNotifyFilter::all());
        let placer = DecorationPlacer::new(decos, 7);
        let mut ctx = GenContext {
            region,
            nodes: &w.nodes,
            maps,
            notify: &mut notify,
        };
        let n = placer.place_all(&mut ctx, seed, IVec3::ZERO, IVec3::splat(15));
        (n, notify)
    }

    #[test]
    fn test_full_fill_covers_every_part() {
        let w = world();
        let mut def = DecorationDef::simple("grass", &["grass"], &["dirt"]);
        def.fill_ratio = 1.0;
        let deco = resolve(&w, def, None);

        let mut region = flat_region(&w);
        let (placed, notify) = run(&w, &mut region, &[Some(deco)], 1);
        // 4 parts of 8x8 with 64 attempts each; repeats land on occupied cells.
        assert!(placed > 0 && placed <= 256);
        assert_eq!(region.count(w.grass), placed);
        assert_eq!(notify.len(), placed);
        for event in notify.events() {
            assert_eq!(event.pos.y, 4);
            assert_eq!(region.content(event.pos + IVec3::Y), w.grass);
        }
    }

    #[test]
    fn test_zero_fill_places_nothing() {
        let w = world();
        let mut def = DecorationDef::simple("grass", &["grass"], &["dirt"]);
        def.fill_ratio = 0.0;
        let deco = resolve(&w, def, None);
        let mut region = flat_region(&w);
        let before = region.clone();
        assert_eq!(run(&w, &mut region, &[Some(deco)], 1).0, 0);
        assert_eq!(region, before);
    }

    #[test]
    fn test_place_on_and_height_range() {
        let w = world();
        let mut def = DecorationDef::simple("grass", &["grass"], &["stone"]);
        def.fill_ratio = 1.0;
        let on_stone = resolve(&w, def, None);
        let mut region = flat_region(&w);
        assert_eq!(run(&w, &mut region, &[Some(on_stone)], 3).0, 0);

        let mut def = DecorationDef::simple("grass", &["grass"], &["dirt"]);
        def.fill_ratio = 1.0;
        def.y_min = 10;
        let too_high = resolve(&w, def, None);
        assert_eq!(run(&w, &mut region, &[Some(too_high)], 3).0, 0);
    }

    #[test]
    fn test_stacks_between_height_and_height_max() {
        let w = world();
        let mut def = DecorationDef::simple("cactus", &["stone"], &["dirt"]);
        def.fill_ratio = 0.1;
        if let crate::decoration::DecorationKind::Simple(s) = &mut def.kind {
            s.height = 2;
            s.height_max = 4;
        }
        let deco = resolve(&w, def, None);
        let mut region = flat_region(&w);
        let (_, notify) = run(&w, &mut region, &[Some(deco)], 11);
        assert!(!notify.is_empty());
        for event in notify.events() {
            let column = (1..=6)
                .take_while(|&dy| region.content(event.pos + IVec3::new(0, dy, 0)) == w.stone)
                .count();
            assert!((2..=4).contains(&column), "column of {column}");
        }
    }

    #[test]
    fn test_spawn_by_requires_neighbours() {
        let w = world();
        let mut def = DecorationDef::simple("grass", &["grass"], &["dirt"]);
        def.fill_ratio = 1.0;
        if let crate::decoration::DecorationKind::Simple(s) = &mut def.kind {
            s.spawn_by = vec!["stone".into()];
            s.num_spawn_by = 1;
        }
        let deco = resolve(&w, def, None);

        let mut region = flat_region(&w);
        assert_eq!(run(&w, &mut region, &[Some(deco.clone())], 5).0, 0);

        // A single stone marker allows only its 8 neighbours.
        let marker = IVec3::new(8, 5, 8);
        region.set_content(marker, w.stone);
        let (placed, notify) = run(&w, &mut region, &[Some(deco)], 5);
        assert!(placed <= 8);
        for event in notify.events() {
            let d = (event.pos - IVec3::new(8, 4, 8)).abs();
            assert!(d.x <= 1 && d.z <= 1 && d != IVec3::ZERO);
        }
    }

    #[test]
    fn test_schematic_decoration_records_both_events() {
        let w = world();
        let schem = Arc::new(
            Schematic::new(IVec3::ONE, vec![MapNode::with_params(w.stone, 255, 0)], vec![255]).unwrap(),
        );
        let mut def = DecorationDef::schematic("boulder", SchematicSource::Named("b".into()), &["dirt"]);
        def.fill_ratio = 0.05;
        if let crate::decoration::DecorationKind::Schematic(s) = &mut def.kind {
            s.rotation = RotationPolicy::Random;
        }
        let deco = resolve(&w, def, Some(&schem));
        let mut region = flat_region(&w);
        let (placed, notify) = run(&w, &mut region, &[Some(deco)], 9);
        let map = notify.into_map();
        assert_eq!(map.get("decoration#0").map(Vec::len), Some(placed));
        assert_eq!(map.get("schematic").map(Vec::len), Some(placed));
        assert!(region.count(w.stone) > 0);
    }

    #[test]
    fn test_same_seed_same_result_and_inert_skipped() {
        let w = world();
        let mut def = DecorationDef::simple("grass", &["grass"], &["dirt"]);
        def.fill_ratio = 0.2;
        let deco = resolve(&w, def, None);
        let decos = [None, Some(deco)];

        let mut a = flat_region(&w);
        let mut b = flat_region(&w);
        let (_, na) = run(&w, &mut a, &decos, 42);
        run(&w, &mut b, &decos, 42);
        assert_eq!(a, b);
        assert!(na.events().iter().all(|e| e.id == Some(1)));
        assert_eq!(DecorationPlacer::new(&decos, 0).inert_count(), 1);
    }

    /// Maps for the flat region: surface at y = 4, west half biome 1, east half biome 2.
    fn split_maps() -> ColumnMaps {
        let mut maps = ColumnMaps::new(IVec3::ZERO, IVec3::splat(15));
        maps.heightmap.fill(4);
        for z in 0..16 {
            for x in 0..16 {
                let i = maps.index(x, z).unwrap();
                maps.biomemap[i] = if x < 8 { BiomeId(1) } else { BiomeId(2) };
            }
        }
        maps
    }

    fn grass_in_biome(w: &World, biome: BiomeId) -> Decoration {
        let mut def = DecorationDef::simple("grass", &["grass"], &["dirt"]);
        def.fill_ratio = 1.0;
        let mut report = ResolveReport::default();
        Decoration::resolve(&def, vec![biome], None, &w.nodes, &mut report).unwrap()
    }

    #[test]
    fn test_biome_filter_keeps_to_its_biome() {
        let w = world();
        let maps = split_maps();
        let mut region = flat_region(&w);
        let (placed, notify) =
            run_with_maps(&w, &mut region, &[Some(grass_in_biome(&w, BiomeId(2)))], 4, Some(&maps));
        assert!(placed > 0);
        for event in notify.events() {
            assert!(event.pos.x >= 8, "placed in the wrong biome at {}", event.pos);
        }

        let mut region = flat_region(&w);
        let deco = grass_in_biome(&w, BiomeId(5));
        assert_eq!(run_with_maps(&w, &mut region, &[Some(deco)], 4, Some(&maps)).0, 0);
    }

    #[test]
    fn test_biome_filter_rejects_without_maps() {
        let w = world();
        let mut region = flat_region(&w);
        let before = region.clone();
        let (placed, notify) = run(&w, &mut region, &[Some(grass_in_biome(&w, BiomeId(1)))], 4);
        assert_eq!(placed, 0);
        assert!(notify.is_empty());
        assert_eq!(region, before);
    }

    #[test]
    fn test_part_size_falls_back() {
        assert_eq!(part_size("x", 8, IVec2::splat(80)), IVec2::splat(8));
        assert_eq!(part_size("x", 7, IVec2::splat(80)), IVec2::splat(80));
    }
}
