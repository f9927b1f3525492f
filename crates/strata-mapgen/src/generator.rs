//! Chunk generation: runs every pass over one chunk in a fixed order.
//!
//! Pass order: terrain, caves, default trees and grass, ores, decorations, dust.
//! Each pass is switched by [`MapgenFlags`](crate::params::MapgenFlags) except
//! terrain, which always runs.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::IVec3;
use hashbrown::HashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata_voxel::{BLOCK_SIZE, NodeId, NodeRegistry, VoxelArea, VoxelRegion, node_to_block};
use thiserror::Error;

use crate::cave::CaveCarver;
use crate::content::ResolvedContent;
use crate::context::{ColumnMaps, GenContext};
use crate::decoration::DecorationPlacer;
use crate::notify::{GenNotify, GenNotifyFilter};
use crate::ore::OrePlacer;
use crate::params::{MapgenParams, ParamsError};
use crate::schematic::{RotationPolicy, Schematic};
use crate::seed::{block_seed, hash_region};
use crate::terrain::{TerrainNodes, TerrainSynthesizer, apply_dust};
use crate::vegetation::SimpleDecorator;

/// Errors building a [`ChunkGenerator`].
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("required node '{0}' is not registered")]
    MissingNode(&'static str),

    #[error(transparent)]
    Params(#[from] ParamsError),
}

/// Per-pass counts for one chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub caves_carved: usize,
    pub trees: usize,
    pub grass: usize,
    pub ores_placed: usize,
    pub decorations_placed: usize,
    pub dust_placed: usize,
    /// Ores skipped because their node names did not resolve.
    pub inert_ores: usize,
    pub inert_decorations: usize,
}

/// Everything a caller gets back from [`ChunkGenerator::generate`] besides the region itself.
#[derive(Clone, Debug)]
pub struct GeneratedChunk {
    pub block_seed: u64,
    pub node_min: IVec3,
    pub node_max: IVec3,
    /// Heightmap, biome map, heat and humidity of the chunk's columns.
    pub maps: ColumnMaps,
    /// Event positions keyed as `"tree"`, `"ore#2"`, `"decoration#0"`, ...
    pub notifications: BTreeMap<String, Vec<IVec3>>,
    pub report: GenerationReport,
    /// Area whose liquids and lighting should be recomputed.
    pub modified: (IVec3, IVec3),
    pub elapsed: Duration,
}

impl GeneratedChunk {
    /// Hash of the region contents and the notifications, for determinism checks.
    pub fn fingerprint(&self, region: &VoxelRegion) -> u64 {
        let mut hasher = DefaultHasher::new();
        hash_region(region).hash(&mut hasher);
        self.notifications.hash(&mut hasher);
        hasher.finish()
    }
}

/// Generates chunks of one world.
///
/// Built once per world from frozen content; `generate` takes `&self`, so one
/// generator can serve any number of threads.
#[derive(Clone, Debug)]
pub struct ChunkGenerator {
    params: MapgenParams,
    content: Arc<ResolvedContent>,
    nodes: Arc<NodeRegistry>,
    terrain: TerrainSynthesizer,
    caves: CaveCarver,
    vegetation: SimpleDecorator,
    ores: OrePlacer,
    decorations: DecorationPlacer,
    /// Nodes caves may remove.
    carvable: Vec<NodeId>,
    /// Ground default trees and grass grow on.
    grass_ground: Vec<NodeId>,
    notify_filter: GenNotifyFilter,
}

impl ChunkGenerator {
    /// Prepares every pass for `params.seed`.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::Params`] for invalid parameters and
    /// [`GeneratorError::MissingNode`] if a required `mapgen_*` node is not registered.
    pub fn new(
        params: MapgenParams,
        content: Arc<ResolvedContent>,
        nodes: Arc<NodeRegistry>,
    ) -> Result<Self, GeneratorError> {
        params.validate()?;
        let terrain_nodes = TerrainNodes::resolve(&nodes)?;

        let mut carvable = vec![terrain_nodes.stone, terrain_nodes.dirt, terrain_nodes.dirt_with_grass];
        carvable.extend(terrain_nodes.sand);
        carvable.extend(terrain_nodes.desert_sand);
        for biome in content.biomes.iter() {
            carvable.extend([biome.node_stone, biome.node_filler, biome.node_top].into_iter().flatten());
        }
        carvable.retain(|&id| !nodes.is_liquid(id));
        carvable.sort_unstable();
        carvable.dedup();

        let ores = OrePlacer::new(&content.ores, params.seed);
        let decorations = DecorationPlacer::new(&content.decorations, params.seed);
        if ores.inert_count() + decorations.inert_count() > 0 {
            tracing::warn!(
                "{} ores and {} decorations are inert and will not be placed",
                ores.inert_count(),
                decorations.inert_count()
            );
        }

        Ok(Self {
            terrain: TerrainSynthesizer::new(&params, terrain_nodes),
            caves: CaveCarver::new(&params),
            vegetation: SimpleDecorator::new(&params, &nodes),
            grass_ground: vec![terrain_nodes.dirt_with_grass],
            ores,
            decorations,
            carvable,
            notify_filter: GenNotifyFilter::all(),
            params,
            content,
            nodes,
        })
    }

    pub fn params(&self) -> &MapgenParams {
        &self.params
    }

    pub fn nodes(&self) -> &Arc<NodeRegistry> {
        &self.nodes
    }

    pub fn content(&self) -> &Arc<ResolvedContent> {
        &self.content
    }

    /// Selects which events later `generate` calls record.
    pub fn set_gen_notify(&mut self, filter: GenNotifyFilter) {
        self.notify_filter = filter;
    }

    /// Terrain surface height of column `(x, z)` before caves and decorations.
    pub fn surface_at(&self, x: i32, z: i32) -> i32 {
        self.terrain.surface_at(x, z)
    }

    /// Generates the chunk spanning map blocks `blockpos_min..=blockpos_max` into `region`.
    ///
    /// Only cells inside `region` are written; passes that reach past the chunk (trees,
    /// schematics) may touch the region's margin.
    pub fn generate(
        &self,
        region: &mut VoxelRegion,
        blockpos_min: IVec3,
        blockpos_max: IVec3,
    ) -> GeneratedChunk {
        let start = Instant::now();
        let node_min = blockpos_min * BLOCK_SIZE;
        let node_max = (blockpos_max + IVec3::ONE) * BLOCK_SIZE - IVec3::ONE;
        let seed = block_seed(self.params.seed, blockpos_min);
        let flags = self.params.flags;

        let mut maps = ColumnMaps::new(node_min, node_max);
        let mut notify = GenNotify::new(self.notify_filter.clone());
        let mut report = GenerationReport {
            inert_ores: self.ores.inert_count(),
            inert_decorations: self.decorations.inert_count(),
            ..Default::default()
        };

        self.terrain
            .generate(region, node_min, node_max, &self.content.biomes, &mut maps);
        if flags.caves {
            report.caves_carved = self
                .caves
                .carve(region, node_min, node_max, &maps, &self.carvable);
        }

        {
            let mut ctx = GenContext {
                region: &mut *region,
                nodes: &self.nodes,
                maps: Some(&maps),
                notify: &mut notify,
            };
            if flags.trees {
                let stats = self
                    .vegetation
                    .place(&mut ctx, seed, node_min, node_max, &self.grass_ground);
                report.trees = stats.trees;
                report.grass = stats.grass;
            }
            if flags.ores {
                report.ores_placed = self.ores.place_all(&mut ctx, seed, node_min, node_max);
            }
            if flags.decorations {
                report.decorations_placed = self
                    .decorations
                    .place_all(&mut ctx, seed, node_min, node_max);
            }
        }

        if flags.dust {
            report.dust_placed = apply_dust(
                region,
                node_min,
                node_max,
                &self.content.biomes,
                &maps,
                &self.nodes,
            );
        }

        let margin = IVec3::new(0, BLOCK_SIZE, 0);
        let modified = region
            .area()
            .intersection(&VoxelArea::new(node_min - margin, node_max + margin))
            .map_or((node_min, node_max), |a| (a.min_edge, a.max_edge));

        let elapsed = start.elapsed();
        tracing::debug!(
            "Generated chunk {:?}..{:?} in {:.2}ms ({} ores, {} decorations, {} trees)",
            blockpos_min,
            blockpos_max,
            elapsed.as_secs_f64() * 1000.0,
            report.ores_placed,
            report.decorations_placed,
            report.trees,
        );

        GeneratedChunk {
            block_seed: seed,
            node_min,
            node_max,
            maps,
            notifications: notify.into_map(),
            report,
            modified,
            elapsed,
        }
    }

    /// Places every ore into `pmin..=pmax` of an existing region.
    ///
    /// Seeded from the block containing `pmin`, like chunk generation.
    pub fn generate_ores(
        &self,
        region: &mut VoxelRegion,
        pmin: IVec3,
        pmax: IVec3,
        notify: &mut GenNotify,
    ) -> usize {
        let seed = block_seed(self.params.seed, node_to_block(pmin));
        let mut ctx = GenContext {
            region,
            nodes: &self.nodes,
            maps: None,
            notify,
        };
        self.ores.place_all(&mut ctx, seed, pmin, pmax)
    }

    /// Places every decoration into `pmin..=pmax` of an existing region.
    ///
    /// Without column maps, ground is found by scanning and biome filters reject
    /// every column.
    pub fn generate_decorations(
        &self,
        region: &mut VoxelRegion,
        pmin: IVec3,
        pmax: IVec3,
        notify: &mut GenNotify,
    ) -> usize {
        let seed = block_seed(self.params.seed, node_to_block(pmin));
        let mut ctx = GenContext {
            region,
            nodes: &self.nodes,
            maps: None,
            notify,
        };
        self.decorations.place_all(&mut ctx, seed, pmin, pmax)
    }
}

/// Stamps `schematic` with its minimum corner at `pos`, outside of chunk generation.
///
/// `replacements` substitutes node contents before placing, as schematic decorations do.
/// Probability rolls and random rotation draw from `seed`. Returns the number of nodes written.
#[allow(clippy::too_many_arguments)]
pub fn place_schematic(
    region: &mut VoxelRegion,
    nodes: &NodeRegistry,
    schematic: &Schematic,
    pos: IVec3,
    rotation: RotationPolicy,
    replacements: Option<&HashMap<NodeId, NodeId>>,
    force_placement: bool,
    seed: u64,
) -> usize {
    let replaced;
    let schematic = match replacements {
        Some(map) if !map.is_empty() => {
            replaced = schematic.with_replacements(map);
            &replaced
        }
        _ => schematic,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let rotation = rotation.pick(&mut rng);
    schematic.place(region, pos, rotation, force_placement, &mut rng, nodes)
}

/// Captures the box between corners `p1` and `p2` as a schematic.
///
/// `cell_probs` positions are absolute; `slice_probs` heights are relative to the
/// box's lowest slice.
pub fn create_schematic(
    region: &VoxelRegion,
    p1: IVec3,
    p2: IVec3,
    cell_probs: &[(IVec3, u8)],
    slice_probs: &[(i32, u8)],
) -> Schematic {
    let area = VoxelArea::from_corners(p1, p2);
    let mut schematic = Schematic::from_region(region, &area);
    let cells: Vec<(IVec3, u8)> = cell_probs
        .iter()
        .map(|&(p, prob)| (p - area.min_edge, prob))
        .collect();
    schematic.apply_probabilities(&cells, slice_probs);
    schematic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentPack;
    use crate::notify::GENNOTIFY_TREE;
    use crate::schematic::{PROB_ALWAYS, PROB_NEVER, Rotation};
    use strata_voxel::MapNode;

    fn generator(seed: u64) -> ChunkGenerator {
        let (nodes, content) = ContentPack::builtin().build(None).unwrap();
        let (resolved, _) = content.resolve(&nodes);
        let params = MapgenParams {
            seed,
            ..Default::default()
        };
        ChunkGenerator::new(params, Arc::new(resolved), Arc::new(nodes)).unwrap()
    }

    fn chunk_region(blockpos_min: IVec3, blockpos_max: IVec3) -> VoxelRegion {
        let min = blockpos_min * BLOCK_SIZE - IVec3::splat(BLOCK_SIZE);
        let max = (blockpos_max + IVec3::ONE) * BLOCK_SIZE - IVec3::ONE + IVec3::splat(BLOCK_SIZE);
        VoxelRegion::new(VoxelArea::new(min, max))
    }

    #[test]
    fn test_missing_required_node() {
        let nodes = NodeRegistry::new();
        let err = ChunkGenerator::new(
            MapgenParams::default(),
            Arc::new(ResolvedContent::empty()),
            Arc::new(nodes),
        )
        .unwrap_err();
        assert!(matches!(err, GeneratorError::MissingNode("mapgen_stone")));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let (nodes, _) = ContentPack::builtin().build(None).unwrap();
        let params = MapgenParams {
            chunksize: 0,
            ..Default::default()
        };
        let err = ChunkGenerator::new(params, Arc::new(ResolvedContent::empty()), Arc::new(nodes))
            .unwrap_err();
        assert!(matches!(err, GeneratorError::Params(_)));
    }

    #[test]
    fn test_generate_fills_chunk() {
        let generator = generator(1);
        let (bmin, bmax) = (IVec3::new(0, -1, 0), IVec3::new(0, 0, 0));
        let mut region = chunk_region(bmin, bmax);
        let chunk = generator.generate(&mut region, bmin, bmax);

        assert_eq!(chunk.node_min, IVec3::new(0, -16, 0));
        assert_eq!(chunk.node_max, IVec3::new(15, 15, 15));
        assert_eq!(chunk.maps.heightmap.len(), 16 * 16);
        let stone = generator.nodes().lookup_by_name("mapgen_stone").unwrap();
        assert!(region.count(stone) > 0);
        // Nothing is left as ignore inside the chunk itself.
        for p in VoxelArea::new(chunk.node_min, chunk.node_max).iter() {
            assert_ne!(region.content(p), NodeId::IGNORE, "ignore at {p}");
        }
        assert!(region.area().contains(chunk.modified.0));
        assert!(region.area().contains(chunk.modified.1));
    }

    #[test]
    fn test_same_seed_same_chunk() {
        let (bmin, bmax) = (IVec3::new(-1, -1, -1), IVec3::new(0, 0, 0));
        let mut a = chunk_region(bmin, bmax);
        let mut b = chunk_region(bmin, bmax);
        let ca = generator(7).generate(&mut a, bmin, bmax);
        let cb = generator(7).generate(&mut b, bmin, bmax);
        assert_eq!(a, b);
        assert_eq!(ca.notifications, cb.notifications);
        assert_eq!(ca.report, cb.report);
        assert_eq!(ca.fingerprint(&a), cb.fingerprint(&b));
    }

    #[test]
    fn test_flags_disable_passes() {
        let (nodes, content) = ContentPack::builtin().build(None).unwrap();
        let (resolved, _) = content.resolve(&nodes);
        let mut params = MapgenParams::default();
        params.flags.apply("nocaves, notrees, noores, nodecorations, nodust").unwrap();
        let generator = ChunkGenerator::new(params, Arc::new(resolved), Arc::new(nodes)).unwrap();

        let (bmin, bmax) = (IVec3::new(0, -2, 0), IVec3::new(1, 1, 1));
        let mut region = chunk_region(bmin, bmax);
        let chunk = generator.generate(&mut region, bmin, bmax);
        assert_eq!(chunk.report.caves_carved, 0);
        assert_eq!(chunk.report.trees, 0);
        assert_eq!(chunk.report.ores_placed, 0);
        assert_eq!(chunk.report.decorations_placed, 0);
        assert_eq!(chunk.report.dust_placed, 0);
        assert!(chunk.notifications.is_empty());
    }

    #[test]
    fn test_notify_filter_applies() {
        let mut generator = generator(3);
        generator.set_gen_notify(GenNotifyFilter::new(GENNOTIFY_TREE));
        let (bmin, bmax) = (IVec3::new(0, -1, 0), IVec3::new(2, 1, 2));
        let mut region = chunk_region(bmin, bmax);
        let chunk = generator.generate(&mut region, bmin, bmax);
        assert!(chunk.notifications.keys().all(|k| k == "tree"));
    }

    #[test]
    fn test_generate_ores_on_existing_region() {
        let generator = generator(11);
        let stone = generator.nodes().lookup_by_name("mapgen_stone").unwrap();
        let area = VoxelArea::new(IVec3::new(0, -48, 0), IVec3::new(31, -17, 31));
        let mut region = VoxelRegion::filled(area, MapNode::new(stone));
        let mut notify = GenNotify::new(GenNotifyFilter::all());
        let placed = generator.generate_ores(&mut region, area.min_edge, area.max_edge, &mut notify);
        assert!(placed > 0);
        assert_eq!(region.count(stone) + placed, area.volume());
        assert!(!notify.is_empty());
    }

    #[test]
    fn test_create_then_place_schematic() {
        let mut nodes = NodeRegistry::new();
        let wood = nodes.register(strata_voxel::NodeDef::solid("wood")).unwrap();
        let area = VoxelArea::new(IVec3::ZERO, IVec3::new(3, 3, 3));
        let mut source = VoxelRegion::new(area);
        source.fill(MapNode::new(wood));

        let schematic = create_schematic(
            &source,
            IVec3::new(2, 2, 2),
            IVec3::new(1, 1, 1),
            &[(IVec3::new(1, 1, 1), PROB_NEVER)],
            &[],
        );
        assert_eq!(schematic.size(), IVec3::splat(2));
        assert_eq!(schematic.data()[0].param1, PROB_NEVER);
        assert_eq!(schematic.data()[7].param1, PROB_ALWAYS);

        let mut target = VoxelRegion::new(area);
        target.fill(MapNode::AIR);
        let written = place_schematic(
            &mut target,
            &nodes,
            &schematic,
            IVec3::ZERO,
            RotationPolicy::Fixed(Rotation::R0),
            None,
            false,
            5,
        );
        assert_eq!(written, 7);
        assert_eq!(target.content(IVec3::ZERO), NodeId::AIR);
        assert_eq!(target.content(IVec3::ONE), wood);
    }

    #[test]
    fn test_place_schematic_applies_replacements() {
        let mut nodes = NodeRegistry::new();
        let wood = nodes.register(strata_voxel::NodeDef::solid("wood")).unwrap();
        let brick = nodes.register(strata_voxel::NodeDef::solid("brick")).unwrap();
        let stone = nodes.register(strata_voxel::NodeDef::solid("stone")).unwrap();
        let schematic = Schematic::new(IVec3::splat(2), vec![MapNode::with_params(wood, PROB_ALWAYS, 0); 8], vec![PROB_ALWAYS; 2])
            .unwrap();
        let replacements: HashMap<NodeId, NodeId> = [(wood, brick)].into_iter().collect();

        let area = VoxelArea::new(IVec3::ZERO, IVec3::splat(1));
        let mut target = VoxelRegion::filled(area, MapNode::new(stone));
        let written = place_schematic(
            &mut target,
            &nodes,
            &schematic,
            IVec3::ZERO,
            RotationPolicy::Fixed(Rotation::R0),
            Some(&replacements),
            true,
            1,
        );
        assert_eq!(written, 8);
        assert_eq!(target.count(brick), 8);
        assert_eq!(target.count(wood), 0);

        // Without forcing, occupied cells keep their content.
        let mut target = VoxelRegion::filled(area, MapNode::new(stone));
        let written = place_schematic(
            &mut target,
            &nodes,
            &schematic,
            IVec3::ZERO,
            RotationPolicy::Fixed(Rotation::R0),
            Some(&replacements),
            false,
            1,
        );
        assert_eq!(written, 0);
        assert_eq!(target.count(stone), 8);
    }
}
