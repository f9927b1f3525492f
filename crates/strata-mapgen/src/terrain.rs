//! Column terrain synthesis: height profile, biome palette, water, beaches, and dust.
//!
//! Heights blend a low "base" field and a "higher" field. Where steepness is
//! high the blend switches abruptly, producing cliffs; elsewhere it fades
//! smoothly. Each column is then filled bottom-up with stone, a mud layer of
//! the biome's filler and top nodes, and water up to the water level. The mud
//! layer never holds more than `depth_top + depth_filler` biome nodes; anything
//! deeper is stone.

use glam::{IVec2, IVec3};
use strata_voxel::{MapNode, NodeId, NodeRegistry, VoxelArea, VoxelRegion};

use crate::biome::{Biome, BiomeClassifier};
use crate::context::ColumnMaps;
use crate::generator::GeneratorError;
use crate::noise::{NoiseField, NoiseSampler};
use crate::params::MapgenParams;
use crate::seed::det_pow;

/// Nodes the terrain falls back to where a biome leaves a slot empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainNodes {
    pub stone: NodeId,
    pub water_source: NodeId,
    pub dirt: NodeId,
    pub dirt_with_grass: NodeId,
    /// Beach sand. Beaches keep the biome palette without it.
    pub sand: Option<NodeId>,
    pub desert_sand: Option<NodeId>,
}

impl TerrainNodes {
    /// Looks up the `mapgen_*` nodes (or their aliases).
    ///
    /// # Errors
    ///
    /// [`GeneratorError::MissingNode`] for a missing stone, water, dirt, or grass node.
    pub fn resolve(nodes: &NodeRegistry) -> Result<Self, GeneratorError> {
        let required = |name: &'static str| {
            nodes
                .lookup_by_name(name)
                .ok_or(GeneratorError::MissingNode(name))
        };
        Ok(Self {
            stone: required("mapgen_stone")?,
            water_source: required("mapgen_water_source")?,
            dirt: required("mapgen_dirt")?,
            dirt_with_grass: required("mapgen_dirt_with_grass")?,
            sand: nodes.lookup_by_name("mapgen_sand"),
            desert_sand: nodes.lookup_by_name("mapgen_desert_sand"),
        })
    }
}

/// Cliff factor from steepness noise.
///
/// Values between 1.5 and 100 snap to one of the two, so terrain either follows
/// the smooth blend or switches to the higher field almost immediately.
fn cliff_factor(steepness: f64) -> f64 {
    let b = (5.0 * det_pow(steepness.clamp(0.0, 1000.0), 7.0)).clamp(0.5, 1000.0);
    if b > 1.5 && b < 100.0 {
        if b < 10.0 { 1.5 } else { 100.0 }
    } else {
        b
    }
}

/// Surface height relative to the water level, from the four height fields.
fn blend_height(terrain_base: f64, terrain_higher: f64, steepness: f64, height_select: f64) -> f64 {
    let base = 1.0 + terrain_base;
    let higher = (1.0 + terrain_higher).max(base);
    let b = cliff_factor(steepness);
    let a = (0.5 + b * (height_select - 0.2)).clamp(0.0, 1.0);
    base * (1.0 - a) + higher * a
}

/// Per-chunk noise fields.
struct ColumnFields {
    terrain_base: NoiseField,
    terrain_higher: NoiseField,
    steepness: NoiseField,
    height_select: NoiseField,
    mud: NoiseField,
    beach: NoiseField,
    biome: NoiseField,
    heat: NoiseField,
    humidity: NoiseField,
}

/// Synthesizes the terrain of a chunk.
#[derive(Clone, Debug)]
pub struct TerrainSynthesizer {
    water_level: i32,
    freq_desert: f64,
    freq_beach: f64,
    nodes: TerrainNodes,
    terrain_base: NoiseSampler,
    terrain_higher: NoiseSampler,
    steepness: NoiseSampler,
    height_select: NoiseSampler,
    mud: NoiseSampler,
    beach: NoiseSampler,
    biome: NoiseSampler,
    heat: NoiseSampler,
    humidity: NoiseSampler,
}

impl TerrainSynthesizer {
    pub fn new(params: &MapgenParams, nodes: TerrainNodes) -> Self {
        let sampler = |np| NoiseSampler::new(np, params.seed);
        Self {
            water_level: params.water_level,
            freq_desert: params.freq_desert,
            freq_beach: params.freq_beach,
            nodes,
            terrain_base: sampler(params.np_terrain_base),
            terrain_higher: sampler(params.np_terrain_higher),
            steepness: sampler(params.np_steepness),
            height_select: sampler(params.np_height_select),
            mud: sampler(params.np_mud),
            beach: sampler(params.np_beach),
            biome: sampler(params.np_biome),
            heat: sampler(params.np_heat),
            humidity: sampler(params.np_humidity),
        }
    }

    pub fn nodes(&self) -> &TerrainNodes {
        &self.nodes
    }

    pub fn water_level(&self) -> i32 {
        self.water_level
    }

    /// Surface height of a single column, matching what [`generate`](Self::generate) writes.
    pub fn surface_at(&self, x: i32, z: i32) -> i32 {
        let (fx, fz) = (f64::from(x), f64::from(z));
        let raw = blend_height(
            self.terrain_base.sample_2d(fx, fz),
            self.terrain_higher.sample_2d(fx, fz),
            self.steepness.sample_2d(fx, fz),
            self.height_select.sample_2d(fx, fz),
        );
        raw.floor() as i32 + self.water_level
    }

    fn evaluate_fields(&self, origin: IVec2, size: IVec2) -> ColumnFields {
        let field = |sampler: &NoiseSampler| {
            let mut field = NoiseField::from_sampler(sampler.clone());
            field.evaluate_2d(origin, size, 1.0);
            field
        };
        ColumnFields {
            terrain_base: field(&self.terrain_base),
            terrain_higher: field(&self.terrain_higher),
            steepness: field(&self.steepness),
            height_select: field(&self.height_select),
            mud: field(&self.mud),
            beach: field(&self.beach),
            biome: field(&self.biome),
            heat: field(&self.heat),
            humidity: field(&self.humidity),
        }
    }

    /// Fills `node_min..=node_max` (clamped to the region) and the column maps.
    ///
    /// `maps` must cover the horizontal extent of `node_min..=node_max`.
    pub fn generate(
        &self,
        region: &mut VoxelRegion,
        node_min: IVec3,
        node_max: IVec3,
        biomes: &BiomeClassifier,
        maps: &mut ColumnMaps,
    ) {
        debug_assert!(node_min.cmple(node_max).all(), "inverted chunk bounds");
        debug_assert_eq!(maps.size, IVec2::new(node_max.x - node_min.x + 1, node_max.z - node_min.z + 1));

        let fields = self.evaluate_fields(maps.min, maps.size);
        let write = region.area().intersection(&VoxelArea::new(node_min, node_max));

        for z in node_min.z..=node_max.z {
            for x in node_min.x..=node_max.x {
                let Some(i) = maps.index(x, z) else {
                    continue;
                };
                let raw = blend_height(
                    fields.terrain_base.result()[i],
                    fields.terrain_higher.result()[i],
                    fields.steepness.result()[i],
                    fields.height_select.result()[i],
                );
                let surface_y = raw.floor() as i32 + self.water_level;

                let heat = fields.heat.result()[i];
                let humidity = fields.humidity.result()[i];
                let biome_id = biomes.classify(heat, humidity, surface_y);
                maps.heightmap[i] = surface_y;
                maps.biomemap[i] = biome_id;
                maps.heatmap[i] = heat;
                maps.humiditymap[i] = humidity;

                let Some(write) = write.filter(|w| {
                    (w.min_edge.x..=w.max_edge.x).contains(&x) && (w.min_edge.z..=w.max_edge.z).contains(&z)
                }) else {
                    continue;
                };

                let mud = self.mud_thickness(fields.mud.result()[i], surface_y, node_min.y);
                let band = self.band_material(fields.beach.result()[i], fields.biome.result()[i], surface_y);
                let column = Column {
                    surface_y,
                    mud,
                    band,
                    biome: biomes.get(biome_id),
                };
                for y in write.min_edge.y..=write.max_edge.y {
                    let p = IVec3::new(x, y, z);
                    region.set(p, MapNode::new(self.node_at(&column, y)));
                }
            }
        }
    }

    /// Thickness of the mud layer. Never negative; at least 1 under water; never deeper
    /// than the column reaches into the chunk.
    fn mud_thickness(&self, mud_noise: f64, surface_y: i32, chunk_min_y: i32) -> i32 {
        let mut mud = (mud_noise.round() as i32).max(0);
        if surface_y <= self.water_level {
            mud = mud.max(1);
        }
        mud.min((surface_y - chunk_min_y + 1).max(0))
    }

    /// Sand replacing the mud layer of columns near the water level.
    fn band_material(&self, beach_noise: f64, biome_noise: f64, surface_y: i32) -> Option<NodeId> {
        let in_band = (self.water_level - 3..=self.water_level + 2).contains(&surface_y);
        if !in_band {
            return None;
        }
        if beach_noise > self.freq_beach {
            // Without a sand node the beach keeps the biome palette.
            self.nodes.sand
        } else if biome_noise > self.freq_desert {
            self.nodes.desert_sand
        } else {
            None
        }
    }

    fn node_at(&self, column: &Column<'_>, y: i32) -> NodeId {
        let biome = column.biome;
        let surface_y = column.surface_y;
        if y <= surface_y - column.mud {
            biome.node_stone.unwrap_or(self.nodes.stone)
        } else if y <= surface_y {
            if let Some(sand) = column.band {
                sand
            } else if surface_y >= self.water_level && y > surface_y - biome.depth_top {
                biome.node_top.unwrap_or(self.nodes.dirt_with_grass)
            } else if y > surface_y - biome.depth_top.max(0) - biome.depth_filler.max(0) {
                biome.node_filler.unwrap_or(self.nodes.dirt)
            } else {
                biome.node_stone.unwrap_or(self.nodes.stone)
            }
        } else if y <= self.water_level {
            let water = biome.node_water.unwrap_or(self.nodes.water_source);
            if y > self.water_level - biome.depth_water_top {
                biome.node_water_top.unwrap_or(water)
            } else {
                water
            }
        } else {
            NodeId::AIR
        }
    }
}

struct Column<'a> {
    surface_y: i32,
    mud: i32,
    band: Option<NodeId>,
    biome: &'a Biome,
}

/// Lays each column's biome dust on top of its highest walkable node.
///
/// Columns whose top node is a liquid or a plant, or that have no room above, are skipped.
pub fn apply_dust(
    region: &mut VoxelRegion,
    node_min: IVec3,
    node_max: IVec3,
    biomes: &BiomeClassifier,
    maps: &ColumnMaps,
    nodes: &NodeRegistry,
) -> usize {
    let mut placed = 0;
    for z in node_min.z..=node_max.z {
        for x in node_min.x..=node_max.x {
            let Some(biome_id) = maps.biome_at(x, z) else {
                continue;
            };
            let Some(dust) = biomes.get(biome_id).node_dust else {
                continue;
            };
            let top = (node_min.y..node_max.y)
                .rev()
                .map(|y| IVec3::new(x, y, z))
                .find(|&p| region.content(p) != NodeId::AIR);
            let Some(top) = top else {
                continue;
            };
            let above = top + IVec3::Y;
            if nodes.is_walkable(region.content(top)) && region.content(above) == NodeId::AIR {
                region.set(above, MapNode::new(dust));
                placed += 1;
            }
        }
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::{BiomeDef, BiomeRegistry};
    use crate::noise::NoiseParams;
    use crate::resolve::ResolveReport;
    use glam::DVec3;
    use strata_voxel::NodeDef;

    fn mapgen_nodes() -> NodeRegistry {
        let mut nodes = NodeRegistry::new();
        for name in ["mapgen_stone", "mapgen_dirt", "mapgen_dirt_with_grass", "mapgen_sand", "mapgen_desert_sand"] {
            nodes.register(NodeDef::solid(name)).unwrap();
        }
        nodes.register(NodeDef::liquid("mapgen_water_source")).unwrap();
        nodes.register(NodeDef::solid("snow")).unwrap();
        nodes
    }

    fn synth(params: &MapgenParams, nodes: &NodeRegistry) -> TerrainSynthesizer {
        TerrainSynthesizer::new(params, TerrainNodes::resolve(nodes).unwrap())
    }

    fn chunk(min: IVec3, max: IVec3) -> (VoxelRegion, ColumnMaps) {
        (VoxelRegion::new(VoxelArea::new(min, max)), ColumnMaps::new(min, max))
    }

    #[test]
    fn test_cliff_factor_snaps() {
        assert_eq!(cliff_factor(0.0), 0.5);
        assert_eq!(cliff_factor(-3.0), 0.5);
        // 5 * 1.1^7 ≈ 9.74
        assert_eq!(cliff_factor(1.1), 1.5);
        // 5 * 1.6^7 ≈ 134
        assert!(cliff_factor(1.6) > 100.0);
        assert_eq!(cliff_factor(1.4), 100.0);
    }

    #[test]
    fn test_blend_height_bounds() {
        // With a = 0 the base field wins, with a = 1 the higher one.
        assert_eq!(blend_height(4.0, 30.0, 0.0, -10.0), 5.0);
        assert_eq!(blend_height(4.0, 30.0, 0.0, 10.0), 31.0);
        // Higher never drops below base.
        assert_eq!(blend_height(10.0, -5.0, 0.0, 10.0), 11.0);
    }

    #[test]
    fn test_mud_never_negative() {
        let nodes = mapgen_nodes();
        let mut params = MapgenParams::default();
        params.water_level = 0;
        let t = synth(&params, &nodes);
        for noise in [-20.0, -0.6, 0.0, 0.4, 3.7, 40.0] {
            for surface in [-50, -1, 0, 1, 60] {
                let mud = t.mud_thickness(noise, surface, -16);
                assert!(mud >= 0);
                assert!(mud <= (surface + 17).max(0));
                if surface <= 0 && surface >= -16 {
                    assert!(mud >= 1);
                }
            }
        }
    }

    #[test]
    fn test_column_fill_order() {
        let nodes = mapgen_nodes();
        let params = MapgenParams::default();
        let t = synth(&params, &nodes);
        let tn = *t.nodes();
        let mut registry = BiomeRegistry::new();
        registry
            .register(BiomeDef {
                name: "plains".into(),
                depth_top: 1,
                ..Default::default()
            })
            .unwrap();
        let classifier = registry.resolve(&nodes, &mut ResolveReport::default());

        let (min, max) = (IVec3::new(0, -32, 0), IVec3::new(15, 47, 15));
        let (mut region, mut maps) = chunk(min, max);
        t.generate(&mut region, min, max, &classifier, &mut maps);

        for z in 0..16 {
            for x in 0..16 {
                let surface = maps.height_at(x, z).unwrap();
                assert_eq!(surface, t.surface_at(x, z));
                if surface < min.y || surface > max.y {
                    continue;
                }
                let top = region.content(IVec3::new(x, surface, z));
                assert_ne!(top, NodeId::AIR);
                assert_ne!(top, tn.water_source);
                let above = region.content(IVec3::new(x, surface + 1, z));
                if surface + 1 <= params.water_level {
                    assert_eq!(above, tn.water_source);
                } else if surface + 1 <= max.y {
                    assert_eq!(above, NodeId::AIR);
                }
                if surface > params.water_level + 2 {
                    // Stone when the mud layer rounds to zero.
                    assert!(top == tn.dirt_with_grass || top == tn.stone);
                }
                if surface - 40 >= min.y {
                    assert_eq!(region.content(IVec3::new(x, surface - 40, z)), tn.stone);
                }
            }
        }
    }

    #[test]
    fn test_biome_palette_overrides_defaults() {
        let nodes = mapgen_nodes();
        let snow = nodes.lookup_by_name("snow").unwrap();
        let params = MapgenParams::default();
        let t = synth(&params, &nodes);
        let mut registry = BiomeRegistry::new();
        registry
            .register(BiomeDef {
                name: "tundra".into(),
                node_top: "snow".into(),
                node_stone: "snow".into(),
                node_filler: "snow".into(),
                ..Default::default()
            })
            .unwrap();
        let classifier = registry.resolve(&nodes, &mut ResolveReport::default());
        let (min, max) = (IVec3::new(0, -16, 0), IVec3::new(7, 15, 7));
        let (mut region, mut maps) = chunk(min, max);
        t.generate(&mut region, min, max, &classifier, &mut maps);
        assert_eq!(region.count(t.nodes().stone), 0);
        assert!(region.count(snow) > 0 || maps.heightmap.iter().all(|&h| h < min.y));
    }

    #[test]
    fn test_generation_is_repeatable() {
        let nodes = mapgen_nodes();
        let params = MapgenParams {
            seed: 99,
            ..Default::default()
        };
        let t = synth(&params, &nodes);
        let classifier = BiomeRegistry::new().resolve(&nodes, &mut ResolveReport::default());
        let (min, max) = (IVec3::new(-40, -20, 100), IVec3::new(-9, 11, 131));
        let (mut a, mut ma) = chunk(min, max);
        let (mut b, mut mb) = chunk(min, max);
        t.generate(&mut a, min, max, &classifier, &mut ma);
        t.generate(&mut b, min, max, &classifier, &mut mb);
        assert_eq!(a, b);
        assert_eq!(ma, mb);
    }

    /// Parameters giving every column the same height `water_level + 1 + lift`.
    fn flat_params(lift: f64, mud: f64, beach: f64) -> MapgenParams {
        let constant = |offset| NoiseParams::new(offset, 0.0, DVec3::splat(100.0), 0, 0, 0.5);
        MapgenParams {
            water_level: 0,
            np_terrain_base: constant(lift),
            np_terrain_higher: constant(lift),
            np_mud: constant(mud),
            np_beach: constant(beach),
            np_biome: constant(0.0),
            ..Default::default()
        }
    }

    fn surface_column(params: &MapgenParams, nodes: &NodeRegistry, biomes: &BiomeClassifier) -> (i32, Vec<NodeId>) {
        let t = synth(params, nodes);
        let (min, max) = (IVec3::new(0, -16, 0), IVec3::new(0, 15, 0));
        let (mut region, mut maps) = chunk(min, max);
        t.generate(&mut region, min, max, biomes, &mut maps);
        let surface = maps.height_at(0, 0).unwrap();
        let column = (min.y..=surface).rev().map(|y| region.content(IVec3::new(0, y, 0))).collect();
        (surface, column)
    }

    #[test]
    fn test_band_material_limits() {
        let nodes = mapgen_nodes();
        let t = synth(&flat_params(0.0, 2.0, 0.0), &nodes);
        let tn = *t.nodes();
        for surface in -3..=2 {
            assert_eq!(t.band_material(0.5, 0.0, surface), tn.sand);
            assert_eq!(t.band_material(0.0, 0.9, surface), tn.desert_sand);
            assert_eq!(t.band_material(0.5, 0.9, surface), tn.sand);
            assert_eq!(t.band_material(0.1, 0.3, surface), None);
        }
        for surface in [-40, -4, 3, 25] {
            assert_eq!(t.band_material(0.5, 0.9, surface), None);
        }
    }

    #[test]
    fn test_beach_without_sand_keeps_palette() {
        let mut nodes = NodeRegistry::new();
        for name in ["mapgen_stone", "mapgen_dirt", "mapgen_dirt_with_grass", "mapgen_desert_sand"] {
            nodes.register(NodeDef::solid(name)).unwrap();
        }
        nodes.register(NodeDef::liquid("mapgen_water_source")).unwrap();
        let t = synth(&flat_params(0.0, 2.0, 0.0), &nodes);
        assert_eq!(t.nodes().sand, None);
        assert_eq!(t.band_material(0.5, 0.9, 0), None);
        assert_eq!(t.band_material(0.0, 0.9, 0), t.nodes().desert_sand);
    }

    #[test]
    fn test_beach_sand_only_near_water() {
        let nodes = mapgen_nodes();
        let tn = TerrainNodes::resolve(&nodes).unwrap();
        let classifier = BiomeRegistry::new().resolve(&nodes, &mut ResolveReport::default());
        // Surfaces -4, 0, 2 and 6 around a water level of 0.
        for (lift, expected_top) in [
            (-5.0, tn.dirt),
            (-1.0, tn.sand.unwrap()),
            (1.0, tn.sand.unwrap()),
            (5.0, tn.dirt_with_grass),
        ] {
            let (surface, column) = surface_column(&flat_params(lift, 2.0, 1.0), &nodes, &classifier);
            assert_eq!(surface, 1 + lift as i32);
            assert_eq!(column[0], expected_top, "surface {surface}");
        }
    }

    #[test]
    fn test_depth_filler_caps_mud_layer() {
        let nodes = mapgen_nodes();
        let tn = TerrainNodes::resolve(&nodes).unwrap();
        let mut registry = BiomeRegistry::new();
        registry
            .register(BiomeDef {
                name: "shallow".into(),
                depth_top: 1,
                depth_filler: 2,
                ..Default::default()
            })
            .unwrap();
        let classifier = registry.resolve(&nodes, &mut ResolveReport::default());

        let (surface, column) = surface_column(&flat_params(5.0, 8.0, 0.0), &nodes, &classifier);
        assert_eq!(surface, 6);
        assert_eq!(column[0], tn.dirt_with_grass);
        assert_eq!(&column[1..3], &[tn.dirt, tn.dirt]);
        assert!(column[3..].iter().all(|&n| n == tn.stone));
    }

    #[test]
    fn test_dust_on_walkable_tops_only() {
        let nodes = mapgen_nodes();
        let snow = nodes.lookup_by_name("snow").unwrap();
        let tn = TerrainNodes::resolve(&nodes).unwrap();
        let mut registry = BiomeRegistry::new();
        registry
            .register(BiomeDef {
                name: "snowy".into(),
                node_dust: "snow".into(),
                ..Default::default()
            })
            .unwrap();
        let classifier = registry.resolve(&nodes, &mut ResolveReport::default());

        let (min, max) = (IVec3::ZERO, IVec3::new(1, 7, 0));
        let (mut region, mut maps) = chunk(min, max);
        maps.biomemap.fill(classifier.default_biome());
        region.set_content(IVec3::new(0, 2, 0), tn.stone);
        region.set_content(IVec3::new(1, 2, 0), tn.water_source);

        assert_eq!(apply_dust(&mut region, min, max, &classifier, &maps, &nodes), 1);
        assert_eq!(region.content(IVec3::new(0, 3, 0)), snow);
        assert_eq!(region.content(IVec3::new(1, 3, 0)), NodeId::AIR);
    }
}
