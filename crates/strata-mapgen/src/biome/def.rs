//! Biome definition (by node name) and its resolved form (by node id).

use serde::{Deserialize, Serialize};
use strata_voxel::{NodeId, NodeRegistry};

use super::BiomeId;
use crate::resolve::{NameResolver, ResolveReport};

/// Biome descriptor as registered by content. Node names may be empty, meaning
/// "use the generator's default material".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeDef {
    /// Unique biome name (e.g., "grassland").
    pub name: String,
    /// Surface material of dry columns.
    pub node_top: String,
    /// Material below the top layers.
    pub node_filler: String,
    /// Bulk material under the filler.
    pub node_stone: String,
    /// Material of the uppermost water layers.
    pub node_water_top: String,
    /// Water material.
    pub node_water: String,
    /// Material scattered on top of the finished surface (e.g., snow).
    pub node_dust: String,
    /// Number of top layers.
    pub depth_top: i32,
    /// Maximum number of filler layers under the top layers. Columns whose mud
    /// noise asks for a thicker layer get stone below it.
    pub depth_filler: i32,
    /// Number of water-top layers.
    pub depth_water_top: i32,
    /// Lowest surface height this biome applies to.
    pub y_min: i32,
    /// Highest surface height this biome applies to.
    pub y_max: i32,
    /// Ideal heat value.
    pub heat_point: f64,
    /// Ideal humidity value.
    pub humidity_point: f64,
}

impl Default for BiomeDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            node_top: String::new(),
            node_filler: String::new(),
            node_stone: String::new(),
            node_water_top: String::new(),
            node_water: String::new(),
            node_dust: String::new(),
            depth_top: 1,
            depth_filler: 2,
            depth_water_top: 0,
            y_min: -31000,
            y_max: 31000,
            heat_point: 0.0,
            humidity_point: 0.0,
        }
    }
}

/// A biome with node names resolved to ids.
#[derive(Clone, Debug, PartialEq)]
pub struct Biome {
    pub id: BiomeId,
    pub name: String,
    pub node_top: Option<NodeId>,
    pub node_filler: Option<NodeId>,
    pub node_stone: Option<NodeId>,
    pub node_water_top: Option<NodeId>,
    pub node_water: Option<NodeId>,
    pub node_dust: Option<NodeId>,
    pub depth_top: i32,
    pub depth_filler: i32,
    pub depth_water_top: i32,
    pub y_min: i32,
    pub y_max: i32,
    pub heat_point: f64,
    pub humidity_point: f64,
}

impl Biome {
    /// Biome used when nothing else is registered: every material defers to the generator.
    pub fn fallback() -> Self {
        let def = BiomeDef {
            name: "default".to_string(),
            ..BiomeDef::default()
        };
        Self::unresolved(BiomeId::NONE, &def)
    }

    fn unresolved(id: BiomeId, def: &BiomeDef) -> Self {
        Self {
            id,
            name: def.name.clone(),
            node_top: None,
            node_filler: None,
            node_stone: None,
            node_water_top: None,
            node_water: None,
            node_dust: None,
            depth_top: def.depth_top,
            depth_filler: def.depth_filler,
            depth_water_top: def.depth_water_top,
            y_min: def.y_min,
            y_max: def.y_max,
            heat_point: def.heat_point,
            humidity_point: def.humidity_point,
        }
    }

    /// Resolves a definition. Returns `None` (and reports) if any non-empty name is unknown.
    pub fn resolve(
        id: BiomeId,
        def: &BiomeDef,
        nodes: &NodeRegistry,
        report: &mut ResolveReport,
    ) -> Option<Self> {
        let mut r = NameResolver::new(nodes, report, "biome", &def.name);
        let biome = Self {
            node_top: r.optional(&def.node_top),
            node_filler: r.optional(&def.node_filler),
            node_stone: r.optional(&def.node_stone),
            node_water_top: r.optional(&def.node_water_top),
            node_water: r.optional(&def.node_water),
            node_dust: r.optional(&def.node_dust),
            ..Self::unresolved(id, def)
        };
        r.finish().then_some(biome)
    }

    /// Returns `true` if `y` lies within the biome's height range.
    #[inline]
    pub fn contains_height(&self, y: i32) -> bool {
        (self.y_min..=self.y_max).contains(&y)
    }
}
