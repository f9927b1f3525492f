//! Registered mapgen content and its resolved, generation-ready form.
//!
//! Content is registered by name into a [`MapgenContent`], then resolved once
//! against the frozen [`NodeRegistry`]. The result, [`ResolvedContent`], is
//! immutable and shared by every chunk generator of a world.
//!
//! [`ContentPack`] is the RON file format bundling node definitions with all
//! content records.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};
use strata_voxel::{NodeDef, NodeRegistry, RegistryError};
use thiserror::Error;

use crate::biome::{BiomeClassifier, BiomeDef, BiomeId, BiomeRegistry};
use crate::decoration::{
    Decoration, DecorationDef, DecorationHandle, DecorationKind, DecorationRegistry,
    SchematicDecoration, SchematicSource, SimpleDecoration,
};
use crate::error::RegistrationError;
use crate::noise::NoiseParams;
use crate::ore::{Ore, OreDef, OreHandle, OreKind, OreRegistry};
use crate::resolve::ResolveReport;
use crate::schematic::{
    RotationPolicy, Schematic, SchematicDef, SchematicError, SchematicHandle, SchematicNodeDef,
    SchematicRegistry,
};

// ---------------------------------------------------------------------------
// Registries
// ---------------------------------------------------------------------------

/// Every content registry of a world, before resolution.
///
/// Registration order matters only across kinds: decorations refer to biomes
/// and schematics by name, so those must be registered first.
#[derive(Debug, Default)]
pub struct MapgenContent {
    pub biomes: BiomeRegistry,
    pub schematics: SchematicRegistry,
    pub ores: OreRegistry,
    pub decorations: DecorationRegistry,
}

impl MapgenContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_biome(&mut self, def: BiomeDef) -> Result<BiomeId, RegistrationError> {
        self.biomes.register(def)
    }

    pub fn register_schematic(
        &mut self,
        name: impl Into<String>,
        def: SchematicDef,
    ) -> Result<SchematicHandle, RegistrationError> {
        self.schematics.register(name, def)
    }

    pub fn register_ore(&mut self, def: OreDef) -> Result<OreHandle, RegistrationError> {
        self.ores.register(def)
    }

    /// Registers a decoration, binding its biome and schematic names.
    pub fn register_decoration(
        &mut self,
        def: DecorationDef,
    ) -> Result<DecorationHandle, RegistrationError> {
        self.decorations
            .register(def, &self.biomes, &mut self.schematics)
    }

    /// Removes every biome. Decorations already registered keep their biome ids.
    pub fn clear_biomes(&mut self) {
        self.biomes.clear();
    }

    pub fn clear_schematics(&mut self) {
        self.schematics.clear();
    }

    pub fn clear_ores(&mut self) {
        self.ores.clear();
    }

    pub fn clear_decorations(&mut self) {
        self.decorations.clear();
    }

    /// Resolves every node name in one pass.
    ///
    /// Records with unknown names stay in place as inert entries so handles keep
    /// their positions; the report lists each failure.
    pub fn resolve(&self, nodes: &NodeRegistry) -> (ResolvedContent, ResolveReport) {
        let mut report = ResolveReport::default();
        let biomes = self.biomes.resolve(nodes, &mut report);
        let schematics = self.schematics.resolve(nodes, &mut report);
        let ores = self.ores.resolve(nodes, &mut report);
        let decorations = self.decorations.resolve(nodes, &schematics, &mut report);
        tracing::debug!(
            "Resolved content: {} biomes, {} schematics, {} ores, {} decorations, {} inert",
            biomes.len(),
            schematics.len(),
            ores.len(),
            decorations.len(),
            report.inert_count(),
        );
        (
            ResolvedContent {
                biomes,
                schematics,
                ores,
                decorations,
            },
            report,
        )
    }
}

/// Content with every node name turned into an id. Immutable and `Send + Sync`.
#[derive(Clone, Debug)]
pub struct ResolvedContent {
    pub biomes: BiomeClassifier,
    /// Indexed by [`SchematicHandle`]; `None` for inert schematics.
    pub schematics: Vec<Option<Arc<Schematic>>>,
    /// Indexed by [`OreHandle`].
    pub ores: Vec<Option<Ore>>,
    /// Indexed by [`DecorationHandle`].
    pub decorations: Vec<Option<Decoration>>,
}

impl ResolvedContent {
    /// Content with no ores, decorations, or registered biomes.
    pub fn empty() -> Self {
        Self {
            biomes: BiomeClassifier::new(Vec::new()),
            schematics: Vec::new(),
            ores: Vec::new(),
            decorations: Vec::new(),
        }
    }

    pub fn schematic(&self, handle: SchematicHandle) -> Option<&Arc<Schematic>> {
        self.schematics.get(handle.0 as usize).and_then(Option::as_ref)
    }
}

// ---------------------------------------------------------------------------
// Content packs
// ---------------------------------------------------------------------------

/// Errors loading or applying a content pack.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read content pack {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse content pack: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("failed to serialize content pack: {0}")]
    Serialize(#[from] ron::Error),

    #[error(transparent)]
    Node(#[from] RegistryError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("content pack default biome '{0}' is not defined")]
    UnknownDefaultBiome(String),

    #[error("failed to load schematic '{name}'")]
    Schematic {
        name: String,
        #[source]
        source: SchematicError,
    },
}

/// Where a pack schematic comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PackSchematicSource {
    /// An MTSM file, relative to the pack's directory.
    File(PathBuf),
    Inline(SchematicDef),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PackSchematic {
    pub name: String,
    pub source: PackSchematicSource,
}

/// Node definitions plus all mapgen content, as stored in a `.ron` file.
///
/// ```ron
/// (
///     nodes: [(name: "default:stone")],
///     aliases: {"mapgen_stone": "default:stone"},
///     ores: [(name: "coal", ore: "default:stone_with_coal", wherein: ["default:stone"])],
/// )
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPack {
    pub nodes: Vec<NodeDef>,
    /// Alias name to target node name, e.g. `mapgen_stone` to `default:stone`.
    pub aliases: BTreeMap<String, String>,
    pub biomes: Vec<BiomeDef>,
    pub default_biome: Option<String>,
    pub schematics: Vec<PackSchematic>,
    pub ores: Vec<OreDef>,
    pub decorations: Vec<DecorationDef>,
}

impl ContentPack {
    pub fn from_ron(text: &str) -> Result<Self, ContentError> {
        Ok(ron::from_str(text)?)
    }

    pub fn to_ron(&self) -> Result<String, ContentError> {
        let pretty = ron::ser::PrettyConfig::new().depth_limit(4);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Reads a pack from disk.
    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let text = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }

    /// Builds the node registry: every node, then every alias.
    pub fn build_nodes(&self) -> Result<NodeRegistry, ContentError> {
        let mut nodes = NodeRegistry::new();
        for def in &self.nodes {
            nodes.register(def.clone())?;
        }
        for (alias, target) in &self.aliases {
            nodes.register_alias(alias.as_str(), target.as_str());
        }
        Ok(nodes)
    }

    /// Registers all content records. File schematics are read relative to `base_dir`.
    pub fn build_content(&self, base_dir: Option<&Path>) -> Result<MapgenContent, ContentError> {
        let mut content = MapgenContent::new();
        for def in &self.biomes {
            content.register_biome(def.clone())?;
        }
        if let Some(name) = &self.default_biome {
            let id = content
                .biomes
                .lookup_by_name(name)
                .ok_or_else(|| ContentError::UnknownDefaultBiome(name.clone()))?;
            content.biomes.set_default(id);
        }
        for entry in &self.schematics {
            match &entry.source {
                PackSchematicSource::Inline(def) => {
                    content.register_schematic(entry.name.as_str(), def.clone())?;
                }
                PackSchematicSource::File(path) => {
                    let path = match base_dir {
                        Some(dir) => dir.join(path),
                        None => path.clone(),
                    };
                    let def = SchematicDef::load_mts(&path).map_err(|source| {
                        ContentError::Schematic {
                            name: entry.name.clone(),
                            source,
                        }
                    })?;
                    content.register_schematic(entry.name.as_str(), def)?;
                }
            }
        }
        for def in &self.ores {
            content.register_ore(def.clone())?;
        }
        for def in &self.decorations {
            content.register_decoration(def.clone())?;
        }
        Ok(content)
    }

    /// Builds both the node registry and the registered content.
    pub fn build(&self, base_dir: Option<&Path>) -> Result<(NodeRegistry, MapgenContent), ContentError> {
        Ok((self.build_nodes()?, self.build_content(base_dir)?))
    }

    /// A small default world: grassland, desert and tundra biomes, four ores,
    /// cacti, papyrus, and bushes.
    pub fn builtin() -> Self {
        let solid = |n: &str| NodeDef::solid(n);
        let plant = |n: &str| NodeDef::plant(n);
        let nodes = vec![
            solid("default:stone"),
            solid("default:desert_stone"),
            solid("default:dirt"),
            solid("default:dirt_with_grass"),
            solid("default:dirt_with_snow"),
            solid("default:sand"),
            solid("default:desert_sand"),
            solid("default:gravel"),
            solid("default:clay"),
            NodeDef::liquid("default:water_source"),
            solid("default:ice"),
            plant("default:snow"),
            solid("default:tree"),
            plant("default:leaves"),
            plant("default:apple"),
            plant("default:grass_1"),
            solid("default:cactus"),
            plant("default:papyrus"),
            plant("default:dry_shrub"),
            solid("default:stone_with_coal"),
            solid("default:stone_with_iron"),
            solid("default:mese"),
        ];
        let aliases = [
            ("mapgen_stone", "default:stone"),
            ("mapgen_dirt", "default:dirt"),
            ("mapgen_dirt_with_grass", "default:dirt_with_grass"),
            ("mapgen_sand", "default:sand"),
            ("mapgen_desert_sand", "default:desert_sand"),
            ("mapgen_water_source", "default:water_source"),
            ("mapgen_tree", "default:tree"),
            ("mapgen_leaves", "default:leaves"),
            ("mapgen_apple", "default:apple"),
            ("mapgen_grass", "default:grass_1"),
        ]
        .into_iter()
        .map(|(a, t)| (a.to_string(), t.to_string()))
        .collect();

        let biomes = vec![
            BiomeDef {
                name: "grassland".into(),
                node_top: "default:dirt_with_grass".into(),
                node_filler: "default:dirt".into(),
                depth_filler: 3,
                heat_point: 50.0,
                humidity_point: 35.0,
                ..Default::default()
            },
            BiomeDef {
                name: "desert".into(),
                node_top: "default:desert_sand".into(),
                node_filler: "default:desert_sand".into(),
                node_stone: "default:desert_stone".into(),
                depth_filler: 1,
                y_min: 5,
                heat_point: 92.0,
                humidity_point: 16.0,
                ..Default::default()
            },
            BiomeDef {
                name: "tundra".into(),
                node_top: "default:dirt_with_snow".into(),
                node_filler: "default:dirt".into(),
                node_water_top: "default:ice".into(),
                node_dust: "default:snow".into(),
                depth_water_top: 1,
                heat_point: 0.0,
                humidity_point: 40.0,
                ..Default::default()
            },
        ];

        let stone = ["default:stone", "default:desert_stone"];
        let ores = vec![
            OreDef {
                clust_scarcity: 8,
                clust_num_ores: 8,
                clust_size: 2,
                y_max: 64,
                ..OreDef::scatter("coal", "default:stone_with_coal", &stone)
            },
            OreDef {
                clust_scarcity: 12,
                clust_num_ores: 3,
                clust_size: 1,
                y_max: 2,
                ..OreDef::scatter("iron", "default:stone_with_iron", &["default:stone"])
            },
            OreDef {
                kind: OreKind::Blob,
                clust_scarcity: 16,
                clust_size: 5,
                noise_params: Some(NoiseParams::new(0.0, 1.0, DVec3::splat(5.0), 766, 2, 0.0)),
                y_max: 31000,
                ..OreDef::scatter("gravel", "default:gravel", &["default:stone"])
            },
            OreDef {
                kind: OreKind::Sheet,
                clust_size: 3,
                noise_params: Some(NoiseParams::new(0.0, 1.0, DVec3::splat(100.0), 23, 3, 0.7)),
                noise_threshold: 0.1,
                y_min: -15,
                y_max: 0,
                ..OreDef::scatter("clay", "default:clay", &["default:dirt", "default:sand"])
            },
            OreDef {
                kind: OreKind::Vein,
                clust_scarcity: 4,
                clust_num_ores: 24,
                noise_params: Some(NoiseParams::new(0.0, 1.0, DVec3::splat(300.0), 7, 3, 0.5)),
                noise_threshold: 0.3,
                y_max: -64,
                ..OreDef::scatter("mese_vein", "default:mese", &["default:stone"])
            },
        ];

        let schematics = vec![PackSchematic {
            name: "bush".into(),
            source: PackSchematicSource::Inline(bush_schematic()),
        }];

        let decorations = vec![
            DecorationDef {
                kind: DecorationKind::Simple(SimpleDecoration {
                    height: 2,
                    height_max: 4,
                    ..SimpleDecoration::new(&["default:cactus"])
                }),
                noise_params: Some(NoiseParams::new(-0.012, 0.024, DVec3::splat(100.0), 230, 3, 0.6)),
                sidelen: 16,
                y_min: 5,
                biomes: vec!["desert".into()],
                ..DecorationDef::simple("cactus", &[], &["default:desert_sand"])
            },
            DecorationDef {
                kind: DecorationKind::Simple(SimpleDecoration {
                    height: 2,
                    height_max: 4,
                    spawn_by: vec!["default:water_source".into()],
                    num_spawn_by: 1,
                    ..SimpleDecoration::new(&["default:papyrus"])
                }),
                fill_ratio: 0.3,
                sidelen: 16,
                y_min: 0,
                y_max: 3,
                ..DecorationDef::simple(
                    "papyrus",
                    &[],
                    &["default:dirt", "default:dirt_with_grass", "default:sand"],
                )
            },
            DecorationDef {
                fill_ratio: 0.01,
                sidelen: 16,
                ..DecorationDef::simple("dry_shrub", &["default:dry_shrub"], &["default:desert_sand"])
            },
            DecorationDef {
                kind: DecorationKind::Schematic(SchematicDecoration {
                    rotation: RotationPolicy::Random,
                    ..SchematicDecoration::new(SchematicSource::Named("bush".into()))
                }),
                fill_ratio: 0.004,
                sidelen: 16,
                biomes: vec!["grassland".into()],
                place_center_x: true,
                place_center_z: true,
                ..DecorationDef::schematic(
                    "bush",
                    SchematicSource::Named("bush".into()),
                    &["default:dirt_with_grass"],
                )
            },
        ];

        Self {
            nodes,
            aliases,
            biomes,
            default_biome: Some("grassland".into()),
            schematics,
            ores,
            decorations,
        }
    }
}

/// A 3×2×3 leaf bush around a one-node stem. Corner leaves and the top ring are
/// probabilistic.
fn bush_schematic() -> SchematicDef {
    let size = IVec3::new(3, 2, 3);
    let mut data = Vec::with_capacity(18);
    for z in 0..size.z {
        for y in 0..size.y {
            for x in 0..size.x {
                let centre = x == 1 && z == 1;
                let corner = x != 1 && z != 1;
                let (name, prob) = match (y, centre, corner) {
                    (0, true, _) => ("default:tree", 255),
                    (0, false, true) => ("default:leaves", 128),
                    (0, false, false) => ("default:leaves", 255),
                    (_, true, _) => ("default:leaves", 255),
                    (_, false, true) => ("air", 0),
                    _ => ("default:leaves", 160),
                };
                data.push(SchematicNodeDef {
                    name: name.into(),
                    prob,
                    param2: 0,
                });
            }
        }
    }
    SchematicDef {
        size,
        data,
        yslice_prob: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_voxel::NodeId;

    #[test]
    fn test_builtin_resolves_cleanly() {
        let (nodes, content) = ContentPack::builtin().build(None).unwrap();
        let (resolved, report) = content.resolve(&nodes);
        assert!(report.is_clean(), "{:?}", report.errors);
        assert_eq!(resolved.biomes.len(), 3);
        assert_eq!(resolved.ores.len(), 5);
        assert!(resolved.ores.iter().all(Option::is_some));
        assert!(resolved.decorations.iter().all(Option::is_some));
        assert!(nodes.lookup_by_name("mapgen_stone").is_some());
    }

    #[test]
    fn test_unknown_node_makes_record_inert() {
        let mut pack = ContentPack::builtin();
        pack.ores.push(OreDef::scatter(
            "ghost",
            "default:stone_with_ghosts",
            &["default:stone"],
        ));
        let (nodes, content) = pack.build(None).unwrap();
        let (resolved, report) = content.resolve(&nodes);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].node, "default:stone_with_ghosts");
        assert_eq!(report.inert, vec![("ore", "ghost".to_string())]);
        assert!(resolved.ores.last().unwrap().is_none());
        assert_eq!(resolved.ores.len(), 6);
    }

    #[test]
    fn test_decoration_with_unknown_biome_is_rejected() {
        let mut pack = ContentPack::builtin();
        pack.decorations.push(DecorationDef {
            biomes: vec!["swamp".into()],
            ..DecorationDef::simple("reed", &["default:papyrus"], &["default:dirt"])
        });
        assert!(matches!(
            pack.build(None),
            Err(ContentError::Registration(RegistrationError::UnknownBiome { .. }))
        ));
    }

    #[test]
    fn test_unknown_default_biome() {
        let pack = ContentPack {
            default_biome: Some("nowhere".into()),
            ..Default::default()
        };
        assert!(matches!(
            pack.build_content(None),
            Err(ContentError::UnknownDefaultBiome(_))
        ));
    }

    #[test]
    fn test_clear_registries() {
        let (_, mut content) = ContentPack::builtin().build(None).unwrap();
        content.clear_decorations();
        content.clear_ores();
        assert!(content.decorations.is_empty());
        assert!(content.ores.is_empty());
        assert_eq!(content.biomes.len(), 3);
        content.clear_biomes();
        content.clear_schematics();
        assert!(content.biomes.is_empty());
        assert!(content.schematics.is_empty());
    }

    #[test]
    fn test_pack_ron_round_trip() {
        let pack = ContentPack::builtin();
        let text = pack.to_ron().unwrap();
        assert_eq!(ContentPack::from_ron(&text).unwrap(), pack);
    }

    #[test]
    fn test_file_schematic_relative_to_pack() {
        let dir = tempfile::tempdir().unwrap();
        bush_schematic().save_mts(&dir.path().join("bush.mts")).unwrap();
        let pack = ContentPack {
            nodes: vec![NodeDef::solid("default:tree"), NodeDef::plant("default:leaves")],
            schematics: vec![PackSchematic {
                name: "bush".into(),
                source: PackSchematicSource::File("bush.mts".into()),
            }],
            ..Default::default()
        };
        let (nodes, content) = pack.build(Some(dir.path())).unwrap();
        let (resolved, report) = content.resolve(&nodes);
        assert!(report.is_clean());
        let bush = resolved.schematic(SchematicHandle(0)).unwrap();
        assert_eq!(bush.size(), IVec3::new(3, 2, 3));
        let tree = nodes.lookup_by_name("default:tree").unwrap();
        assert_eq!(bush.data().iter().filter(|n| n.content == tree).count(), 1);
        assert_ne!(tree, NodeId::AIR);
    }
}
