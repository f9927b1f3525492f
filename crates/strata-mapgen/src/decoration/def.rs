//! Decoration definitions and their resolved form.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::BVec3;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use strata_voxel::{NodeId, NodeRegistry};

use crate::biome::BiomeId;
use crate::error::RegistrationError;
use crate::noise::NoiseParams;
use crate::resolve::{NameResolver, ResolveReport};
use crate::schematic::{RotationPolicy, Schematic, SchematicDef};
use crate::seed::stream_salt;

/// A column of nodes stacked on the ground.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimpleDecoration {
    /// Candidate nodes; one is picked uniformly per placement.
    pub decoration: Vec<String>,
    #[serde(default = "height_default")]
    pub height: i32,
    /// When positive, the height is uniform in `height..=height_max`.
    #[serde(default)]
    pub height_max: i32,
    #[serde(default)]
    pub spawn_by: Vec<String>,
    /// Minimum number of `spawn_by` neighbours; negative disables the check.
    #[serde(default = "num_spawn_by_default")]
    pub num_spawn_by: i32,
}

/// Where a schematic decoration gets its schematic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SchematicSource {
    /// A schematic registered under this name.
    Named(String),
    Inline(SchematicDef),
}

/// A schematic stamped on the ground.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchematicDecoration {
    pub schematic: SchematicSource,
    #[serde(default)]
    pub rotation: RotationPolicy,
    /// Node name substitutions applied to the schematic.
    #[serde(default)]
    pub replacements: BTreeMap<String, String>,
    #[serde(default)]
    pub force_placement: bool,
}

/// Decoration shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DecorationKind {
    Simple(SimpleDecoration),
    Schematic(SchematicDecoration),
    /// Grammar-grown structures. Accepted by the format but rejected at registration.
    Procedural,
}

/// Decoration descriptor as registered by content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecorationDef {
    pub name: String,
    pub kind: DecorationKind,
    /// Ground nodes the decoration may sit on.
    pub place_on: Vec<String>,
    /// Placements per column when no noise is given.
    #[serde(default = "fill_ratio_default")]
    pub fill_ratio: f64,
    /// Replaces `fill_ratio` with a 2D noise sampled at each part's centre.
    #[serde(default)]
    pub noise_params: Option<NoiseParams>,
    /// Side length of the square parts the chunk is divided into.
    #[serde(default = "sidelen_default")]
    pub sidelen: i32,
    #[serde(default = "y_min_default")]
    pub y_min: i32,
    #[serde(default = "y_max_default")]
    pub y_max: i32,
    /// Allowed biome names; empty allows all.
    #[serde(default)]
    pub biomes: Vec<String>,
    #[serde(default)]
    pub place_center_x: bool,
    #[serde(default)]
    pub place_center_y: bool,
    #[serde(default)]
    pub place_center_z: bool,
}

fn height_default() -> i32 {
    1
}

fn num_spawn_by_default() -> i32 {
    -1
}

fn fill_ratio_default() -> f64 {
    0.02
}

fn sidelen_default() -> i32 {
    8
}

fn y_min_default() -> i32 {
    -31000
}

fn y_max_default() -> i32 {
    31000
}

impl SimpleDecoration {
    /// One node high, no neighbour requirement.
    pub fn new(decoration: &[&str]) -> Self {
        Self {
            decoration: decoration.iter().map(|s| s.to_string()).collect(),
            height: height_default(),
            height_max: 0,
            spawn_by: Vec::new(),
            num_spawn_by: num_spawn_by_default(),
        }
    }
}

impl SchematicDecoration {
    pub fn new(schematic: SchematicSource) -> Self {
        Self {
            schematic,
            rotation: RotationPolicy::default(),
            replacements: BTreeMap::new(),
            force_placement: false,
        }
    }
}

impl DecorationDef {
    /// A simple decoration with every optional field at its default.
    pub fn simple(name: impl Into<String>, decoration: &[&str], place_on: &[&str]) -> Self {
        Self::with_kind(
            name,
            DecorationKind::Simple(SimpleDecoration::new(decoration)),
            place_on,
        )
    }

    /// A schematic decoration with every optional field at its default.
    pub fn schematic(name: impl Into<String>, source: SchematicSource, place_on: &[&str]) -> Self {
        Self::with_kind(
            name,
            DecorationKind::Schematic(SchematicDecoration::new(source)),
            place_on,
        )
    }

    fn with_kind(name: impl Into<String>, kind: DecorationKind, place_on: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind,
            place_on: place_on.iter().map(|s| s.to_string()).collect(),
            fill_ratio: fill_ratio_default(),
            noise_params: None,
            sidelen: sidelen_default(),
            y_min: y_min_default(),
            y_max: y_max_default(),
            biomes: Vec::new(),
            place_center_x: false,
            place_center_y: false,
            place_center_z: false,
        }
    }

    /// Checks the definition for errors that make it unusable.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.sidelen <= 0 {
            return Err(RegistrationError::NonPositiveSidelen(self.name.clone()));
        }
        if self.place_on.is_empty() {
            return Err(RegistrationError::EmptyNodeList {
                kind: "decoration",
                name: self.name.clone(),
                field: "place_on",
            });
        }
        match &self.kind {
            DecorationKind::Simple(simple) => {
                if simple.decoration.is_empty() {
                    return Err(RegistrationError::EmptyNodeList {
                        kind: "decoration",
                        name: self.name.clone(),
                        field: "decoration",
                    });
                }
                if simple.height <= 0 {
                    return Err(RegistrationError::NonPositiveHeight(self.name.clone()));
                }
                if simple.num_spawn_by >= 0 && simple.spawn_by.is_empty() {
                    return Err(RegistrationError::MissingSpawnBy(self.name.clone()));
                }
            }
            DecorationKind::Schematic(_) => {}
            DecorationKind::Procedural => {
                return Err(RegistrationError::UnsupportedKind(self.name.clone()));
            }
        }
        Ok(())
    }
}

/// Resolved shape of a decoration.
#[derive(Clone, Debug, PartialEq)]
pub enum DecorationPayload {
    Simple {
        decoration: Vec<NodeId>,
        height: i32,
        height_max: i32,
        spawn_by: Vec<NodeId>,
        num_spawn_by: i32,
    },
    Schematic {
        /// The schematic with replacements already applied.
        schematic: Arc<Schematic>,
        rotation: RotationPolicy,
        force_placement: bool,
    },
}

/// A decoration with node, biome, and schematic references resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoration {
    pub name: String,
    pub payload: DecorationPayload,
    pub place_on: Vec<NodeId>,
    pub fill_ratio: f64,
    pub noise_params: Option<NoiseParams>,
    pub sidelen: i32,
    pub y_min: i32,
    pub y_max: i32,
    /// Allowed biomes; empty allows all.
    pub biomes: Vec<BiomeId>,
    pub place_center: BVec3,
    /// Salt of this decoration's random stream.
    pub salt: u64,
}

impl Decoration {
    /// Resolves a validated definition.
    ///
    /// `biomes` are the definition's biome names already mapped to ids, and
    /// `schematic` the resolved schematic for schematic decorations (`None` if it
    /// is inert). Returns `None` (and reports) when anything fails to resolve.
    pub fn resolve(
        def: &DecorationDef,
        biomes: Vec<BiomeId>,
        schematic: Option<&Arc<Schematic>>,
        nodes: &NodeRegistry,
        report: &mut ResolveReport,
    ) -> Option<Self> {
        let mut r = NameResolver::new(nodes, report, "decoration", &def.name);
        let place_on = r.list(&def.place_on);
        let payload = match &def.kind {
            DecorationKind::Simple(simple) => Some(DecorationPayload::Simple {
                decoration: r.list(&simple.decoration),
                height: simple.height,
                height_max: simple.height_max,
                spawn_by: r.list(&simple.spawn_by),
                num_spawn_by: simple.num_spawn_by,
            }),
            DecorationKind::Schematic(schem) => {
                let mut replacements = HashMap::new();
                for (from, to) in &schem.replacements {
                    let from = r.required(from);
                    let to = r.required(to);
                    replacements.insert(from, to);
                }
                schematic.map(|s| DecorationPayload::Schematic {
                    schematic: if replacements.is_empty() {
                        Arc::clone(s)
                    } else {
                        Arc::new(s.with_replacements(&replacements))
                    },
                    rotation: schem.rotation,
                    force_placement: schem.force_placement,
                })
            }
            DecorationKind::Procedural => None,
        };
        let ok = r.finish();
        let payload = payload?;
        if !ok {
            return None;
        }
        Some(Self {
            name: def.name.clone(),
            payload,
            place_on,
            fill_ratio: def.fill_ratio,
            noise_params: def.noise_params,
            sidelen: def.sidelen,
            y_min: def.y_min,
            y_max: def.y_max,
            biomes,
            place_center: BVec3::new(def.place_center_x, def.place_center_y, def.place_center_z),
            salt: stream_salt("decoration", &def.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;
    use strata_voxel::{MapNode, NodeDef};

    #[test]
    fn test_validation_errors() {
        let ok = DecorationDef::simple("grass", &["grass"], &["dirt"]);
        assert!(ok.validate().is_ok());

        let bad = DecorationDef {
            sidelen: 0,
            ..ok.clone()
        };
        assert!(matches!(bad.validate(), Err(RegistrationError::NonPositiveSidelen(_))));

        let bad = DecorationDef::simple("x", &[], &["dirt"]);
        assert!(matches!(
            bad.validate(),
            Err(RegistrationError::EmptyNodeList { field: "decoration", .. })
        ));

        let mut bad = ok.clone();
        if let DecorationKind::Simple(s) = &mut bad.kind {
            s.height = 0;
        }
        assert!(matches!(bad.validate(), Err(RegistrationError::NonPositiveHeight(_))));

        let mut bad = ok.clone();
        if let DecorationKind::Simple(s) = &mut bad.kind {
            s.num_spawn_by = 1;
        }
        assert!(matches!(bad.validate(), Err(RegistrationError::MissingSpawnBy(_))));

        let bad = DecorationDef {
            kind: DecorationKind::Procedural,
            ..ok
        };
        assert!(matches!(bad.validate(), Err(RegistrationError::UnsupportedKind(_))));
    }

    #[test]
    fn test_ron_defaults() {
        let def: DecorationDef = ron::from_str(
            r#"(
                name: "cactus",
                kind: Simple((decoration: ["cactus"], height: 2, height_max: 4)),
                place_on: ["desert_sand"],
            )"#,
        )
        .unwrap();
        assert_eq!(def.fill_ratio, 0.02);
        assert_eq!(def.sidelen, 8);
        let DecorationKind::Simple(simple) = &def.kind else {
            panic!("expected simple decoration");
        };
        assert_eq!(simple.num_spawn_by, -1);
        assert_eq!(simple.height_max, 4);
    }

    #[test]
    fn test_replacements_resolved_into_schematic() {
        let mut nodes = NodeRegistry::new();
        let wood = nodes.register(NodeDef::solid("wood")).unwrap();
        let pine = nodes.register(NodeDef::solid("pine")).unwrap();
        nodes.register(NodeDef::solid("dirt")).unwrap();
        let schem = Arc::new(
            Schematic::new(IVec3::ONE, vec![MapNode::with_params(wood, 255, 0)], vec![255]).unwrap(),
        );

        let mut def = DecorationDef::schematic("tree", SchematicSource::Named("t".into()), &["dirt"]);
        if let DecorationKind::Schematic(s) = &mut def.kind {
            s.replacements.insert("wood".into(), "pine".into());
        }
        let mut report = ResolveReport::default();
        let deco = Decoration::resolve(&def, Vec::new(), Some(&schem), &nodes, &mut report).unwrap();
        let DecorationPayload::Schematic { schematic, .. } = &deco.payload else {
            panic!("expected schematic payload");
        };
        assert_eq!(schematic.data()[0].content, pine);
    }

    #[test]
    fn test_inert_schematic_makes_decoration_inert() {
        let mut nodes = NodeRegistry::new();
        nodes.register(NodeDef::solid("dirt")).unwrap();
        let def = DecorationDef::schematic("tree", SchematicSource::Named("t".into()), &["dirt"]);
        let mut report = ResolveReport::default();
        assert!(Decoration::resolve(&def, Vec::new(), None, &nodes, &mut report).is_none());
    }
}
