//! Ore definitions and their resolved form.

use serde::{Deserialize, Serialize};
use strata_voxel::{MapNode, NodeId, NodeRegistry};

use crate::error::RegistrationError;
use crate::noise::NoiseParams;
use crate::resolve::{NameResolver, ResolveReport};
use crate::seed::stream_salt;

/// Deposit shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OreKind {
    /// Roughly spherical clusters at random positions.
    #[default]
    Scatter,
    /// Horizontal layers following 2D noise.
    Sheet,
    /// Noise-perturbed ellipsoids.
    Blob,
    /// Random-walk strands.
    Vein,
}

impl OreKind {
    /// Returns `true` for kinds shaped by noise.
    pub fn needs_noise(self) -> bool {
        !matches!(self, OreKind::Scatter)
    }

    fn name(self) -> &'static str {
        match self {
            OreKind::Scatter => "scatter",
            OreKind::Sheet => "sheet",
            OreKind::Blob => "blob",
            OreKind::Vein => "vein",
        }
    }
}

/// Ore descriptor as registered by content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OreDef {
    pub name: String,
    #[serde(default)]
    pub kind: OreKind,
    /// Node placed by the ore.
    pub ore: String,
    #[serde(default)]
    pub ore_param2: u8,
    /// Nodes the ore may replace.
    pub wherein: Vec<String>,
    /// Map blocks (16³ nodes) per cluster attempt.
    #[serde(default = "one")]
    pub clust_scarcity: i32,
    /// Expected nodes per cluster.
    #[serde(default = "one")]
    pub clust_num_ores: i32,
    /// Cluster radius in nodes (sheet: thickness scale).
    #[serde(default)]
    pub clust_size: i32,
    #[serde(default)]
    pub noise_params: Option<NoiseParams>,
    #[serde(default)]
    pub noise_threshold: f64,
    #[serde(default = "y_min_default")]
    pub y_min: i32,
    #[serde(default = "y_max_default")]
    pub y_max: i32,
    /// Also place in the range mirrored around y = 0.
    #[serde(default)]
    pub absheight: bool,
    /// Direction jitter of vein walks.
    #[serde(default = "random_factor_default")]
    pub random_factor: f64,
}

fn one() -> i32 {
    1
}

fn y_min_default() -> i32 {
    -31000
}

fn y_max_default() -> i32 {
    31000
}

fn random_factor_default() -> f64 {
    1.0
}

impl OreDef {
    /// A scatter ore with every optional field at its default.
    pub fn scatter(name: impl Into<String>, ore: impl Into<String>, wherein: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: OreKind::Scatter,
            ore: ore.into(),
            ore_param2: 0,
            wherein: wherein.iter().map(|s| s.to_string()).collect(),
            clust_scarcity: 1,
            clust_num_ores: 1,
            clust_size: 0,
            noise_params: None,
            noise_threshold: 0.0,
            y_min: y_min_default(),
            y_max: y_max_default(),
            absheight: false,
            random_factor: random_factor_default(),
        }
    }

    /// Checks the definition for errors that make it unusable.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.clust_scarcity <= 0 {
            return Err(RegistrationError::NonPositiveScarcity(self.name.clone()));
        }
        if self.clust_num_ores <= 0 {
            return Err(RegistrationError::NonPositiveClusterOres(self.name.clone()));
        }
        if self.clust_size < 0 {
            return Err(RegistrationError::NegativeClusterSize(self.name.clone()));
        }
        if self.kind.needs_noise() && self.noise_params.is_none() {
            return Err(RegistrationError::MissingNoise {
                name: self.name.clone(),
                kind: self.kind,
            });
        }
        if self.wherein.is_empty() {
            return Err(RegistrationError::EmptyNodeList {
                kind: "ore",
                name: self.name.clone(),
                field: "wherein",
            });
        }
        Ok(())
    }
}

/// An ore with node names resolved to ids. Counts are validated positive.
#[derive(Clone, Debug, PartialEq)]
pub struct Ore {
    pub name: String,
    pub kind: OreKind,
    pub ore: MapNode,
    pub wherein: Vec<NodeId>,
    pub clust_scarcity: u32,
    pub clust_num_ores: u32,
    pub clust_size: u32,
    pub noise_params: Option<NoiseParams>,
    pub noise_threshold: f64,
    pub y_min: i32,
    pub y_max: i32,
    pub absheight: bool,
    pub random_factor: f64,
    /// Salt of this ore's random stream.
    pub salt: u64,
}

impl Ore {
    /// Resolves a validated definition. Returns `None` (and reports) on unknown names.
    pub fn resolve(def: &OreDef, nodes: &NodeRegistry, report: &mut ResolveReport) -> Option<Self> {
        let mut r = NameResolver::new(nodes, report, "ore", &def.name);
        let ore = r.required(&def.ore);
        let wherein = r.list(&def.wherein);
        if !r.finish() {
            return None;
        }
        Some(Self {
            name: def.name.clone(),
            kind: def.kind,
            ore: MapNode::with_params(ore, 0, def.ore_param2),
            wherein,
            clust_scarcity: def.clust_scarcity.max(1) as u32,
            clust_num_ores: def.clust_num_ores.max(1) as u32,
            clust_size: def.clust_size.max(0) as u32,
            noise_params: def.noise_params,
            noise_threshold: def.noise_threshold,
            y_min: def.y_min,
            y_max: def.y_max,
            absheight: def.absheight,
            random_factor: def.random_factor,
            salt: stream_salt(def.kind.name(), &def.name),
        })
    }

    /// Returns `true` if the ore may replace `content`.
    #[inline]
    pub fn replaces(&self, content: NodeId) -> bool {
        self.wherein.contains(&content)
    }
}
