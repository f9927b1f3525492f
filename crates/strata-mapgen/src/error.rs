//! Error types shared by the content registries.

use thiserror::Error;

use crate::ore::OreKind;
use crate::schematic::SchematicError;

/// A definition rejected at registration time.
///
/// Nothing is stored when registration fails; the caller may fix the record and retry.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A record of the same kind already uses this name.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName {
        /// Record kind ("biome", "ore", ...).
        kind: &'static str,
        /// The conflicting name.
        name: String,
    },

    #[error("ore '{0}': clust_scarcity must be greater than 0")]
    NonPositiveScarcity(String),

    #[error("ore '{0}': clust_num_ores must be greater than 0")]
    NonPositiveClusterOres(String),

    #[error("ore '{0}': clust_size must not be negative")]
    NegativeClusterSize(String),

    /// Sheet, blob, and vein ores are shaped by noise and cannot be placed without it.
    #[error("ore '{name}': {kind:?} ores require noise parameters")]
    MissingNoise { name: String, kind: OreKind },

    /// A list of node names that must not be empty was empty.
    #[error("{kind} '{name}': '{field}' must name at least one node")]
    EmptyNodeList {
        kind: &'static str,
        name: String,
        field: &'static str,
    },

    #[error("decoration '{0}': sidelen must be greater than 0")]
    NonPositiveSidelen(String),

    #[error("decoration '{0}': height must be greater than 0")]
    NonPositiveHeight(String),

    #[error("decoration '{0}': num_spawn_by is set but spawn_by is empty")]
    MissingSpawnBy(String),

    #[error("decoration '{0}': procedural decorations are not supported")]
    UnsupportedKind(String),

    #[error("decoration '{decoration}': unknown biome '{biome}'")]
    UnknownBiome { decoration: String, biome: String },

    #[error("decoration '{decoration}': unknown schematic '{schematic}'")]
    UnknownSchematic {
        decoration: String,
        schematic: String,
    },

    /// An inline or file-backed schematic is structurally invalid.
    #[error("schematic '{name}' is invalid")]
    Schematic {
        name: String,
        #[source]
        source: SchematicError,
    },
}

/// A node name that could not be found during content resolution.
///
/// The owning record becomes inert: it stays registered but places nothing.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} '{record}': unknown node '{node}'")]
pub struct ResolveError {
    /// Record kind ("biome", "ore", ...).
    pub kind: &'static str,
    /// Name of the record holding the reference.
    pub record: String,
    /// The name that failed to resolve.
    pub node: String,
}
