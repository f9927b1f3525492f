//! Biome registry: maps [`BiomeId`] to [`BiomeDef`] with name-based lookup.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use strata_voxel::NodeRegistry;

use super::{Biome, BiomeClassifier, BiomeDef};
use crate::error::RegistrationError;
use crate::resolve::ResolveReport;

/// Unique identifier for a biome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BiomeId(pub u16);

impl BiomeId {
    /// The built-in fallback biome, used when no registered biome is usable.
    pub const NONE: Self = Self(u16::MAX);
}

/// Stores all registered biome definitions with O(1) lookup by ID.
#[derive(Clone, Debug, Default)]
pub struct BiomeRegistry {
    biomes: Vec<BiomeDef>,
    name_to_id: HashMap<String, BiomeId>,
    default: Option<BiomeId>,
}

impl BiomeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new biome definition, returning its assigned [`BiomeId`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateName`] if a biome with the same name exists.
    pub fn register(&mut self, def: BiomeDef) -> Result<BiomeId, RegistrationError> {
        if !def.name.is_empty() && self.name_to_id.contains_key(&def.name) {
            return Err(RegistrationError::DuplicateName {
                kind: "biome",
                name: def.name,
            });
        }
        let id = BiomeId(self.biomes.len() as u16);
        if !def.name.is_empty() {
            self.name_to_id.insert(def.name.clone(), id);
        }
        self.biomes.push(def);
        Ok(id)
    }

    /// Makes `id` the biome chosen when no biome matches a column.
    pub fn set_default(&mut self, id: BiomeId) {
        self.default = Some(id);
    }

    /// Returns the definition for the given biome ID, if registered.
    pub fn get(&self, id: BiomeId) -> Option<&BiomeDef> {
        self.biomes.get(id.0 as usize)
    }

    /// Looks up a biome ID by name.
    pub fn lookup_by_name(&self, name: &str) -> Option<BiomeId> {
        self.name_to_id.get(name).copied()
    }

    /// Returns the number of registered biomes.
    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    /// Returns `true` if no biomes are registered.
    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    /// Removes every biome.
    pub fn clear(&mut self) {
        self.biomes.clear();
        self.name_to_id.clear();
        self.default = None;
    }

    /// Iterates definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (BiomeId, &BiomeDef)> {
        self.biomes
            .iter()
            .enumerate()
            .map(|(i, def)| (BiomeId(i as u16), def))
    }

    /// Resolves every biome and builds the classifier over the usable ones.
    pub fn resolve(&self, nodes: &NodeRegistry, report: &mut ResolveReport) -> BiomeClassifier {
        let resolved: Vec<Biome> = self
            .iter()
            .filter_map(|(id, def)| Biome::resolve(id, def, nodes, report))
            .collect();
        let mut classifier = BiomeClassifier::new(resolved);
        if let Some(id) = self.default {
            classifier.set_default(id);
        }
        classifier
    }
}
