//! Ore registry: validated ore definitions in registration order.

use hashbrown::HashMap;
use strata_voxel::NodeRegistry;

use super::{Ore, OreDef};
use crate::error::RegistrationError;
use crate::resolve::ResolveReport;

/// Handle to a registered ore.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OreHandle(pub u32);

/// Stores ore definitions. Later ores overwrite earlier ones where they overlap.
#[derive(Clone, Debug, Default)]
pub struct OreRegistry {
    ores: Vec<OreDef>,
    name_to_handle: HashMap<String, OreHandle>,
}

impl OreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers an ore.
    ///
    /// # Errors
    ///
    /// Returns the first definition error found, or [`RegistrationError::DuplicateName`].
    pub fn register(&mut self, def: OreDef) -> Result<OreHandle, RegistrationError> {
        def.validate()?;
        if self.name_to_handle.contains_key(&def.name) {
            return Err(RegistrationError::DuplicateName {
                kind: "ore",
                name: def.name,
            });
        }
        let handle = OreHandle(self.ores.len() as u32);
        self.name_to_handle.insert(def.name.clone(), handle);
        self.ores.push(def);
        Ok(handle)
    }

    pub fn get(&self, handle: OreHandle) -> Option<&OreDef> {
        self.ores.get(handle.0 as usize)
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<OreHandle> {
        self.name_to_handle.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.ores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ores.is_empty()
    }

    /// Removes every ore.
    pub fn clear(&mut self) {
        self.ores.clear();
        self.name_to_handle.clear();
    }

    /// Resolves every ore, keeping handle positions. Inert ores resolve to `None`.
    pub fn resolve(&self, nodes: &NodeRegistry, report: &mut ResolveReport) -> Vec<Option<Ore>> {
        self.ores
            .iter()
            .map(|def| Ore::resolve(def, nodes, report))
            .collect()
    }
}
