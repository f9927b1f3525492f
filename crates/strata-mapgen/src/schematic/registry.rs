//! Schematic registry: named schematic definitions awaiting node resolution.

use std::path::Path;
use std::sync::Arc;

use hashbrown::HashMap;
use strata_voxel::NodeRegistry;

use super::{Schematic, SchematicDef};
use crate::error::RegistrationError;
use crate::resolve::ResolveReport;

/// Handle to a registered schematic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchematicHandle(pub u32);

#[derive(Clone, Debug)]
struct Entry {
    name: String,
    def: SchematicDef,
}

/// Stores schematic definitions by name until content is resolved.
#[derive(Clone, Debug, Default)]
pub struct SchematicRegistry {
    entries: Vec<Entry>,
    name_to_handle: HashMap<String, SchematicHandle>,
}

impl SchematicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a validated definition under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateName`] for a reused name and
    /// [`RegistrationError::Schematic`] for a structurally invalid definition.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        def: SchematicDef,
    ) -> Result<SchematicHandle, RegistrationError> {
        let name = name.into();
        if self.name_to_handle.contains_key(&name) {
            return Err(RegistrationError::DuplicateName {
                kind: "schematic",
                name,
            });
        }
        def.validate()
            .map_err(|source| RegistrationError::Schematic {
                name: name.clone(),
                source,
            })?;
        Ok(self.insert(name, def))
    }

    /// Registers a definition without a public name (e.g. one inlined in a decoration).
    pub(crate) fn register_anonymous(
        &mut self,
        owner: &str,
        def: SchematicDef,
    ) -> Result<SchematicHandle, RegistrationError> {
        let name = format!("{owner}#schematic");
        def.validate()
            .map_err(|source| RegistrationError::Schematic {
                name: name.clone(),
                source,
            })?;
        let handle = SchematicHandle(self.entries.len() as u32);
        self.entries.push(Entry { name, def });
        Ok(handle)
    }

    /// Loads an MTSM file and registers it under `name`.
    pub fn register_file(
        &mut self,
        name: impl Into<String>,
        path: &Path,
    ) -> Result<SchematicHandle, RegistrationError> {
        let name = name.into();
        let def = SchematicDef::load_mts(path).map_err(|source| RegistrationError::Schematic {
            name: name.clone(),
            source,
        })?;
        self.register(name, def)
    }

    fn insert(&mut self, name: String, def: SchematicDef) -> SchematicHandle {
        let handle = SchematicHandle(self.entries.len() as u32);
        self.name_to_handle.insert(name.clone(), handle);
        self.entries.push(Entry { name, def });
        handle
    }

    /// Looks up a schematic by name.
    pub fn lookup_by_name(&self, name: &str) -> Option<SchematicHandle> {
        self.name_to_handle.get(name).copied()
    }

    /// Returns the definition behind a handle.
    pub fn get(&self, handle: SchematicHandle) -> Option<&SchematicDef> {
        self.entries.get(handle.0 as usize).map(|e| &e.def)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every schematic.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.name_to_handle.clear();
    }

    /// Resolves every schematic. Entries with unknown names resolve to `None`.
    pub fn resolve(
        &self,
        nodes: &NodeRegistry,
        report: &mut ResolveReport,
    ) -> Vec<Option<Arc<Schematic>>> {
        self.entries
            .iter()
            .map(|e| match e.def.resolve(&e.name, nodes, report) {
                Ok(schem) => schem.map(Arc::new),
                // Definitions are validated on registration.
                Err(err) => {
                    tracing::warn!("schematic '{}' failed to resolve: {err}", e.name);
                    report.inert.push(("schematic", e.name.clone()));
                    None
                }
            })
            .collect()
    }
}
