//! Decoration registry.

use std::sync::Arc;

use hashbrown::HashMap;
use strata_voxel::NodeRegistry;

use super::{Decoration, DecorationDef, DecorationKind, SchematicSource};
use crate::biome::{BiomeId, BiomeRegistry};
use crate::error::RegistrationError;
use crate::resolve::ResolveReport;
use crate::schematic::{Schematic, SchematicHandle, SchematicRegistry};

/// Handle to a registered decoration. Also the id used in `decoration#<id>` notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecorationHandle(pub u32);

#[derive(Clone, Debug)]
struct Entry {
    def: DecorationDef,
    biomes: Vec<BiomeId>,
    schematic: Option<SchematicHandle>,
}

/// Stores decoration definitions with their biome and schematic references bound.
#[derive(Clone, Debug, Default)]
pub struct DecorationRegistry {
    entries: Vec<Entry>,
    name_to_handle: HashMap<String, DecorationHandle>,
}

impl DecorationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a decoration.
    ///
    /// Biome names are looked up in `biomes`. A named schematic must already be in
    /// `schematics`; an inline one is registered there anonymously.
    ///
    /// # Errors
    ///
    /// Definition errors, [`RegistrationError::DuplicateName`],
    /// [`RegistrationError::UnknownBiome`] and [`RegistrationError::UnknownSchematic`].
    pub fn register(
        &mut self,
        def: DecorationDef,
        biomes: &BiomeRegistry,
        schematics: &mut SchematicRegistry,
    ) -> Result<DecorationHandle, RegistrationError> {
        def.validate()?;
        if self.name_to_handle.contains_key(&def.name) {
            return Err(RegistrationError::DuplicateName {
                kind: "decoration",
                name: def.name,
            });
        }

        let biome_ids = def
            .biomes
            .iter()
            .map(|name| {
                biomes
                    .lookup_by_name(name)
                    .ok_or_else(|| RegistrationError::UnknownBiome {
                        decoration: def.name.clone(),
                        biome: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let schematic = match &def.kind {
            DecorationKind::Schematic(s) => Some(match &s.schematic {
                SchematicSource::Named(name) => schematics.lookup_by_name(name).ok_or_else(|| {
                    RegistrationError::UnknownSchematic {
                        decoration: def.name.clone(),
                        schematic: name.clone(),
                    }
                })?,
                SchematicSource::Inline(inline) => {
                    schematics.register_anonymous(&def.name, inline.clone())?
                }
            }),
            _ => None,
        };

        let handle = DecorationHandle(self.entries.len() as u32);
        self.name_to_handle.insert(def.name.clone(), handle);
        self.entries.push(Entry {
            def,
            biomes: biome_ids,
            schematic,
        });
        Ok(handle)
    }

    pub fn get(&self, handle: DecorationHandle) -> Option<&DecorationDef> {
        self.entries.get(handle.0 as usize).map(|e| &e.def)
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<DecorationHandle> {
        self.name_to_handle.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every decoration.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.name_to_handle.clear();
    }

    /// Resolves every decoration against resolved schematics, keeping handle positions.
    pub fn resolve(
        &self,
        nodes: &NodeRegistry,
        schematics: &[Option<Arc<Schematic>>],
        report: &mut ResolveReport,
    ) -> Vec<Option<Decoration>> {
        self.entries
            .iter()
            .map(|e| {
                let schematic = e
                    .schematic
                    .and_then(|h| schematics.get(h.0 as usize))
                    .and_then(Option::as_ref);
                Decoration::resolve(&e.def, e.biomes.clone(), schematic, nodes, report)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeDef;
    use crate::schematic::SchematicDef;
    use strata_voxel::NodeDef;

    fn one_node_schematic(name: &str) -> SchematicDef {
        SchematicDef::from_ron(&format!(
            r#"(size: (1, 1, 1), data: [(name: "{name}")], yslice_prob: [])"#
        ))
        .unwrap()
    }

    #[test]
    fn test_unknown_references_are_rejected() {
        let biomes = BiomeRegistry::new();
        let mut schematics = SchematicRegistry::new();
        let mut reg = DecorationRegistry::new();

        let mut def = DecorationDef::simple("grass", &["grass"], &["dirt"]);
        def.biomes.push("tundra".into());
        assert!(matches!(
            reg.register(def, &biomes, &mut schematics),
            Err(RegistrationError::UnknownBiome { .. })
        ));

        let def = DecorationDef::schematic("tree", SchematicSource::Named("oak".into()), &["dirt"]);
        assert!(matches!(
            reg.register(def, &biomes, &mut schematics),
            Err(RegistrationError::UnknownSchematic { .. })
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_register_binds_biomes_and_inline_schematics() {
        let mut biomes = BiomeRegistry::new();
        let plains = biomes
            .register(BiomeDef {
                name: "plains".into(),
                ..Default::default()
            })
            .unwrap();
        let mut schematics = SchematicRegistry::new();
        let mut reg = DecorationRegistry::new();

        let mut grass = DecorationDef::simple("grass", &["grass"], &["dirt"]);
        grass.biomes.push("plains".into());
        let h = reg.register(grass.clone(), &biomes, &mut schematics).unwrap();
        assert_eq!(h, DecorationHandle(0));
        assert_eq!(reg.entries[0].biomes, vec![plains]);
        assert!(matches!(
            reg.register(grass, &biomes, &mut schematics),
            Err(RegistrationError::DuplicateName { kind: "decoration", .. })
        ));

        let inline = DecorationDef::schematic(
            "boulder",
            SchematicSource::Inline(one_node_schematic("stone")),
            &["dirt"],
        );
        reg.register(inline, &biomes, &mut schematics).unwrap();
        assert_eq!(schematics.len(), 1);
        assert_eq!(schematics.lookup_by_name("boulder#schematic"), None);
    }

    #[test]
    fn test_resolve_keeps_positions() {
        let mut nodes = NodeRegistry::new();
        nodes.register(NodeDef::solid("dirt")).unwrap();
        nodes.register(NodeDef::solid("stone")).unwrap();
        nodes.register(NodeDef::plant("grass")).unwrap();

        let biomes = BiomeRegistry::new();
        let mut schematics = SchematicRegistry::new();
        let mut reg = DecorationRegistry::new();
        reg.register(DecorationDef::simple("fern", &["fern"], &["dirt"]), &biomes, &mut schematics)
            .unwrap();
        reg.register(
            DecorationDef::schematic(
                "boulder",
                SchematicSource::Inline(one_node_schematic("stone")),
                &["dirt"],
            ),
            &biomes,
            &mut schematics,
        )
        .unwrap();

        let mut report = ResolveReport::default();
        let resolved_schematics = schematics.resolve(&nodes, &mut report);
        let decos = reg.resolve(&nodes, &resolved_schematics, &mut report);
        assert_eq!(decos.len(), 2);
        assert!(decos[0].is_none());
        let boulder = decos[1].as_ref().unwrap();
        assert_eq!(boulder.name, "boulder");
        assert_eq!(report.inert_count(), 1);
    }
}
