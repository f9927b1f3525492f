//! Node registry: maps compact [`NodeId`] values to [`NodeDef`] metadata.
//!
//! The registry is built once, before any content definition is resolved. Air is
//! always ID 0 and Ignore ID 1, so zero-initialized buffers represent empty space.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::{NodeId, Param2Kind};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Full descriptor for a node type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    /// Unique name (e.g. "mapgen_stone", "default:dirt_with_grass").
    pub name: String,
    /// Whether entities stand on this node. Ground scans stop at the first walkable node.
    #[serde(default = "default_true")]
    pub walkable: bool,
    /// Whether this node is a liquid source or flow.
    #[serde(default)]
    pub liquid: bool,
    /// Interpretation of `param2`.
    #[serde(default)]
    pub param2_kind: Param2Kind,
}

fn default_true() -> bool {
    true
}

impl NodeDef {
    /// A plain solid node with no orientation.
    pub fn solid(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            walkable: true,
            liquid: false,
            param2_kind: Param2Kind::None,
        }
    }

    /// A non-walkable liquid node.
    pub fn liquid(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            walkable: false,
            liquid: true,
            param2_kind: Param2Kind::None,
        }
    }

    /// A non-walkable, non-liquid node such as grass tufts or flowers.
    pub fn plant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            walkable: false,
            liquid: false,
            param2_kind: Param2Kind::None,
        }
    }
}

/// Errors that can occur during node registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A node with the same name has already been registered.
    #[error("duplicate node name: {0}")]
    DuplicateName(String),
    /// All 65 536 slots have been consumed.
    #[error("node registry is full (max 65536 nodes)")]
    RegistryFull,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps [`NodeId`] → [`NodeDef`] with O(1) lookup by index and
/// O(1) reverse lookup by name.
#[derive(Clone, Debug)]
pub struct NodeRegistry {
    /// Dense array where `index == NodeId.0`.
    nodes: Vec<NodeDef>,
    /// Reverse lookup: name → ID.
    name_to_id: FxHashMap<String, NodeId>,
    /// Alternative names (e.g. "mapgen_stone" → "default:stone").
    aliases: FxHashMap<String, String>,
}

impl NodeRegistry {
    /// Creates a new registry with Air (ID 0) and Ignore (ID 1) pre-registered.
    pub fn new() -> Self {
        let air = NodeDef {
            name: "air".to_string(),
            walkable: false,
            liquid: false,
            param2_kind: Param2Kind::None,
        };
        let ignore = NodeDef {
            name: "ignore".to_string(),
            walkable: false,
            liquid: false,
            param2_kind: Param2Kind::None,
        };

        let mut name_to_id = FxHashMap::default();
        name_to_id.insert("air".to_string(), NodeId::AIR);
        name_to_id.insert("ignore".to_string(), NodeId::IGNORE);

        Self {
            nodes: vec![air, ignore],
            name_to_id,
            aliases: FxHashMap::default(),
        }
    }

    /// Registers a new node and returns its assigned ID.
    ///
    /// IDs are assigned sequentially starting from 2.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if a node with the same name
    /// already exists, or [`RegistryError::RegistryFull`] if all slots are consumed.
    pub fn register(&mut self, def: NodeDef) -> Result<NodeId, RegistryError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        if self.nodes.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }

        let id = NodeId(self.nodes.len() as u16);
        self.name_to_id.insert(def.name.clone(), id);
        self.nodes.push(def);
        Ok(id)
    }

    /// Registers `alias` as another name for `target`. Aliases are followed one level deep.
    pub fn register_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    /// Returns the definition for a given ID, or `None` if it was never registered.
    pub fn get(&self, id: NodeId) -> Option<&NodeDef> {
        self.nodes.get(id.0 as usize)
    }

    /// Returns the ID for a named node (following aliases), or `None` if not found.
    pub fn lookup_by_name(&self, name: &str) -> Option<NodeId> {
        if let Some(&id) = self.name_to_id.get(name) {
            return Some(id);
        }
        self.aliases
            .get(name)
            .and_then(|target| self.name_to_id.get(target).copied())
    }

    /// Returns the canonical name of a node id.
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.get(id).map(|def| def.name.as_str())
    }

    /// Returns the total number of registered nodes (including Air and Ignore).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if only the built-in nodes are registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 2
    }

    /// Returns `true` if the node is walkable. Unknown IDs are treated like air.
    pub fn is_walkable(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|def| def.walkable)
    }

    /// Returns `true` if the node is a liquid.
    pub fn is_liquid(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|def| def.liquid)
    }

    /// Returns the `param2` interpretation of a node.
    pub fn param2_kind(&self, id: NodeId) -> Param2Kind {
        self.get(id)
            .map(|def| def.param2_kind)
            .unwrap_or(Param2Kind::None)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
