//! Name-based schematic definition, as written by content authors and stored on disk.

use glam::IVec3;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use strata_voxel::{MapNode, NodeRegistry};

use super::{PROB_ALWAYS, Schematic, SchematicError};
use crate::resolve::{NameResolver, ResolveReport};

/// One schematic cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchematicNodeDef {
    pub name: String,
    #[serde(default = "prob_always")]
    pub prob: u8,
    #[serde(default)]
    pub param2: u8,
}

/// Probability of one Y slice. Slices not listed always place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceProb {
    pub ypos: i32,
    pub prob: u8,
}

fn prob_always() -> u8 {
    PROB_ALWAYS
}

/// A schematic with node names instead of ids.
///
/// ```ron
/// (
///     size: (2, 1, 1),
///     data: [(name: "default:wood"), (name: "air", prob: 0)],
///     yslice_prob: [(ypos: 0, prob: 200)],
/// )
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchematicDef {
    pub size: IVec3,
    pub data: Vec<SchematicNodeDef>,
    #[serde(default)]
    pub yslice_prob: Vec<SliceProb>,
}

impl SchematicDef {
    /// Checks the cell count and slice positions against the size.
    pub fn validate(&self) -> Result<(), SchematicError> {
        if self.size.cmple(IVec3::ZERO).any() {
            return Err(SchematicError::InvalidSize(self.size));
        }
        let expected = self.size.x as usize * self.size.y as usize * self.size.z as usize;
        if self.data.len() != expected {
            return Err(SchematicError::NodeCountMismatch {
                expected,
                actual: self.data.len(),
            });
        }
        if let Some(bad) = self
            .yslice_prob
            .iter()
            .find(|s| s.ypos < 0 || s.ypos >= self.size.y)
        {
            return Err(SchematicError::SliceOutOfRange {
                ypos: bad.ypos,
                height: self.size.y,
            });
        }
        Ok(())
    }

    /// Dense per-slice probabilities.
    pub fn slice_probs(&self) -> Vec<u8> {
        let mut probs = vec![PROB_ALWAYS; self.size.y.max(0) as usize];
        for s in &self.yslice_prob {
            if let Some(slot) = usize::try_from(s.ypos).ok().and_then(|y| probs.get_mut(y)) {
                *slot = s.prob;
            }
        }
        probs
    }

    /// Renames nodes, e.g. to map one game's names onto another's.
    pub fn replace_names(&mut self, replacements: &HashMap<String, String>) {
        for cell in &mut self.data {
            if let Some(to) = replacements.get(&cell.name) {
                cell.name.clone_from(to);
            }
        }
    }

    /// Resolves names to ids. Returns `None` (and reports) if any name is unknown.
    pub fn resolve(
        &self,
        record: &str,
        nodes: &NodeRegistry,
        report: &mut ResolveReport,
    ) -> Result<Option<Schematic>, SchematicError> {
        self.validate()?;
        let mut r = NameResolver::new(nodes, report, "schematic", record);
        let data: Vec<MapNode> = self
            .data
            .iter()
            .map(|cell| MapNode::with_params(r.required(&cell.name), cell.prob, cell.param2))
            .collect();
        if !r.finish() {
            return Ok(None);
        }
        Schematic::new(self.size, data, self.slice_probs()).map(Some)
    }

    /// Parses a RON definition.
    pub fn from_ron(text: &str) -> Result<Self, SchematicError> {
        let def: Self = ron::from_str(text).map_err(SchematicError::Parse)?;
        def.validate()?;
        Ok(def)
    }

    /// Writes the definition as pretty RON.
    pub fn to_ron(&self) -> Result<String, SchematicError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())
            .map_err(SchematicError::Serialize)
    }
}
