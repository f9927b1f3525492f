//! Schematics: immutable probabilistic 3D stamps.
//!
//! A [`Schematic`] is a box of [`MapNode`]s whose `param1` holds the placement
//! probability of each cell (`0` never, `255` always), plus one probability per
//! Y slice. It can be rotated around the Y axis in 90° steps, blitted into a
//! [`VoxelRegion`], captured from one, and saved in the `MTSM` binary format.

mod def;
mod registry;
mod serial;

use std::str::FromStr;

use glam::IVec3;
use hashbrown::HashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use strata_voxel::{MapNode, NodeId, NodeRegistry, VoxelArea, VoxelRegion};

pub use def::{SchematicDef, SchematicNodeDef, SliceProb};
pub use registry::{SchematicHandle, SchematicRegistry};

/// Cell or slice probability meaning "never place".
pub const PROB_NEVER: u8 = 0x00;
/// Cell or slice probability meaning "always place"; no random roll is made.
pub const PROB_ALWAYS: u8 = 0xFF;

/// Errors produced while building, parsing, or writing schematics.
#[derive(Debug, thiserror::Error)]
pub enum SchematicError {
    /// The data does not start with `MTSM`.
    #[error("invalid magic bytes")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported schematic version: {0}")]
    UnsupportedVersion(u16),
    /// The data is shorter than its header claims.
    #[error("data truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    /// A dimension is zero, negative, or too large for the file format.
    #[error("invalid schematic size {0}")]
    InvalidSize(IVec3),
    /// The number of cells does not match the size.
    #[error("schematic has {actual} nodes, size requires {expected}")]
    NodeCountMismatch { expected: usize, actual: usize },
    /// The number of slice probabilities does not match the height.
    #[error("schematic has {actual} slice probabilities, height requires {expected}")]
    SliceCountMismatch { expected: usize, actual: usize },
    /// A slice probability refers to a Y outside the schematic.
    #[error("slice probability at y={ypos} is outside height {height}")]
    SliceOutOfRange { ypos: i32, height: i32 },
    /// A cell refers to a name-table entry that does not exist.
    #[error("name index {index} out of range ({count} names)")]
    NameIndexOutOfRange { index: u16, count: usize },
    /// A node name is not valid UTF-8.
    #[error("node name is not valid UTF-8")]
    InvalidName(#[source] std::str::Utf8Error),
    /// Reading or writing a schematic file failed.
    #[error("schematic I/O failed: {0}")]
    Io(#[source] std::io::Error),
    /// A text definition could not be parsed.
    #[error("failed to parse schematic definition: {0}")]
    Parse(#[source] ron::error::SpannedError),
    /// A text definition could not be written.
    #[error("failed to serialize schematic definition: {0}")]
    Serialize(#[source] ron::Error),
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Clockwise rotation around the Y axis when seen from above.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// All rotations in increasing angle.
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    /// Number of 90° steps.
    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }

    /// Rotation for `turns` 90° steps (taken modulo 4).
    pub fn from_quarter_turns(turns: u8) -> Self {
        Self::ALL[(turns & 3) as usize]
    }

    /// Rotation applied after `self`.
    pub fn then(self, other: Rotation) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + other.quarter_turns())
    }

    /// Returns `true` if X and Z extents swap.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }
}

/// How a placement picks its rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationPolicy {
    Fixed(Rotation),
    /// Uniform among the four rotations, drawn from the placement stream.
    Random,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        RotationPolicy::Fixed(Rotation::R0)
    }
}

impl RotationPolicy {
    /// Picks a rotation, consuming randomness only for [`RotationPolicy::Random`].
    pub fn pick(self, rng: &mut impl Rng) -> Rotation {
        match self {
            RotationPolicy::Fixed(r) => r,
            RotationPolicy::Random => Rotation::from_quarter_turns(rng.random_range(0..4u8)),
        }
    }
}

/// Error for rotation strings other than `0`, `90`, `180`, `270`, or `random`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid rotation '{0}' (expected 0, 90, 180, 270, or random)")]
pub struct ParseRotationError(pub String);

impl FromStr for RotationPolicy {
    type Err = ParseRotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Self::Fixed(Rotation::R0)),
            "90" => Ok(Self::Fixed(Rotation::R90)),
            "180" => Ok(Self::Fixed(Rotation::R180)),
            "270" => Ok(Self::Fixed(Rotation::R270)),
            "random" => Ok(Self::Random),
            other => Err(ParseRotationError(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Schematic
// ---------------------------------------------------------------------------

/// A resolved schematic: node ids plus per-cell and per-slice probabilities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schematic {
    size: IVec3,
    data: Vec<MapNode>,
    slice_probs: Vec<u8>,
}

impl Schematic {
    /// Builds a schematic, validating that `data` and `slice_probs` match `size`.
    pub fn new(size: IVec3, data: Vec<MapNode>, slice_probs: Vec<u8>) -> Result<Self, SchematicError> {
        if size.cmple(IVec3::ZERO).any() {
            return Err(SchematicError::InvalidSize(size));
        }
        let expected = size.x as usize * size.y as usize * size.z as usize;
        if data.len() != expected {
            return Err(SchematicError::NodeCountMismatch {
                expected,
                actual: data.len(),
            });
        }
        if slice_probs.len() != size.y as usize {
            return Err(SchematicError::SliceCountMismatch {
                expected: size.y as usize,
                actual: slice_probs.len(),
            });
        }
        Ok(Self {
            size,
            data,
            slice_probs,
        })
    }

    /// Captures `area` from `region` with every probability set to [`PROB_ALWAYS`].
    ///
    /// Cells outside the region are captured as ignore.
    pub fn from_region(region: &VoxelRegion, area: &VoxelArea) -> Self {
        let data = area
            .iter()
            .map(|p| {
                let mut node = region.get(p);
                node.param1 = PROB_ALWAYS;
                node
            })
            .collect();
        let size = area.extent();
        Self {
            size,
            data,
            slice_probs: vec![PROB_ALWAYS; size.y as usize],
        }
    }

    /// Size along each axis.
    pub fn size(&self) -> IVec3 {
        self.size
    }

    /// Cells in x-fastest order; `param1` is the probability.
    pub fn data(&self) -> &[MapNode] {
        &self.data
    }

    /// Probability of each Y slice.
    pub fn slice_probs(&self) -> &[u8] {
        &self.slice_probs
    }

    fn cell_index(&self, p: IVec3) -> Option<usize> {
        if p.cmplt(IVec3::ZERO).any() || p.cmpge(self.size).any() {
            return None;
        }
        Some((p.x + p.y * self.size.x + p.z * self.size.x * self.size.y) as usize)
    }

    /// Sets per-cell and per-slice probabilities. Positions are relative to the
    /// schematic origin; entries outside the schematic are ignored.
    pub fn apply_probabilities(&mut self, cells: &[(IVec3, u8)], slices: &[(i32, u8)]) {
        for &(p, prob) in cells {
            if let Some(i) = self.cell_index(p) {
                self.data[i].param1 = prob;
            }
        }
        for &(y, prob) in slices {
            if let Some(slot) = usize::try_from(y).ok().and_then(|y| self.slice_probs.get_mut(y)) {
                *slot = prob;
            }
        }
    }

    /// Returns a copy with node contents substituted according to `replacements`.
    pub fn with_replacements(&self, replacements: &HashMap<NodeId, NodeId>) -> Self {
        let mut out = self.clone();
        for node in &mut out.data {
            if let Some(&to) = replacements.get(&node.content) {
                node.content = to;
            }
        }
        out
    }

    /// Extent after rotation.
    pub fn rotated_size(&self, rotation: Rotation) -> IVec3 {
        if rotation.swaps_axes() {
            IVec3::new(self.size.z, self.size.y, self.size.x)
        } else {
            self.size
        }
    }

    /// Index of the source cell that lands at `(x, y, z)` of the rotated box.
    fn source_index(&self, rotation: Rotation, x: i32, y: i32, z: i32) -> usize {
        let (sx, sz) = (self.size.x, self.size.z);
        let (src_x, src_z) = match rotation {
            Rotation::R0 => (x, z),
            Rotation::R90 => (sx - 1 - z, x),
            Rotation::R180 => (sx - 1 - x, sz - 1 - z),
            Rotation::R270 => (z, sz - 1 - x),
        };
        (src_x + y * sx + src_z * sx * self.size.y) as usize
    }

    /// Materializes a rotated copy. Oriented nodes have their `param2` rotated too.
    pub fn rotated(&self, rotation: Rotation, nodes: &NodeRegistry) -> Self {
        let size = self.rotated_size(rotation);
        let mut data = Vec::with_capacity(self.data.len());
        for z in 0..size.z {
            for y in 0..size.y {
                for x in 0..size.x {
                    let mut node = self.data[self.source_index(rotation, x, y, z)];
                    node.rotate_y(nodes.param2_kind(node.content), rotation.quarter_turns());
                    data.push(node);
                }
            }
        }
        Self {
            size,
            data,
            slice_probs: self.slice_probs.clone(),
        }
    }

    /// Stamps the schematic into `region` with its minimum corner at `origin`.
    ///
    /// Slices and cells with a probability below [`PROB_ALWAYS`] are kept when a
    /// roll in `1..=255` does not exceed it. Ignore cells are never written, and
    /// unless `force_placement` is set only air or ignore in the region is
    /// overwritten. Written nodes get `param1 = 0`. Returns the number of nodes written.
    pub fn place(
        &self,
        region: &mut VoxelRegion,
        origin: IVec3,
        rotation: Rotation,
        force_placement: bool,
        rng: &mut impl Rng,
        nodes: &NodeRegistry,
    ) -> usize {
        let size = self.rotated_size(rotation);
        let turns = rotation.quarter_turns();
        let mut written = 0;
        for z in 0..size.z {
            for y in 0..size.y {
                let slice_prob = self.slice_probs[y as usize];
                if slice_prob != PROB_ALWAYS && rng.random_range(1..=255u8) > slice_prob {
                    continue;
                }
                for x in 0..size.x {
                    let p = origin + IVec3::new(x, y, z);
                    let Some(vi) = region.area().try_index(p) else {
                        continue;
                    };
                    let cell = self.data[self.source_index(rotation, x, y, z)];
                    if cell.content == NodeId::IGNORE || cell.param1 == PROB_NEVER {
                        continue;
                    }
                    if !force_placement && !region.get_index(vi).content.is_air_or_ignore() {
                        continue;
                    }
                    if cell.param1 != PROB_ALWAYS && rng.random_range(1..=255u8) > cell.param1 {
                        continue;
                    }
                    let mut node = MapNode::with_params(cell.content, 0, cell.param2);
                    node.rotate_y(nodes.param2_kind(node.content), turns);
                    region.set_index(vi, node);
                    written += 1;
                }
            }
        }
        written
    }

    /// Converts back to the name-based definition, e.g. for saving.
    ///
    /// Ids unknown to `nodes` are written as `ignore`.
    pub fn to_def(&self, nodes: &NodeRegistry) -> SchematicDef {
        let data = self
            .data
            .iter()
            .map(|n| SchematicNodeDef {
                name: nodes.name_of(n.content).unwrap_or("ignore").to_string(),
                prob: n.param1,
                param2: n.param2,
            })
            .collect();
        let yslice_prob = self
            .slice_probs
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p != PROB_ALWAYS)
            .map(|(y, &prob)| SliceProb {
                ypos: y as i32,
                prob,
            })
            .collect();
        SchematicDef {
            size: self.size,
            data,
            yslice_prob,
        }
    }
}
