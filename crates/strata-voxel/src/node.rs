//! Node identifiers and the per-voxel [`MapNode`] cell stored in a [`VoxelRegion`](crate::VoxelRegion).

use serde::{Deserialize, Serialize};

/// Compact node identifier stored inside every voxel cell (2 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u16);

impl NodeId {
    /// Empty space. Always registered first so zeroed memory reads as air.
    pub const AIR: Self = Self(0);
    /// "Not loaded / do not touch". Schematic cells holding it are never written.
    pub const IGNORE: Self = Self(1);

    /// Returns `true` for air or ignore, the two contents generation may overwrite freely.
    #[inline]
    pub fn is_air_or_ignore(self) -> bool {
        self == Self::AIR || self == Self::IGNORE
    }
}

/// How a node interprets its `param2` byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Param2Kind {
    /// `param2` carries no orientation.
    #[default]
    None,
    /// Low two bits hold a facing direction around the Y axis.
    FaceDir,
    /// Low three bits hold the face the node is attached to (0 = ceiling, 1 = floor, 2..=5 = walls).
    WallMounted,
}

/// A single voxel: content id plus two auxiliary bytes.
///
/// `param1` is free for lighting or, inside schematics, placement probability.
/// `param2` carries orientation, liquid level, or color depending on [`Param2Kind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapNode {
    /// Node content.
    pub content: NodeId,
    /// First auxiliary byte.
    pub param1: u8,
    /// Second auxiliary byte.
    pub param2: u8,
}

const WALLMOUNTED_TO_ROT: [u8; 4] = [0, 2, 1, 3];
const ROT_TO_WALLMOUNTED: [u8; 4] = [2, 4, 3, 5];

impl MapNode {
    /// Air with both params cleared.
    pub const AIR: Self = Self::new(NodeId::AIR);
    /// Ignore with both params cleared.
    pub const IGNORE: Self = Self::new(NodeId::IGNORE);

    /// Creates a node with zeroed params.
    pub const fn new(content: NodeId) -> Self {
        Self {
            content,
            param1: 0,
            param2: 0,
        }
    }

    /// Creates a node with explicit params.
    pub const fn with_params(content: NodeId, param1: u8, param2: u8) -> Self {
        Self {
            content,
            param1,
            param2,
        }
    }

    /// Rotates the node's orientation by `quarter_turns` × 90° around the Y axis.
    pub fn rotate_y(&mut self, kind: Param2Kind, quarter_turns: u8) {
        let turns = quarter_turns & 3;
        if turns == 0 {
            return;
        }
        match kind {
            Param2Kind::None => {}
            Param2Kind::FaceDir => {
                let facing = self.param2 & 3;
                self.param2 = (self.param2 & !3) | ((facing + turns) & 3);
            }
            Param2Kind::WallMounted => {
                let face = self.param2 & 7;
                // Floor and ceiling mounts are symmetric around Y.
                if !(2..=5).contains(&face) {
                    return;
                }
                let old = WALLMOUNTED_TO_ROT[(face - 2) as usize];
                let new = ROT_TO_WALLMOUNTED[(old.wrapping_sub(turns) & 3) as usize];
                self.param2 = (self.param2 & !7) | new;
            }
        }
    }
}

impl Default for MapNode {
    fn default() -> Self {
        Self::AIR
    }
}

impl From<NodeId> for MapNode {
    fn from(content: NodeId) -> Self {
        Self::new(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facedir_full_turn_is_identity() {
        let mut node = MapNode::with_params(NodeId(7), 0, 0b1010_0001);
        for _ in 0..4 {
            node.rotate_y(Param2Kind::FaceDir, 1);
        }
        assert_eq!(node.param2, 0b1010_0001);
    }

    #[test]
    fn test_facedir_keeps_high_bits() {
        let mut node = MapNode::with_params(NodeId(7), 0, 0b1111_0011);
        node.rotate_y(Param2Kind::FaceDir, 1);
        assert_eq!(node.param2, 0b1111_0000);
    }

    #[test]
    fn test_wallmounted_floor_unchanged() {
        let mut node = MapNode::with_params(NodeId(3), 0, 1);
        node.rotate_y(Param2Kind::WallMounted, 1);
        assert_eq!(node.param2, 1);
    }

    #[test]
    fn test_wallmounted_cycles_through_walls() {
        let mut node = MapNode::with_params(NodeId(3), 0, 2);
        let mut seen = Vec::new();
        for _ in 0..4 {
            node.rotate_y(Param2Kind::WallMounted, 1);
            seen.push(node.param2);
        }
        assert_eq!(*seen.last().unwrap(), 2);
        seen.sort_unstable();
        assert_eq!(seen, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_none_kind_ignores_rotation() {
        let mut node = MapNode::with_params(NodeId(9), 0, 42);
        node.rotate_y(Param2Kind::None, 3);
        assert_eq!(node.param2, 42);
    }
}
