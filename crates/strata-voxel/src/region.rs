//! Dense voxel buffer addressed by absolute node coordinates.
//!
//! A [`VoxelRegion`] is what the generator writes into. It is allocated and owned
//! by the caller (the storage/paging layer); generation only mutates it in place.

use glam::IVec3;

use crate::area::VoxelArea;
use crate::node::{MapNode, NodeId};

/// A rectangular buffer of [`MapNode`]s covering a [`VoxelArea`].
///
/// Reads outside the area return [`MapNode::IGNORE`]; writes outside it are dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelRegion {
    area: VoxelArea,
    data: Vec<MapNode>,
}

impl VoxelRegion {
    /// Creates a region filled with air.
    pub fn new(area: VoxelArea) -> Self {
        Self::filled(area, MapNode::AIR)
    }

    /// Creates a region filled with `node`.
    pub fn filled(area: VoxelArea, node: MapNode) -> Self {
        Self {
            area,
            data: vec![node; area.volume()],
        }
    }

    /// The area covered by this region.
    #[inline]
    pub fn area(&self) -> &VoxelArea {
        &self.area
    }

    /// Returns `true` if `p` is inside the region.
    #[inline]
    pub fn contains(&self, p: IVec3) -> bool {
        self.area.contains(p)
    }

    /// Returns the node at `p`, or [`MapNode::IGNORE`] outside the region.
    #[inline]
    pub fn get(&self, p: IVec3) -> MapNode {
        match self.area.try_index(p) {
            Some(i) => self.data[i],
            None => MapNode::IGNORE,
        }
    }

    /// Returns the content at `p`, or [`NodeId::IGNORE`] outside the region.
    #[inline]
    pub fn content(&self, p: IVec3) -> NodeId {
        self.get(p).content
    }

    /// Writes `node` at `p`. Returns `false` (and writes nothing) outside the region.
    #[inline]
    pub fn set(&mut self, p: IVec3, node: MapNode) -> bool {
        match self.area.try_index(p) {
            Some(i) => {
                self.data[i] = node;
                true
            }
            None => {
                tracing::trace!("VoxelRegion::set out of bounds: {p}");
                false
            }
        }
    }

    /// Writes a node with zeroed params at `p`.
    #[inline]
    pub fn set_content(&mut self, p: IVec3, content: NodeId) -> bool {
        self.set(p, MapNode::new(content))
    }

    /// Returns the node at a linear index.
    #[inline]
    pub fn get_index(&self, index: usize) -> MapNode {
        self.data[index]
    }

    /// Writes the node at a linear index.
    #[inline]
    pub fn set_index(&mut self, index: usize, node: MapNode) {
        self.data[index] = node;
    }

    /// All nodes in index order.
    pub fn data(&self) -> &[MapNode] {
        &self.data
    }

    /// Mutable access to all nodes in index order.
    pub fn data_mut(&mut self) -> &mut [MapNode] {
        &mut self.data
    }

    /// Overwrites every node in the region.
    pub fn fill(&mut self, node: MapNode) {
        self.data.fill(node);
    }

    /// Overwrites every node in the overlap of `area` and this region.
    pub fn fill_area(&mut self, area: &VoxelArea, node: MapNode) {
        let Some(overlap) = self.area.intersection(area) else {
            return;
        };
        for p in overlap.iter() {
            let i = self.area.index(p);
            self.data[i] = node;
        }
    }

    /// Counts nodes with the given content.
    pub fn count(&self, content: NodeId) -> usize {
        self.data.iter().filter(|n| n.content == content).count()
    }
}
