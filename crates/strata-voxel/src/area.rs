//! Axis-aligned voxel area with inclusive integer edges and x-fastest linear indexing.

use glam::IVec3;
use serde::{Deserialize, Serialize};

/// Side length of a map block in nodes.
pub const BLOCK_SIZE: i32 = 16;

/// Number of nodes in one map block (16³).
pub const BLOCK_VOLUME: usize = (BLOCK_SIZE * BLOCK_SIZE * BLOCK_SIZE) as usize;

/// An inclusive box of node positions.
///
/// Linear indices run x fastest, then y, then z, matching every per-voxel
/// array in the generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelArea {
    /// Minimum corner (inclusive).
    pub min_edge: IVec3,
    /// Maximum corner (inclusive).
    pub max_edge: IVec3,
}

impl VoxelArea {
    /// Creates an area from two inclusive corners.
    ///
    /// `max_edge` must be component-wise `>= min_edge`; a reversed box is a caller bug.
    pub fn new(min_edge: IVec3, max_edge: IVec3) -> Self {
        debug_assert!(
            max_edge.cmpge(min_edge).all(),
            "VoxelArea max edge {max_edge} is below min edge {min_edge}"
        );
        Self { min_edge, max_edge }
    }

    /// Creates an area from two arbitrary corners, sorting them component-wise.
    pub fn from_corners(a: IVec3, b: IVec3) -> Self {
        Self {
            min_edge: a.min(b),
            max_edge: a.max(b),
        }
    }

    /// Size of the area along each axis.
    #[inline]
    pub fn extent(&self) -> IVec3 {
        self.max_edge - self.min_edge + IVec3::ONE
    }

    /// Total number of nodes in the area.
    #[inline]
    pub fn volume(&self) -> usize {
        let e = self.extent();
        e.x as usize * e.y as usize * e.z as usize
    }

    /// Index distance between two vertically adjacent nodes.
    #[inline]
    pub fn ystride(&self) -> usize {
        self.extent().x as usize
    }

    /// Index distance between two nodes adjacent along Z.
    #[inline]
    pub fn zstride(&self) -> usize {
        let e = self.extent();
        e.x as usize * e.y as usize
    }

    /// Returns `true` if `p` lies inside the area.
    #[inline]
    pub fn contains(&self, p: IVec3) -> bool {
        p.cmpge(self.min_edge).all() && p.cmple(self.max_edge).all()
    }

    /// Returns `true` if `other` lies entirely inside this area.
    pub fn contains_area(&self, other: &VoxelArea) -> bool {
        self.contains(other.min_edge) && self.contains(other.max_edge)
    }

    /// Linear index of `p`. `p` must be inside the area.
    #[inline]
    pub fn index(&self, p: IVec3) -> usize {
        debug_assert!(self.contains(p), "{p} outside {self:?}");
        let rel = p - self.min_edge;
        rel.x as usize + rel.y as usize * self.ystride() + rel.z as usize * self.zstride()
    }

    /// Linear index of `p`, or `None` when it lies outside the area.
    #[inline]
    pub fn try_index(&self, p: IVec3) -> Option<usize> {
        self.contains(p).then(|| self.index(p))
    }

    /// Inverse of [`index`](Self::index).
    pub fn position(&self, index: usize) -> IVec3 {
        let ystride = self.ystride();
        let zstride = self.zstride();
        let z = index / zstride;
        let rem = index % zstride;
        let y = rem / ystride;
        let x = rem % ystride;
        self.min_edge + IVec3::new(x as i32, y as i32, z as i32)
    }

    /// Overlap of two areas, if any.
    pub fn intersection(&self, other: &VoxelArea) -> Option<VoxelArea> {
        let min = self.min_edge.max(other.min_edge);
        let max = self.max_edge.min(other.max_edge);
        max.cmpge(min).all().then_some(VoxelArea {
            min_edge: min,
            max_edge: max,
        })
    }

    /// Iterates every position in index order.
    pub fn iter(&self) -> impl Iterator<Item = IVec3> + '_ {
        let (min, max) = (self.min_edge, self.max_edge);
        (min.z..=max.z).flat_map(move |z| {
            (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| IVec3::new(x, y, z)))
        })
    }
}

/// Block position containing node position `p` (floor division by [`BLOCK_SIZE`]).
pub fn node_to_block(p: IVec3) -> IVec3 {
    IVec3::new(
        p.x.div_euclid(BLOCK_SIZE),
        p.y.div_euclid(BLOCK_SIZE),
        p.z.div_euclid(BLOCK_SIZE),
    )
}
