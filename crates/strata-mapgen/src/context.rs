//! Per-chunk state shared by the placement passes.

use glam::{IVec2, IVec3};
use strata_voxel::{NodeRegistry, VoxelRegion};

use crate::biome::BiomeId;
use crate::notify::GenNotify;

/// Per-column maps computed by terrain synthesis.
///
/// All maps have `size.x * size.y` entries indexed `x + z * size.x`, where the
/// second component of `min`/`size` is the Z axis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnMaps {
    /// Minimum (x, z) corner.
    pub min: IVec2,
    /// Number of columns along x and z.
    pub size: IVec2,
    /// Surface height per column.
    pub heightmap: Vec<i32>,
    /// Biome per column.
    pub biomemap: Vec<BiomeId>,
    /// Heat per column.
    pub heatmap: Vec<f64>,
    /// Humidity per column.
    pub humiditymap: Vec<f64>,
}

impl ColumnMaps {
    /// Allocates maps covering the horizontal extent of `node_min..=node_max`.
    pub fn new(node_min: IVec3, node_max: IVec3) -> Self {
        let min = IVec2::new(node_min.x, node_min.z);
        let size = IVec2::new(node_max.x - node_min.x + 1, node_max.z - node_min.z + 1);
        let len = size.x.max(0) as usize * size.y.max(0) as usize;
        Self {
            min,
            size,
            heightmap: vec![0; len],
            biomemap: vec![BiomeId::NONE; len],
            heatmap: vec![0.0; len],
            humiditymap: vec![0.0; len],
        }
    }

    /// Index of column `(x, z)`, or `None` outside the maps.
    #[inline]
    pub fn index(&self, x: i32, z: i32) -> Option<usize> {
        let rx = x - self.min.x;
        let rz = z - self.min.y;
        (rx >= 0 && rz >= 0 && rx < self.size.x && rz < self.size.y)
            .then(|| (rx + rz * self.size.x) as usize)
    }

    /// Surface height of column `(x, z)`.
    pub fn height_at(&self, x: i32, z: i32) -> Option<i32> {
        self.index(x, z).map(|i| self.heightmap[i])
    }

    /// Biome of column `(x, z)`.
    pub fn biome_at(&self, x: i32, z: i32) -> Option<BiomeId> {
        self.index(x, z).map(|i| self.biomemap[i])
    }
}

/// Mutable target of the placement passes for one chunk.
pub struct GenContext<'a> {
    pub region: &'a mut VoxelRegion,
    pub nodes: &'a NodeRegistry,
    /// Column maps, when terrain was synthesized for this chunk.
    pub maps: Option<&'a ColumnMaps>,
    pub notify: &'a mut GenNotify,
}

impl GenContext<'_> {
    /// Surface height of column `(x, z)`: the heightmap when the chunk has one, otherwise
    /// the first walkable node scanning down from `ymax` to `ymin`.
    pub fn ground_level(&self, x: i32, z: i32, ymin: i32, ymax: i32) -> Option<i32> {
        if let Some(h) = self.maps.and_then(|m| m.height_at(x, z)) {
            return Some(h);
        }
        (ymin..=ymax)
            .rev()
            .find(|&y| self.nodes.is_walkable(self.region.content(IVec3::new(x, y, z))))
    }
}
