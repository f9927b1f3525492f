//! 3D noise caves carved below the terrain surface.
//!
//! A cell becomes air where the normalized cave noise exceeds a threshold that
//! rises towards 1 with depth, so tunnels thin out near `max_depth`. Cells close
//! to the surface and the floors of shallow seas are left intact.

use glam::IVec3;
use strata_voxel::{MapNode, NodeId, VoxelArea, VoxelRegion};

use crate::context::ColumnMaps;
use crate::noise::{NoiseField, NoiseSampler};
use crate::params::{CaveConfig, MapgenParams};

/// Carves caves into terrain written by the synthesizer.
#[derive(Clone, Debug)]
pub struct CaveCarver {
    noise: NoiseSampler,
    config: CaveConfig,
    water_level: i32,
    /// Normalizes noise values into `[-1, 1]`.
    offset: f64,
    amplitude: f64,
}

impl CaveCarver {
    pub fn new(params: &MapgenParams) -> Self {
        let np = params.np_cave;
        Self {
            noise: NoiseSampler::new(np, params.seed),
            config: params.cave,
            water_level: params.water_level,
            offset: np.offset,
            amplitude: np.max_amplitude(),
        }
    }

    /// Returns the cave configuration.
    pub fn config(&self) -> &CaveConfig {
        &self.config
    }

    /// Threshold at `depth` nodes below the surface.
    fn threshold_at(&self, depth: i32) -> f64 {
        let span = f64::from((self.config.max_depth - self.config.min_depth).max(1));
        let fade = (f64::from(depth - self.config.min_depth) / span).clamp(0.0, 1.0);
        let t = self.config.threshold;
        t + (1.0 - t) * fade * fade
    }

    /// Whether depth rules allow carving at height `y` of a column with surface `surface_y`.
    pub fn in_carvable_band(&self, y: i32, surface_y: i32) -> bool {
        let depth = surface_y - y;
        if depth < self.config.min_depth || depth > self.config.max_depth {
            return false;
        }
        if surface_y <= self.water_level
            && (depth < self.config.ocean_floor_buffer
                || y > self.water_level - self.config.ocean_floor_buffer)
        {
            return false;
        }
        true
    }

    /// Decides a single cell from its raw cave noise.
    pub fn is_cave(&self, noise: f64, y: i32, surface_y: i32) -> bool {
        if !self.in_carvable_band(y, surface_y) || self.amplitude == 0.0 {
            return false;
        }
        let normalized = (noise - self.offset) / self.amplitude;
        normalized > self.threshold_at(surface_y - y)
    }

    /// Carves `node_min..=node_max` (clamped to the region), replacing only `carvable` nodes.
    ///
    /// Columns outside `maps` are skipped. Returns the number of cells turned into air.
    pub fn carve(
        &self,
        region: &mut VoxelRegion,
        node_min: IVec3,
        node_max: IVec3,
        maps: &ColumnMaps,
        carvable: &[NodeId],
    ) -> usize {
        let Some(area) = region.area().intersection(&VoxelArea::new(node_min, node_max)) else {
            return 0;
        };
        // Nothing below max_depth or above the highest surface can be carved.
        let top = maps.heightmap.iter().copied().max().unwrap_or(area.min_edge.y) - self.config.min_depth;
        let bottom = maps.heightmap.iter().copied().min().unwrap_or(area.max_edge.y) - self.config.max_depth;
        let lo = area.min_edge.y.max(bottom);
        let hi = area.max_edge.y.min(top);
        if lo > hi {
            return 0;
        }
        let origin = IVec3::new(area.min_edge.x, lo, area.min_edge.z);
        let size = IVec3::new(area.extent().x, hi - lo + 1, area.extent().z);
        let mut field = NoiseField::from_sampler(self.noise.clone());
        let values = field.evaluate_3d(origin, size, 1.0);

        let mut carved = 0;
        let mut i = 0;
        for z in origin.z..origin.z + size.z {
            for y in lo..=hi {
                for x in origin.x..origin.x + size.x {
                    let noise = values[i];
                    i += 1;
                    let Some(surface_y) = maps.height_at(x, z) else {
                        continue;
                    };
                    let p = IVec3::new(x, y, z);
                    if carvable.contains(&region.content(p)) && self.is_cave(noise, y, surface_y) {
                        region.set(p, MapNode::AIR);
                        carved += 1;
                    }
                }
            }
        }
        carved
    }
}
