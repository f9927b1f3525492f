//! Default trees and grass, placed before registered decorations.

use glam::{IVec2, IVec3};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use strata_voxel::{MapNode, NodeId, NodeRegistry, VoxelArea, VoxelRegion};

use crate::context::GenContext;
use crate::noise::NoiseSampler;
use crate::notify::GenNotifyKind;
use crate::params::MapgenParams;
use crate::seed::{stream_rng, stream_salt};

/// Side length of the square sectors trees are counted in.
const SECTOR: i32 = 8;

/// Tree noise below this grows nothing.
const TREE_NOISE_MIN: f64 = -0.39;

/// Apple noise above this makes a tree bear apples.
const APPLE_NOISE_MIN: f64 = 0.2;

/// Trees per column for a tree noise value.
pub fn tree_amount(noise: f64) -> f64 {
    if noise < TREE_NOISE_MIN {
        0.0
    } else {
        0.04 * (noise - TREE_NOISE_MIN) / (1.0 - TREE_NOISE_MIN)
    }
}

/// Nodes of the default tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeNodes {
    pub trunk: NodeId,
    pub leaves: NodeId,
    pub apple: Option<NodeId>,
}

/// Counts from one vegetation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VegetationStats {
    pub trees: usize,
    pub grass: usize,
}

/// Grows default trees and grass tufts on grassy ground.
#[derive(Clone, Debug)]
pub struct SimpleDecorator {
    trees: NoiseSampler,
    apple_trees: NoiseSampler,
    water_level: i32,
    tree_nodes: Option<TreeNodes>,
    grass: Option<NodeId>,
    tree_salt: u64,
    grass_salt: u64,
}

impl SimpleDecorator {
    /// Looks up `mapgen_tree`, `mapgen_leaves`, `mapgen_apple`, and `mapgen_grass`.
    ///
    /// Trees need a trunk and leaves; without them (or without grass) that feature is off.
    pub fn new(params: &MapgenParams, nodes: &NodeRegistry) -> Self {
        let tree_nodes = match (nodes.lookup_by_name("mapgen_tree"), nodes.lookup_by_name("mapgen_leaves")) {
            (Some(trunk), Some(leaves)) => Some(TreeNodes {
                trunk,
                leaves,
                apple: nodes.lookup_by_name("mapgen_apple"),
            }),
            _ => {
                tracing::debug!("mapgen_tree or mapgen_leaves missing; default trees disabled");
                None
            }
        };
        Self {
            trees: NoiseSampler::new(params.np_trees, params.seed),
            apple_trees: NoiseSampler::new(params.np_apple_trees, params.seed),
            water_level: params.water_level,
            tree_nodes,
            grass: nodes.lookup_by_name("mapgen_grass"),
            tree_salt: stream_salt("vegetation", "trees"),
            grass_salt: stream_salt("vegetation", "grass"),
        }
    }

    /// Returns `true` if neither trees nor grass can be placed.
    pub fn is_disabled(&self) -> bool {
        self.tree_nodes.is_none() && self.grass.is_none()
    }

    /// Grows trees and grass in `node_min..=node_max` on columns whose surface is one of
    /// `grass_ground` and above the water level.
    pub fn place(
        &self,
        ctx: &mut GenContext<'_>,
        block_seed: u64,
        node_min: IVec3,
        node_max: IVec3,
        grass_ground: &[NodeId],
    ) -> VegetationStats {
        let mut stats = VegetationStats::default();
        let mut tree_rng = stream_rng(block_seed, self.tree_salt);
        let mut grass_rng = stream_rng(block_seed, self.grass_salt);

        for sz in (node_min.z..=node_max.z).step_by(SECTOR as usize) {
            for sx in (node_min.x..=node_max.x).step_by(SECTOR as usize) {
                let smin = IVec2::new(sx, sz);
                let smax = IVec2::new((sx + SECTOR - 1).min(node_max.x), (sz + SECTOR - 1).min(node_max.z));
                let area = f64::from((smax.x - smin.x + 1) * (smax.y - smin.y + 1));
                let centre = (smin + smax) / 2;
                let amount = tree_amount(self.trees.sample_2d(f64::from(centre.x), f64::from(centre.y)));

                if let Some(tree) = self.tree_nodes {
                    let count = (area * amount).floor() as usize;
                    for _ in 0..count {
                        let Some(ground) =
                            self.pick_ground(ctx, &mut tree_rng, smin, smax, node_min.y, node_max.y, grass_ground)
                        else {
                            continue;
                        };
                        let apples = self.apple_trees.sample_2d(f64::from(ground.x), f64::from(ground.z))
                            > APPLE_NOISE_MIN;
                        let base = ground + IVec3::Y;
                        if grow_tree(ctx.region, base, tree, apples, &mut tree_rng) {
                            stats.trees += 1;
                            ctx.notify.record(GenNotifyKind::Tree, None, base);
                        }
                    }
                }

                if let Some(grass) = self.grass {
                    let count = (area * amount * 4.0).floor() as usize;
                    for _ in 0..count {
                        let Some(ground) =
                            self.pick_ground(ctx, &mut grass_rng, smin, smax, node_min.y, node_max.y, grass_ground)
                        else {
                            continue;
                        };
                        let above = ground + IVec3::Y;
                        if ctx.region.content(above) == NodeId::AIR {
                            ctx.region.set(above, MapNode::new(grass));
                            stats.grass += 1;
                        }
                    }
                }
            }
        }
        stats
    }

    /// Draws a random column of the sector and returns its surface if vegetation can grow there.
    #[allow(clippy::too_many_arguments)]
    fn pick_ground(
        &self,
        ctx: &GenContext<'_>,
        rng: &mut ChaCha8Rng,
        smin: IVec2,
        smax: IVec2,
        ymin: i32,
        ymax: i32,
        grass_ground: &[NodeId],
    ) -> Option<IVec3> {
        let x = rng.random_range(smin.x..=smax.x);
        let z = rng.random_range(smin.y..=smax.y);
        let y = ctx.ground_level(x, z, ymin, ymax)?;
        if y <= self.water_level || y < ymin || y >= ymax {
            return None;
        }
        let ground = IVec3::new(x, y, z);
        grass_ground.contains(&ctx.region.content(ground)).then_some(ground)
    }
}

/// Grows a default tree with its trunk starting at `base`.
///
/// Returns `false` without writing if the trunk is blocked.
fn grow_tree(region: &mut VoxelRegion, base: IVec3, nodes: TreeNodes, apples: bool, rng: &mut ChaCha8Rng) -> bool {
    let trunk_height = rng.random_range(4..=5);
    if (0..trunk_height).any(|dy| !region.content(base + IVec3::new(0, dy, 0)).is_air_or_ignore()) {
        return false;
    }
    for dy in 0..trunk_height {
        region.set(base + IVec3::new(0, dy, 0), MapNode::new(nodes.trunk));
    }

    // Leaves fill a 5x4x5 box around the trunk top: the inner 3x3x3 core always, plus
    // random 2x2x2 clumps.
    let crown = base + IVec3::new(0, trunk_height - 1, 0);
    let bounds = VoxelArea::new(IVec3::new(-2, -1, -2), IVec3::new(2, 2, 2));
    let mut mask = vec![false; bounds.volume()];
    for p in VoxelArea::new(IVec3::splat(-1), IVec3::ONE).iter() {
        mask[bounds.index(p)] = true;
    }
    for _ in 0..7 {
        let corner = IVec3::new(
            rng.random_range(-2..=1),
            rng.random_range(-1..=1),
            rng.random_range(-2..=1),
        );
        for p in VoxelArea::new(corner, corner + IVec3::ONE).iter() {
            mask[bounds.index(p)] = true;
        }
    }

    for (i, &leaf) in mask.iter().enumerate() {
        if !leaf {
            continue;
        }
        let p = crown + bounds.position(i);
        if !region.content(p).is_air_or_ignore() {
            continue;
        }
        let node = match nodes.apple {
            Some(apple) if apples && rng.random_range(0..4) == 0 => apple,
            _ => nodes.leaves,
        };
        region.set(p, MapNode::new(node));
    }
    true
}
