//! Voxel-buffer contract for the generator: node ids, node definitions, and dense regions.

pub mod area;
pub mod node;
pub mod region;
pub mod registry;

pub use area::{BLOCK_SIZE, BLOCK_VOLUME, VoxelArea, node_to_block};
pub use node::{MapNode, NodeId, Param2Kind};
pub use region::VoxelRegion;
pub use registry::{NodeDef, NodeRegistry, RegistryError};
