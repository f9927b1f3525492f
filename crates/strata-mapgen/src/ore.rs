//! Ore placement: scatter, sheet, blob, and vein deposits.
//!
//! Ores replace `wherein` nodes inside the generated chunk. Each ore draws from
//! its own random stream derived from the block seed, so adding or removing one
//! ore never shifts where the others land.

mod def;
mod placer;
mod registry;

pub use def::{Ore, OreDef, OreKind};
pub use placer::OrePlacer;
pub use registry::{OreHandle, OreRegistry};
