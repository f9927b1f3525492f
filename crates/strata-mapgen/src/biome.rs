//! Biome system: definitions, registry, and heat/humidity/height classification.
//!
//! Biomes pick the materials a terrain column is built from. Each column is
//! classified once per chunk from the heat and humidity noise fields and its
//! surface height; the result is cached in the chunk's biome map.

mod classifier;
mod def;
mod registry;

pub use classifier::BiomeClassifier;
pub use def::{Biome, BiomeDef};
pub use registry::{BiomeId, BiomeRegistry};
