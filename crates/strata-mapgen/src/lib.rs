//! Procedural chunk generation: noise terrain, biomes, caves, ores, decorations, and schematics.

pub mod biome;
pub mod cave;
pub mod content;
pub mod context;
pub mod decoration;
pub mod error;
pub mod generator;
pub mod noise;
pub mod notify;
pub mod ore;
pub mod params;
pub mod resolve;
pub mod schematic;
pub mod seed;
pub mod terrain;
pub mod vegetation;

pub use biome::{Biome, BiomeClassifier, BiomeDef, BiomeId, BiomeRegistry};
pub use cave::CaveCarver;
pub use content::{ContentError, ContentPack, MapgenContent, ResolvedContent};
pub use context::{ColumnMaps, GenContext};
pub use decoration::{
    DecorationDef, DecorationHandle, DecorationKind, DecorationPlacer, DecorationRegistry,
    SchematicDecoration, SchematicSource, SimpleDecoration,
};
pub use error::{RegistrationError, ResolveError};
pub use generator::{
    ChunkGenerator, GeneratedChunk, GenerationReport, GeneratorError, create_schematic,
    place_schematic,
};
pub use self::noise::{NoiseField, NoiseParams, NoiseSampler};
pub use notify::{GenNotify, GenNotifyFilter, GenNotifyKind};
pub use ore::{OreDef, OreHandle, OreKind, OrePlacer, OreRegistry};
pub use params::{CaveConfig, MapgenFlags, MapgenParams, ParamsError};
pub use resolve::ResolveReport;
pub use schematic::{
    PROB_ALWAYS, PROB_NEVER, Rotation, RotationPolicy, Schematic, SchematicDef, SchematicError,
    SchematicHandle, SchematicRegistry,
};
pub use seed::{block_seed, hash_region};
pub use terrain::{TerrainNodes, TerrainSynthesizer};
pub use vegetation::SimpleDecorator;
