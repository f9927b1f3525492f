//! Decorations: surface features scattered over generated terrain.
//!
//! A decoration is either a simple column of nodes (grass, cacti, papyrus) or a
//! schematic stamp (trees, ruins). Candidate columns are drawn per square part
//! of the chunk, with a count set by a fixed fill ratio or by 2D noise.

mod def;
mod placer;
mod registry;

pub use def::{
    Decoration, DecorationDef, DecorationKind, DecorationPayload, SchematicDecoration,
    SchematicSource, SimpleDecoration,
};
pub use placer::DecorationPlacer;
pub use registry::{DecorationHandle, DecorationRegistry};
