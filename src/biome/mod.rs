//! Biome modification pipeline
//! Contains selectors, per-biome generation settings, and the phased engine.

pub mod modification;
pub mod selection;
pub mod settings;

// Re-export commonly used types
pub use modification::{BiomeModifications, ModificationBuilder, ModificationError, ModificationPhase, ModificationSet};
pub use selection::{BiomeSelection, Selector};
pub use settings::{BiomeContext, GenerationSettings, GenerationStep};
