// Core module with identifiers, registries, cells, and transforms
pub mod core;

// World module with the target space and structure placement
pub mod world;

// Biome selection and phased modifications
pub mod biome;

// Entry collection and codec export
pub mod datagen;

// The example mod built on top of the above
pub mod content;

// Other modules
pub mod constants;
pub mod error;
pub mod save;
pub mod utils;

// Re-exports
pub use constants::*;
pub use crate::core::{BlockEntity, CellState, Identifier, Mirror, Registry, Rotation, SetFlags};
pub use error::{Error, ErrorClass};
pub use save::{SavedPieces, load_pieces, save_pieces};
