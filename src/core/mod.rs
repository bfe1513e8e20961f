//! Core data types shared by every pipeline
//! Contains identifiers, registries, cell states, and the transform algebra.

pub mod cell;
pub mod identifier;
pub mod registry;
pub mod transform;

// Re-export commonly used types
pub use cell::{BlockEntity, CellState, LootTableRef, SetFlags};
pub use identifier::{Identifier, IdentifierError};
pub use registry::{Registry, RegistryError};
pub use transform::{InvalidRotation, Mirror, Rotation};
