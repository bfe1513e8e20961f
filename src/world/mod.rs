//! World-side modules
//! Contains the target space, the demo terrain, and structure placement.

pub mod space;
pub mod structures;
pub mod terrain;

// Re-export commonly used types
pub use space::{GridSpace, Heightmap, SpaceError, TargetSpace};
pub use terrain::{SurfaceGenerator, TerrainPalette};
