//! Template-based structures: templates, pieces, and the structure types that
//! plan them.

pub mod house;
pub mod markers;
pub mod piece;
pub mod structure;
pub mod template;

// Re-export commonly used types
pub use house::{HouseStructure, house_layout, house_template};
pub use markers::{MarkerError, MarkerHandlers, container_loot};
pub use piece::{GenerateOutcome, PieceError, PieceLayout, PieceRecord, PieceState, TemplatePiece};
pub use structure::{PlacementReport, StructureContext, StructureRegistries, StructureStart, StructureType};
pub use template::{CellProcessor, CellSpec, IgnoreCells, PlacementData, Template, TemplateError, TemplateFile, TemplateManager};
