//! Template-backed structure piece and its generation state machine.
//!
//! A piece is planned with an anchor and a rotation, materialized once into a
//! target space, and can be persisted at any time as a [`PieceRecord`] that
//! reproduces the same output after reload.

use glam::{IVec2, IVec3};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::core::{CellState, Identifier, Mirror, Rotation, SetFlags};
use crate::error::ErrorClass;
use crate::world::space::{Heightmap, SpaceError, TargetSpace};
use crate::world::structures::markers::MarkerHandlers;
use crate::world::structures::template::{IgnoreCells, PlacementData, Template, TemplateError, TemplateManager};

#[derive(Debug, Error)]
pub enum PieceError {
    #[error("no solid ground for {template} in column {column}")]
    AnchorResolutionFailed { template: Identifier, column: IVec2 },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("failed to emit {template}: {source}")]
    Emit {
        template: Identifier,
        #[source]
        source: SpaceError,
    },
    #[error("malformed piece record: {0}")]
    Record(String),
    #[error("unknown piece type {0}")]
    UnknownPieceType(Identifier),
    #[error("unknown structure {0}")]
    UnknownStructure(Identifier),
}

impl PieceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PieceError::AnchorResolutionFailed { .. } | PieceError::Emit { .. } => ErrorClass::ResourceUnavailable,
            PieceError::Template(e) => e.class(),
            PieceError::Record(_) | PieceError::UnknownPieceType(_) | PieceError::UnknownStructure(_) => {
                ErrorClass::DataDefect
            }
        }
    }
}

/// Per-template constants that decide where a piece lands and how it is
/// finished.
#[derive(Clone, Debug)]
pub struct PieceLayout {
    /// Rotation and mirror pivot, fixed for every placement of the template.
    pub pivot: IVec3,
    /// Relative position whose transformed column is sampled for the surface.
    pub front_column: IVec3,
    /// Relative position of the entrance checked by the cap post-pass.
    pub entrance: IVec3,
    /// Anchor height assumed while planning.
    pub planning_height: i32,
    /// How far below the resolved surface the anchor is sunk.
    pub sink_depth: i32,
    pub heightmap: Heightmap,
    pub cap_cell: CellState,
    pub traversal_aids: Vec<CellState>,
    /// Cells left out of emission, such as marker blocks.
    pub ignored_cells: Vec<CellState>,
}

impl PieceLayout {
    pub fn placement(&self, rotation: Rotation, mirror: Mirror) -> PlacementData {
        PlacementData::new()
            .with_rotation(rotation)
            .with_mirror(mirror)
            .with_pivot(self.pivot)
            .with_processor(Arc::new(IgnoreCells::new(self.ignored_cells.clone())))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PieceState {
    Planned,
    Materializing,
    Materialized,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GenerateOutcome {
    Materialized { cells_written: usize, markers_handled: usize },
    AlreadyMaterialized,
}

/// Persisted form of a piece.
///
/// `Mirror` is written explicitly; records without it load with
/// [`Mirror::None`].
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PieceRecord {
    #[serde(rename = "id")]
    pub piece_type: Identifier,
    #[serde(rename = "Identifier")]
    pub template: Identifier,
    #[serde(rename = "Rot")]
    pub rotation: Rotation,
    #[serde(rename = "Mirror", default)]
    pub mirror: Mirror,
    #[serde(rename = "Pos")]
    pub anchor: IVec3,
    #[serde(rename = "YOffset", default)]
    pub y_offset: i32,
}

impl PieceRecord {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.piece_type,
            "Identifier": self.template,
            "Rot": self.rotation,
            "Mirror": self.mirror,
            "Pos": [self.anchor.x, self.anchor.y, self.anchor.z],
            "YOffset": self.y_offset,
        })
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, PieceError> {
        Self::deserialize(value).map_err(|e| PieceError::Record(e.to_string()))
    }
}

/// Moves the anchor for the lifetime of the guard.
struct ShiftedAnchor<'a> {
    anchor: &'a mut IVec3,
    saved: IVec3,
}

impl<'a> ShiftedAnchor<'a> {
    fn new(anchor: &'a mut IVec3, delta: IVec3) -> Self {
        let saved = *anchor;
        *anchor += delta;
        Self { anchor, saved }
    }

    fn position(&self) -> IVec3 {
        *self.anchor
    }
}

impl Drop for ShiftedAnchor<'_> {
    fn drop(&mut self) {
        *self.anchor = self.saved;
    }
}

pub struct TemplatePiece {
    piece_type: Identifier,
    template: Arc<Template>,
    layout: Arc<PieceLayout>,
    anchor: IVec3,
    placement: PlacementData,
    y_offset: i32,
    state: PieceState,
}

impl TemplatePiece {
    pub fn new(
        piece_type: Identifier,
        templates: &TemplateManager,
        template_id: &Identifier,
        layout: Arc<PieceLayout>,
        pos: IVec3,
        rotation: Rotation,
        y_offset: i32,
    ) -> Result<Self, PieceError> {
        let template = templates.load(template_id)?;
        let placement = layout.placement(rotation, Mirror::None);
        Ok(Self {
            piece_type,
            template,
            layout,
            anchor: pos - IVec3::new(0, y_offset, 0),
            placement,
            y_offset,
            state: PieceState::Planned,
        })
    }

    /// Rebuild a planned piece from its record. Placement data is recomputed
    /// from the persisted rotation and mirror.
    pub fn from_record(
        templates: &TemplateManager,
        layout: Arc<PieceLayout>,
        record: &PieceRecord,
    ) -> Result<Self, PieceError> {
        let template = templates.load(&record.template)?;
        let placement = layout.placement(record.rotation, record.mirror);
        Ok(Self {
            piece_type: record.piece_type.clone(),
            template,
            layout,
            anchor: record.anchor,
            placement,
            y_offset: record.y_offset,
            state: PieceState::Planned,
        })
    }

    pub fn to_record(&self) -> PieceRecord {
        PieceRecord {
            piece_type: self.piece_type.clone(),
            template: self.template.id().clone(),
            rotation: self.placement.rotation,
            mirror: self.placement.mirror,
            anchor: self.anchor,
            y_offset: self.y_offset,
        }
    }

    pub fn piece_type(&self) -> &Identifier {
        &self.piece_type
    }

    pub fn template_id(&self) -> &Identifier {
        self.template.id()
    }

    pub fn anchor(&self) -> IVec3 {
        self.anchor
    }

    pub fn rotation(&self) -> Rotation {
        self.placement.rotation
    }

    pub fn placement(&self) -> &PlacementData {
        &self.placement
    }

    pub fn state(&self) -> PieceState {
        self.state
    }

    /// Materialize the piece. A second call after success writes nothing.
    pub fn generate<S: TargetSpace>(
        &mut self,
        space: &mut S,
        markers: &MarkerHandlers<S>,
        rng: &mut dyn RngCore,
    ) -> Result<GenerateOutcome, PieceError> {
        if self.state == PieceState::Materialized {
            tracing::debug!("Piece {} already materialized, skipping", self.template.id());
            return Ok(GenerateOutcome::AlreadyMaterialized);
        }

        let reference = self.anchor + self.placement.transform(self.layout.front_column);
        let column = IVec2::new(reference.x, reference.z);
        let surface = space
            .top_solid_y(column, self.layout.heightmap)
            .ok_or_else(|| PieceError::AnchorResolutionFailed {
                template: self.template.id().clone(),
                column,
            })?;
        let shift = surface - self.layout.planning_height - self.layout.sink_depth;

        self.state = PieceState::Materializing;
        let result = {
            let Self {
                template,
                layout,
                anchor,
                placement,
                ..
            } = self;
            let shifted = ShiftedAnchor::new(anchor, IVec3::new(0, shift, 0));
            tracing::debug!(
                "Materializing {} at {} (surface {}, rotation {})",
                template.id(),
                shifted.position(),
                surface,
                placement.rotation
            );
            materialize(template, layout, placement, shifted.position(), space, markers, rng)
        };

        self.state = match result {
            Ok(_) => PieceState::Materialized,
            Err(_) => PieceState::Planned,
        };
        result
    }
}

fn materialize<S: TargetSpace>(
    template: &Template,
    layout: &PieceLayout,
    placement: &PlacementData,
    origin: IVec3,
    space: &mut S,
    markers: &MarkerHandlers<S>,
    rng: &mut dyn RngCore,
) -> Result<GenerateOutcome, PieceError> {
    let mut cells_written = 0;
    for (pos, cell) in template.cells(placement, origin) {
        let Some(cell) = placement.process(pos, cell) else {
            continue;
        };
        space
            .set_cell(pos, cell.state, SetFlags::DEFAULT)
            .map_err(|source| PieceError::Emit {
                template: template.id().clone(),
                source,
            })?;
        cells_written += 1;
    }

    let mut markers_handled = 0;
    for (pos, tag) in template.marker_cells(placement, origin) {
        match markers.get(tag) {
            Some(handler) => {
                if let Err(e) = handler(pos, space, rng) {
                    tracing::warn!("Marker {:?} at {} in {} failed: {}", tag, pos, template.id(), e);
                }
                markers_handled += 1;
            }
            None => tracing::debug!("No handler for marker {:?} in {}", tag, template.id()),
        }
    }

    cap_entrance(template, layout, placement, origin, space);

    Ok(GenerateOutcome::Materialized {
        cells_written,
        markers_handled,
    })
}

fn cap_entrance<S: TargetSpace>(
    template: &Template,
    layout: &PieceLayout,
    placement: &PlacementData,
    origin: IVec3,
    space: &mut S,
) {
    let entrance = origin + placement.transform(layout.entrance);
    let below = space.get_cell(entrance - IVec3::Y);
    if below.is_empty() || layout.traversal_aids.contains(&below) {
        return;
    }
    if let Err(e) = space.set_cell(entrance, layout.cap_cell.clone(), SetFlags::DEFAULT) {
        tracing::warn!("Could not cap entrance of {} at {}: {}", template.id(), entrance, e);
    }
}
