//! Immutable structure templates and the placement data used to read them.

use glam::IVec3;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::core::transform::{self, Mirror, Rotation};
use crate::core::{CellState, Identifier};
use crate::error::ErrorClass;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template {0} not found")]
    NotFound(Identifier),
    #[error("template {id} is corrupt: {reason}")]
    Corrupt { id: Identifier, reason: String },
    #[error("template {id} could not be read: {source}")]
    Unreadable {
        id: Identifier,
        #[source]
        source: io::Error,
    },
}

impl TemplateError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TemplateError::Corrupt { .. } => ErrorClass::DataDefect,
            TemplateError::NotFound(_) | TemplateError::Unreadable { .. } => ErrorClass::ResourceUnavailable,
        }
    }
}

/// Content of one template cell.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CellSpec {
    pub state: CellState,
    /// Tag handed to marker handlers after placement.
    pub marker: Option<String>,
}

impl CellSpec {
    pub fn new(state: CellState) -> Self {
        Self { state, marker: None }
    }

    pub fn marker(state: CellState, tag: &str) -> Self {
        Self {
            state,
            marker: Some(tag.to_owned()),
        }
    }
}

/// Filter applied to each cell when a piece is emitted. Returning `None`
/// drops the cell.
pub trait CellProcessor: fmt::Debug + Send + Sync {
    fn process(&self, pos: IVec3, cell: &CellSpec) -> Option<CellSpec>;
}

/// Drops cells whose state is in the list.
#[derive(Clone, Debug, Default)]
pub struct IgnoreCells {
    states: Vec<CellState>,
}

impl IgnoreCells {
    pub fn new(states: Vec<CellState>) -> Self {
        Self { states }
    }
}

impl CellProcessor for IgnoreCells {
    fn process(&self, _pos: IVec3, cell: &CellSpec) -> Option<CellSpec> {
        if self.states.contains(&cell.state) {
            None
        } else {
            Some(cell.clone())
        }
    }
}

/// How a template is read: rotation, mirror, pivot, and emission filters.
#[derive(Clone, Debug, Default)]
pub struct PlacementData {
    pub rotation: Rotation,
    pub mirror: Mirror,
    pub pivot: IVec3,
    processors: Vec<Arc<dyn CellProcessor>>,
}

impl PlacementData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_mirror(mut self, mirror: Mirror) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_pivot(mut self, pivot: IVec3) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn CellProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    pub fn processors(&self) -> &[Arc<dyn CellProcessor>] {
        &self.processors
    }

    /// Relative template position to a position relative to the anchor.
    pub fn transform(&self, relative: IVec3) -> IVec3 {
        transform::transform_around(self.rotation, self.mirror, self.pivot, relative)
    }

    /// Run every processor in order. `None` as soon as one drops the cell.
    pub fn process(&self, pos: IVec3, cell: &CellSpec) -> Option<CellSpec> {
        let mut current = cell.clone();
        for processor in &self.processors {
            current = processor.process(pos, &current)?;
        }
        Some(current)
    }
}

/// Named prefabricated layout. Shared read-only once built.
#[derive(Debug)]
pub struct Template {
    id: Identifier,
    size: IVec3,
    cells: Vec<(IVec3, CellSpec)>,
    markers: BTreeMap<String, IVec3>,
}

impl Template {
    pub fn builder(id: Identifier, size: IVec3) -> TemplateBuilder {
        TemplateBuilder {
            id,
            size,
            cells: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn size(&self) -> IVec3 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Every cell at its absolute position for the given placement and anchor.
    /// Calling it again restarts the sequence.
    pub fn cells<'a>(
        &'a self,
        placement: &'a PlacementData,
        anchor: IVec3,
    ) -> impl Iterator<Item = (IVec3, &'a CellSpec)> + 'a {
        self.cells
            .iter()
            .map(move |(relative, cell)| (anchor + placement.transform(*relative), cell))
    }

    /// Every marker-tagged cell at its absolute position.
    pub fn marker_cells<'a>(
        &'a self,
        placement: &'a PlacementData,
        anchor: IVec3,
    ) -> impl Iterator<Item = (IVec3, &'a str)> + 'a {
        self.cells(placement, anchor)
            .filter_map(|(pos, cell)| cell.marker.as_deref().map(|tag| (pos, tag)))
    }

    pub fn marker_position(&self, name: &str, placement: &PlacementData, anchor: IVec3) -> Option<IVec3> {
        self.markers
            .get(name)
            .map(|relative| anchor + placement.transform(*relative))
    }

    pub fn marker_names(&self) -> impl Iterator<Item = &str> {
        self.markers.keys().map(String::as_str)
    }

    pub fn to_file(&self) -> TemplateFile {
        let mut palette: Vec<CellState> = Vec::new();
        let mut cells = Vec::with_capacity(self.cells.len());
        for (pos, cell) in &self.cells {
            let state = match palette.iter().position(|s| *s == cell.state) {
                Some(slot) => slot,
                None => {
                    palette.push(cell.state.clone());
                    palette.len() - 1
                }
            };
            cells.push(TemplateFileCell {
                pos: pos.to_array(),
                state,
                marker: cell.marker.clone(),
            });
        }
        TemplateFile {
            size: self.size.to_array(),
            palette,
            cells,
        }
    }

    pub fn from_file(id: Identifier, file: TemplateFile) -> Result<Template, TemplateError> {
        let size = IVec3::from_array(file.size);
        if size.cmplt(IVec3::ZERO).any() {
            return Err(TemplateError::Corrupt {
                id,
                reason: format!("negative size {size}"),
            });
        }
        let mut builder = Template::builder(id, size);
        for entry in file.cells {
            let pos = IVec3::from_array(entry.pos);
            let Some(state) = file.palette.get(entry.state) else {
                return Err(TemplateError::Corrupt {
                    id: builder.id,
                    reason: format!("palette index {} out of range at {pos}", entry.state),
                });
            };
            if pos.cmplt(IVec3::ZERO).any() || pos.cmpge(size).any() {
                return Err(TemplateError::Corrupt {
                    id: builder.id,
                    reason: format!("cell {pos} outside size {size}"),
                });
            }
            builder = builder.cell(
                pos,
                CellSpec {
                    state: state.clone(),
                    marker: entry.marker,
                },
            );
        }
        Ok(builder.build())
    }
}

pub struct TemplateBuilder {
    id: Identifier,
    size: IVec3,
    cells: Vec<(IVec3, CellSpec)>,
    index: FxHashMap<IVec3, usize>,
}

impl TemplateBuilder {
    /// Set a cell. A later call for the same position replaces the earlier one.
    pub fn cell(mut self, pos: IVec3, spec: CellSpec) -> Self {
        match self.index.get(&pos) {
            Some(&slot) => self.cells[slot].1 = spec,
            None => {
                self.index.insert(pos, self.cells.len());
                self.cells.push((pos, spec));
            }
        }
        self
    }

    pub fn state(self, pos: IVec3, state: CellState) -> Self {
        self.cell(pos, CellSpec::new(state))
    }

    pub fn build(self) -> Template {
        let mut markers = BTreeMap::new();
        for (pos, cell) in &self.cells {
            if let Some(tag) = &cell.marker {
                markers.entry(tag.clone()).or_insert(*pos);
            }
        }
        Template {
            id: self.id,
            size: self.size,
            cells: self.cells,
            markers,
        }
    }
}

/// On-disk template format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateFile {
    pub size: [i32; 3],
    pub palette: Vec<CellState>,
    pub cells: Vec<TemplateFileCell>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateFileCell {
    pub pos: [i32; 3],
    pub state: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
}

/// Loads and caches templates by identifier.
///
/// Files live at `<root>/<namespace>/structures/<path>.json`. Templates
/// registered in memory take precedence over files.
pub struct TemplateManager {
    root: Option<PathBuf>,
    cache: RwLock<FxHashMap<Identifier, Arc<Template>>>,
}

impl TemplateManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            root: None,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn register(&self, template: Template) -> Arc<Template> {
        let template = Arc::new(template);
        self.cache
            .write()
            .insert(template.id().clone(), Arc::clone(&template));
        template
    }

    pub fn template_path(root: &Path, id: &Identifier) -> PathBuf {
        root.join(id.namespace())
            .join("structures")
            .join(format!("{}.json", id.path()))
    }

    pub fn load(&self, id: &Identifier) -> Result<Arc<Template>, TemplateError> {
        if let Some(template) = self.cache.read().get(id) {
            return Ok(Arc::clone(template));
        }

        let root = self
            .root
            .as_deref()
            .ok_or_else(|| TemplateError::NotFound(id.clone()))?;
        let path = Self::template_path(root, id);
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TemplateError::NotFound(id.clone()),
            _ => TemplateError::Unreadable {
                id: id.clone(),
                source: e,
            },
        })?;
        let file: TemplateFile = serde_json::from_str(&content).map_err(|e| TemplateError::Corrupt {
            id: id.clone(),
            reason: e.to_string(),
        })?;
        let template = Template::from_file(id.clone(), file)?;
        tracing::debug!("Loaded template {} ({} cells) from {}", id, template.len(), path.display());

        let mut cache = self.cache.write();
        let entry = cache
            .entry(id.clone())
            .or_insert_with(|| Arc::new(template));
        Ok(Arc::clone(entry))
    }
}
