//! Target space the structure pipeline writes into.
//!
//! [`TargetSpace`] is the host-facing seam; [`GridSpace`] is a bounded sparse
//! implementation used by the binary and the tests.

use glam::{IVec2, IVec3};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::constants::{WORLD_MAX_Y, WORLD_MIN_Y};
use crate::core::{BlockEntity, CellState, SetFlags};
use crate::error::ErrorClass;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpaceError {
    #[error("position {0} is outside the writable region")]
    OutOfBounds(IVec3),
    #[error("position {0} is read-only")]
    ReadOnly(IVec3),
}

impl SpaceError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::ResourceUnavailable
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Heightmap {
    /// Any non-empty cell, sampled during world generation.
    #[default]
    WorldSurfaceWg,
    /// Any non-empty cell.
    WorldSurface,
    /// Non-empty, non-fluid cells.
    OceanFloorWg,
}

pub trait TargetSpace {
    fn get_cell(&self, pos: IVec3) -> CellState;

    fn set_cell(&mut self, pos: IVec3, state: CellState, flags: SetFlags) -> Result<(), SpaceError>;

    fn block_entity_mut(&mut self, pos: IVec3) -> Option<&mut BlockEntity>;

    /// Y of the first free cell above the highest cell counted by `heightmap`
    /// in `column`, or `None` when the column has no such cell.
    fn top_solid_y(&self, column: IVec2, heightmap: Heightmap) -> Option<i32>;
}

/// Bounded sparse voxel region.
pub struct GridSpace {
    min: IVec3,
    max: IVec3,
    cells: FxHashMap<IVec3, CellState>,
    block_entities: FxHashMap<IVec3, BlockEntity>,
    containers: FxHashSet<CellState>,
    fluids: FxHashSet<CellState>,
    writes: usize,
}

impl GridSpace {
    /// Region spanning `min_xz..max_xz` horizontally and the full world height.
    pub fn new(min_xz: IVec2, max_xz: IVec2) -> Self {
        Self::with_bounds(
            IVec3::new(min_xz.x, WORLD_MIN_Y, min_xz.y),
            IVec3::new(max_xz.x, WORLD_MAX_Y, max_xz.y),
        )
    }

    /// `min` inclusive, `max` exclusive.
    pub fn with_bounds(min: IVec3, max: IVec3) -> Self {
        GridSpace {
            min,
            max,
            cells: FxHashMap::default(),
            block_entities: FxHashMap::default(),
            containers: FxHashSet::default(),
            fluids: FxHashSet::default(),
            writes: 0,
        }
    }

    /// Cells of this state get a lootable block entity when placed.
    pub fn with_container(mut self, state: CellState) -> Self {
        self.containers.insert(state);
        self
    }

    /// Cells of this state are skipped by [`Heightmap::OceanFloorWg`].
    pub fn with_fluid(mut self, state: CellState) -> Self {
        self.fluids.insert(state);
        self
    }

    pub fn contains(&self, pos: IVec3) -> bool {
        pos.cmpge(self.min).all() && pos.cmplt(self.max).all()
    }

    pub fn min(&self) -> IVec3 {
        self.min
    }

    pub fn max(&self) -> IVec3 {
        self.max
    }

    /// Number of successful `set_cell` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn non_empty_count(&self) -> usize {
        self.cells.len()
    }

    pub fn block_entity(&self, pos: IVec3) -> Option<&BlockEntity> {
        self.block_entities.get(&pos)
    }

    /// Every non-empty cell ordered by position, for comparing two spaces.
    pub fn snapshot(&self) -> Vec<(IVec3, CellState)> {
        let mut cells: Vec<_> = self.cells.iter().map(|(p, s)| (*p, s.clone())).collect();
        cells.sort_by_key(|(p, _)| (p.x, p.y, p.z));
        cells
    }

    fn counts_for(&self, state: &CellState, heightmap: Heightmap) -> bool {
        match heightmap {
            Heightmap::WorldSurfaceWg | Heightmap::WorldSurface => !state.is_empty(),
            Heightmap::OceanFloorWg => !state.is_empty() && !self.fluids.contains(state),
        }
    }
}

impl TargetSpace for GridSpace {
    fn get_cell(&self, pos: IVec3) -> CellState {
        self.cells.get(&pos).cloned().unwrap_or_default()
    }

    fn set_cell(&mut self, pos: IVec3, state: CellState, _flags: SetFlags) -> Result<(), SpaceError> {
        if !self.contains(pos) {
            return Err(SpaceError::OutOfBounds(pos));
        }

        if self.containers.contains(&state) {
            if let Some(kind) = state.block() {
                self.block_entities.insert(pos, BlockEntity::container(kind.clone()));
            }
        } else {
            self.block_entities.remove(&pos);
        }

        if state.is_empty() {
            self.cells.remove(&pos);
        } else {
            self.cells.insert(pos, state);
        }
        self.writes += 1;
        Ok(())
    }

    fn block_entity_mut(&mut self, pos: IVec3) -> Option<&mut BlockEntity> {
        self.block_entities.get_mut(&pos)
    }

    fn top_solid_y(&self, column: IVec2, heightmap: Heightmap) -> Option<i32> {
        if column.x < self.min.x || column.x >= self.max.x || column.y < self.min.z || column.y >= self.max.z {
            return None;
        }
        (self.min.y..self.max.y)
            .rev()
            .find(|&y| {
                let state = self.get_cell(IVec3::new(column.x, y, column.y));
                self.counts_for(&state, heightmap)
            })
            .map(|y| y + 1)
    }
}
