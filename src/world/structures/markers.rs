use glam::IVec3;
use rand::RngCore;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::core::{CellState, Identifier, LootTableRef, SetFlags};
use crate::error::ErrorClass;
use crate::world::space::{SpaceError, TargetSpace};

#[derive(Debug, Error)]
pub enum MarkerError {
    #[error(transparent)]
    Space(#[from] SpaceError),
    #[error("{0}")]
    Handler(String),
}

impl MarkerError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Cosmetic
    }
}

pub type MarkerFn<S> = dyn Fn(IVec3, &mut S, &mut dyn RngCore) -> Result<(), MarkerError> + Send + Sync;

/// Callbacks keyed by marker tag, run after a piece's cells are emitted.
pub struct MarkerHandlers<S> {
    handlers: FxHashMap<String, Box<MarkerFn<S>>>,
}

impl<S> MarkerHandlers<S> {
    pub fn new() -> Self {
        Self {
            handlers: FxHashMap::default(),
        }
    }

    pub fn with<F>(mut self, tag: &str, handler: F) -> Self
    where
        F: Fn(IVec3, &mut S, &mut dyn RngCore) -> Result<(), MarkerError> + Send + Sync + 'static,
    {
        self.insert(tag, handler);
        self
    }

    pub fn insert<F>(&mut self, tag: &str, handler: F)
    where
        F: Fn(IVec3, &mut S, &mut dyn RngCore) -> Result<(), MarkerError> + Send + Sync + 'static,
    {
        self.handlers.insert(tag.to_owned(), Box::new(handler));
    }

    pub fn get(&self, tag: &str) -> Option<&MarkerFn<S>> {
        self.handlers.get(tag).map(|h| h.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<S> Default for MarkerHandlers<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the marker cell and seeds the loot table of the container below it.
pub fn container_loot<S: TargetSpace>(
    loot_table: Identifier,
) -> impl Fn(IVec3, &mut S, &mut dyn RngCore) -> Result<(), MarkerError> + Send + Sync + 'static {
    move |pos, space, rng| {
        space.set_cell(pos, CellState::EMPTY, SetFlags::DEFAULT)?;
        if let Some(entity) = space.block_entity_mut(pos - IVec3::Y) {
            if entity.lootable {
                entity.loot_table = Some(LootTableRef {
                    table: loot_table.clone(),
                    seed: rng.next_u64(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::space::GridSpace;
    use glam::IVec2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn container_loot_seeds_chest_below() {
        let chest = CellState::of("chest".parse().unwrap());
        let marker = CellState::of("structure_block".parse().unwrap());
        let mut space = GridSpace::new(IVec2::ZERO, IVec2::splat(4)).with_container(chest.clone());
        let pos = IVec3::new(1, 70, 1);
        space.set_cell(pos - IVec3::Y, chest, SetFlags::DEFAULT).unwrap();
        space.set_cell(pos, marker, SetFlags::DEFAULT).unwrap();

        let table: Identifier = "chests/igloo_chest".parse().unwrap();
        let handlers = MarkerHandlers::new().with("chest", container_loot::<GridSpace>(table.clone()));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        (handlers.get("chest").unwrap())(pos, &mut space, &mut rng).unwrap();

        assert!(space.get_cell(pos).is_empty());
        let entity = space.block_entity(pos - IVec3::Y).unwrap();
        assert_eq!(entity.loot_table.as_ref().map(|l| &l.table), Some(&table));
    }

    #[test]
    fn container_loot_without_container_is_harmless() {
        let mut space = GridSpace::new(IVec2::ZERO, IVec2::splat(4));
        let handler = container_loot::<GridSpace>("chests/any".parse().unwrap());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        handler(IVec3::new(0, 70, 0), &mut space, &mut rng).unwrap();
        assert_eq!(space.writes(), 1);
    }
}
