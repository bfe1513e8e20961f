//! Phased biome modifications.
//!
//! Mods describe what to change with [`BiomeModifications::create`], then
//! register the finished [`ModificationSet`]. The first call to
//! [`BiomeModifications::apply`] seals the engine: later registrations fail.
//!
//! For every context, phases run in [`ModificationPhase::ORDER`]; inside a
//! phase, sets run in registration order and each set's pairs run in the order
//! they were added. Every matching action runs.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::biome::selection::{BiomeSelection, Selector};
use crate::biome::settings::{BiomeContext, GenerationSettings};
use crate::core::Identifier;
use crate::error::ErrorClass;

#[derive(Debug, Error)]
pub enum ModificationError {
    #[error("cannot register {0}: biome modifications are already sealed")]
    Sealed(Identifier),
}

impl ModificationError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Misuse
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ModificationPhase {
    Removals,
    Additions,
    Replacements,
    PostProcessing,
}

impl ModificationPhase {
    pub const ORDER: [ModificationPhase; 4] = [
        ModificationPhase::Removals,
        ModificationPhase::Additions,
        ModificationPhase::Replacements,
        ModificationPhase::PostProcessing,
    ];
}

type Action = Arc<dyn Fn(&BiomeSelection, &mut GenerationSettings) + Send + Sync>;

#[derive(Clone)]
struct Modification {
    phase: ModificationPhase,
    selector: Selector,
    action: Action,
}

/// Named, immutable list of (phase, selector, action) triples.
#[derive(Clone)]
pub struct ModificationSet {
    id: Identifier,
    modifications: Vec<Modification>,
}

impl ModificationSet {
    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.modifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifications.is_empty()
    }
}

impl fmt::Debug for ModificationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModificationSet")
            .field("id", &self.id)
            .field("len", &self.modifications.len())
            .finish()
    }
}

pub struct ModificationBuilder {
    id: Identifier,
    modifications: Vec<Modification>,
}

impl ModificationBuilder {
    pub fn add<F>(mut self, phase: ModificationPhase, selector: Selector, action: F) -> Self
    where
        F: Fn(&BiomeSelection, &mut GenerationSettings) + Send + Sync + 'static,
    {
        self.modifications.push(Modification {
            phase,
            selector,
            action: Arc::new(action),
        });
        self
    }

    pub fn finalize(self) -> ModificationSet {
        ModificationSet {
            id: self.id,
            modifications: self.modifications,
        }
    }
}

#[derive(Default)]
pub struct BiomeModifications {
    sets: Vec<ModificationSet>,
    sealed: bool,
}

impl BiomeModifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(id: Identifier) -> ModificationBuilder {
        ModificationBuilder {
            id,
            modifications: Vec::new(),
        }
    }

    pub fn register(&mut self, set: ModificationSet) -> Result<(), ModificationError> {
        if self.sealed {
            return Err(ModificationError::Sealed(set.id));
        }
        tracing::debug!("Registered biome modification {} ({} entries)", set.id, set.len());
        self.sets.push(set);
        Ok(())
    }

    pub fn seal(&mut self) {
        if !self.sealed {
            self.sealed = true;
            tracing::info!("Biome modifications sealed with {} sets", self.sets.len());
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn sets(&self) -> &[ModificationSet] {
        &self.sets
    }

    /// Apply every registered modification to `contexts`, in caller order.
    /// Returns the number of actions run.
    pub fn apply<'a, I>(&mut self, contexts: I) -> usize
    where
        I: IntoIterator<Item = &'a mut BiomeContext>,
    {
        self.seal();
        let mut applied = 0;
        for ctx in contexts {
            for phase in ModificationPhase::ORDER {
                for set in &self.sets {
                    for m in set.modifications.iter().filter(|m| m.phase == phase) {
                        if m.selector.test(&ctx.selection) {
                            tracing::debug!("Applying {} ({:?}) to {}", set.id, phase, ctx.selection.key);
                            (m.action)(&ctx.selection, &mut ctx.settings);
                            applied += 1;
                        }
                    }
                }
            }
        }
        applied
    }
}
