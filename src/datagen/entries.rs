use rustc_hash::FxHashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::core::{Identifier, Registry};
use crate::error::ErrorClass;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntriesError {
    #[error("duplicate entry {0}")]
    DuplicateIdentifier(Identifier),
    #[error("{registry} has no entry {id}")]
    MissingRegistryEntry { registry: &'static str, id: Identifier },
}

impl EntriesError {
    pub fn class(&self) -> ErrorClass {
        match self {
            EntriesError::DuplicateIdentifier(_) => ErrorClass::Misuse,
            EntriesError::MissingRegistryEntry { .. } => ErrorClass::DataDefect,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entry<T> {
    pub identifier: Identifier,
    pub value: T,
}

/// Append-only, insertion-ordered collection filled by one provider.
#[derive(Debug)]
pub struct Entries<T> {
    entries: Vec<Entry<T>>,
    seen: Option<FxHashSet<Identifier>>,
}

impl<T> Entries<T> {
    /// Duplicate identifiers are kept.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            seen: None,
        }
    }

    /// Duplicate identifiers are rejected.
    pub fn enforcing_unique() -> Self {
        Self {
            entries: Vec::new(),
            seen: Some(FxHashSet::default()),
        }
    }

    pub fn add(&mut self, identifier: Identifier, value: T) -> Result<(), EntriesError> {
        if let Some(seen) = &mut self.seen {
            if !seen.insert(identifier.clone()) {
                return Err(EntriesError::DuplicateIdentifier(identifier));
            }
        }
        self.entries.push(Entry { identifier, value });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry<T>> {
        self.entries.iter()
    }

    /// End population. The frozen entries are cheap to share across workers.
    pub fn freeze(self) -> FrozenEntries<T> {
        FrozenEntries(self.entries.into_iter().map(Arc::new).collect())
    }
}

impl<T: Clone> Entries<T> {
    /// Add the value registered under `id`.
    pub fn add_registered(&mut self, registry: &Registry<T>, id: &Identifier) -> Result<(), EntriesError> {
        let value = registry
            .get(id)
            .ok_or_else(|| EntriesError::MissingRegistryEntry {
                registry: registry.name(),
                id: id.clone(),
            })?
            .clone();
        self.add(id.clone(), value)
    }
}

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct FrozenEntries<T>(Vec<Arc<Entry<T>>>);

impl<T> FrozenEntries<T> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Entry<T>>> {
        self.0.iter()
    }
}

impl<T> Clone for FrozenEntries<T> {
    fn clone(&self) -> Self {
        FrozenEntries(self.0.clone())
    }
}
