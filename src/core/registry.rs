//! Explicit, identifier-keyed registries.
//!
//! Populated by explicit registration calls at startup and frozen before
//! generation begins. Iteration follows registration order.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::core::identifier::Identifier;
use crate::error::ErrorClass;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{id} is already registered in {registry}")]
    Duplicate { registry: &'static str, id: Identifier },
    #[error("{id} is not registered in {registry}")]
    Missing { registry: &'static str, id: Identifier },
    #[error("registry {registry} is frozen")]
    Frozen { registry: &'static str },
}

impl RegistryError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RegistryError::Missing { .. } => ErrorClass::DataDefect,
            RegistryError::Duplicate { .. } | RegistryError::Frozen { .. } => ErrorClass::Misuse,
        }
    }
}

pub struct Registry<T> {
    name: &'static str,
    entries: Vec<(Identifier, T)>,
    index: FxHashMap<Identifier, usize>,
    frozen: bool,
}

impl<T> Registry<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
            index: FxHashMap::default(),
            frozen: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn register(&mut self, id: Identifier, value: T) -> Result<&T, RegistryError> {
        if self.frozen {
            return Err(RegistryError::Frozen { registry: self.name });
        }
        if self.index.contains_key(&id) {
            return Err(RegistryError::Duplicate {
                registry: self.name,
                id,
            });
        }
        let slot = self.entries.len();
        self.index.insert(id.clone(), slot);
        self.entries.push((id, value));
        Ok(&self.entries[slot].1)
    }

    pub fn get(&self, id: &Identifier) -> Option<&T> {
        self.index.get(id).map(|&slot| &self.entries[slot].1)
    }

    pub fn get_or_err(&self, id: &Identifier) -> Result<&T, RegistryError> {
        self.get(id).ok_or_else(|| RegistryError::Missing {
            registry: self.name,
            id: id.clone(),
        })
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.index.contains_key(id)
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &T)> {
        self.entries.iter().map(|(id, value)| (id, value))
    }
}

impl<T> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .field("len", &self.entries.len())
            .field("frozen", &self.frozen)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(path: &str) -> Identifier {
        Identifier::new("test", path).unwrap()
    }

    #[test]
    fn keeps_registration_order() {
        let mut registry = Registry::new("numbers");
        registry.register(id("b"), 2).unwrap();
        registry.register(id("a"), 1).unwrap();
        let keys: Vec<_> = registry.iter().map(|(k, _)| k.path().to_owned()).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(registry.get(&id("a")), Some(&1));
    }

    #[test]
    fn rejects_duplicates_and_frozen() {
        let mut registry = Registry::new("numbers");
        registry.register(id("a"), 1).unwrap();
        assert!(matches!(
            registry.register(id("a"), 2),
            Err(RegistryError::Duplicate { .. })
        ));
        registry.freeze();
        let err = registry.register(id("c"), 3).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Misuse);
        assert_eq!(
            registry.get_or_err(&id("zzz")).unwrap_err().class(),
            ErrorClass::DataDefect
        );
    }
}
