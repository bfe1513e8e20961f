//! Predicates over biome contexts.
//!
//! A [`Selector`] is a cloneable closure. The helpers in this module build the
//! usual ones; [`Selector::and`], [`Selector::or`] and [`Selector::negate`]
//! combine them, short-circuiting left to right.

use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::Arc;

use crate::core::Identifier;

/// What a selector may look at for one biome.
#[derive(Clone, Debug)]
pub struct BiomeSelection {
    pub key: Identifier,
    pub dimension: Identifier,
    pub tags: FxHashSet<Identifier>,
}

impl BiomeSelection {
    pub fn new(key: Identifier, dimension: Identifier) -> Self {
        Self {
            key,
            dimension,
            tags: FxHashSet::default(),
        }
    }

    pub fn with_tag(mut self, tag: Identifier) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn has_tag(&self, tag: &Identifier) -> bool {
        self.tags.contains(tag)
    }
}

#[derive(Clone)]
pub struct Selector(Arc<dyn Fn(&BiomeSelection) -> bool + Send + Sync>);

impl Selector {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&BiomeSelection) -> bool + Send + Sync + 'static,
    {
        Selector(Arc::new(predicate))
    }

    pub fn test(&self, selection: &BiomeSelection) -> bool {
        (self.0)(selection)
    }

    pub fn and(self, other: Selector) -> Selector {
        Selector::new(move |s| self.test(s) && other.test(s))
    }

    pub fn or(self, other: Selector) -> Selector {
        Selector::new(move |s| self.test(s) || other.test(s))
    }

    pub fn negate(self) -> Selector {
        Selector::new(move |s| !self.test(s))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Selector(..)")
    }
}

pub fn all() -> Selector {
    Selector::new(|_| true)
}

pub fn tag(tag: Identifier) -> Selector {
    Selector::new(move |s| s.has_tag(&tag))
}

/// Biomes generated in the given dimension.
pub fn found_in(dimension: Identifier) -> Selector {
    Selector::new(move |s| s.dimension == dimension)
}

pub fn include_by_key<I>(keys: I) -> Selector
where
    I: IntoIterator<Item = Identifier>,
{
    let keys: FxHashSet<Identifier> = keys.into_iter().collect();
    Selector::new(move |s| keys.contains(&s.key))
}

pub fn exclude_by_key<I>(keys: I) -> Selector
where
    I: IntoIterator<Item = Identifier>,
{
    include_by_key(keys).negate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn id(s: &str) -> Identifier {
        s.parse().unwrap()
    }

    fn ocean() -> BiomeSelection {
        BiomeSelection::new(id("ocean"), id("overworld")).with_tag(id("is_ocean"))
    }

    fn forest() -> BiomeSelection {
        BiomeSelection::new(id("forest"), id("overworld")).with_tag(id("is_forest"))
    }

    #[test]
    fn negated_tag() {
        let not_ocean = tag(id("is_ocean")).negate();
        assert!(!not_ocean.test(&ocean()));
        assert!(not_ocean.test(&forest()));
    }

    #[test]
    fn key_and_dimension_selectors() {
        let nether = BiomeSelection::new(id("nether_wastes"), id("the_nether"));
        assert!(found_in(id("overworld")).test(&forest()));
        assert!(!found_in(id("overworld")).test(&nether));
        assert!(include_by_key([id("forest")]).test(&forest()));
        assert!(exclude_by_key([id("forest")]).test(&ocean()));
        assert!(!exclude_by_key([id("forest")]).test(&forest()));
        assert!(all().test(&nether));
    }

    #[test]
    fn combinators_short_circuit_left_to_right() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = {
            let calls = Arc::clone(&calls);
            Selector::new(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            })
        };

        assert!(!tag(id("is_ocean")).and(counted.clone()).test(&forest()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(tag(id("is_forest")).or(counted.clone()).test(&forest()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(tag(id("is_ocean")).or(counted).test(&forest()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
