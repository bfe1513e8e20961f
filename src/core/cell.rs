use serde::{Deserialize, Serialize};
use std::ops::BitOr;

use crate::core::identifier::Identifier;

/// Content of one cell in a target space. `EMPTY` is the absence of content.
///
/// The crate never interprets block names; hosts decide what a state means.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellState(Option<Identifier>);

impl CellState {
    pub const EMPTY: CellState = CellState(None);

    pub fn of(block: Identifier) -> Self {
        CellState(Some(block))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn block(&self) -> Option<&Identifier> {
        self.0.as_ref()
    }
}

impl From<Identifier> for CellState {
    fn from(block: Identifier) -> Self {
        CellState::of(block)
    }
}

/// Update flags passed through to `set_cell`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SetFlags(u8);

impl SetFlags {
    pub const NONE: SetFlags = SetFlags(0);
    pub const NOTIFY_NEIGHBORS: SetFlags = SetFlags(1);
    pub const NOTIFY_LISTENERS: SetFlags = SetFlags(2);
    pub const DEFAULT: SetFlags = SetFlags(3);

    pub fn contains(self, other: SetFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for SetFlags {
    type Output = SetFlags;

    fn bitor(self, rhs: SetFlags) -> SetFlags {
        SetFlags(self.0 | rhs.0)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct LootTableRef {
    pub table: Identifier,
    pub seed: u64,
}

/// Extra per-cell data owned by the target space (containers and the like).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BlockEntity {
    pub kind: Identifier,
    pub lootable: bool,
    pub loot_table: Option<LootTableRef>,
}

impl BlockEntity {
    pub fn container(kind: Identifier) -> Self {
        Self {
            kind,
            lootable: true,
            loot_table: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_serializes_as_null() {
        assert_eq!(serde_json::to_value(CellState::EMPTY).unwrap(), serde_json::Value::Null);
        let stone = CellState::of("stone".parse().unwrap());
        assert_eq!(
            serde_json::to_value(&stone).unwrap(),
            serde_json::json!("minecraft:stone")
        );
    }

    #[test]
    fn flags_combine() {
        let flags = SetFlags::NOTIFY_NEIGHBORS | SetFlags::NOTIFY_LISTENERS;
        assert_eq!(flags, SetFlags::DEFAULT);
        assert!(flags.contains(SetFlags::NOTIFY_LISTENERS));
        assert!(!SetFlags::NONE.contains(SetFlags::NOTIFY_NEIGHBORS));
    }
}
