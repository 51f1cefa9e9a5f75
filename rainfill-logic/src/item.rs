use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    CYCLE_FILLER_ITEM_ID, DUPLICATE_GATE_SUFFIX, KARMA_ITEM_ID, PASSAGE_TOKEN_PREFIX,
};
use crate::gate::Gate;

/// Whether assigning the item can change the world state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Progression,
    Filler,
}

/// Item category.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Gate(Gate),
    Karma,
    /// Story or ability unlock, folded in as a named flag.
    Story(String),
    PassageToken(String),
    CycleBonus,
    Filler(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub kind: ItemKind,
    pub importance: Importance,
}

impl Item {
    #[must_use]
    pub fn gate(gate: Gate) -> Self {
        Self {
            id: gate.name.clone(),
            kind: ItemKind::Gate(gate),
            importance: Importance::Progression,
        }
    }

    /// Logic-free copy of a gate item used to pad the pool.
    #[must_use]
    pub fn gate_copy(gate: &Gate) -> Self {
        Self {
            id: format!("{}{DUPLICATE_GATE_SUFFIX}", gate.name),
            kind: ItemKind::Gate(gate.clone()),
            importance: Importance::Filler,
        }
    }

    #[must_use]
    pub fn karma() -> Self {
        Self {
            id: KARMA_ITEM_ID.to_string(),
            kind: ItemKind::Karma,
            importance: Importance::Progression,
        }
    }

    #[must_use]
    pub fn story(flag: &str) -> Self {
        Self {
            id: flag.to_string(),
            kind: ItemKind::Story(flag.to_string()),
            importance: Importance::Progression,
        }
    }

    #[must_use]
    pub fn passage_token(passage: &str) -> Self {
        Self {
            id: format!("{PASSAGE_TOKEN_PREFIX}{passage}"),
            kind: ItemKind::PassageToken(passage.to_string()),
            importance: Importance::Filler,
        }
    }

    #[must_use]
    pub fn cycle_bonus() -> Self {
        Self {
            id: CYCLE_FILLER_ITEM_ID.to_string(),
            kind: ItemKind::CycleBonus,
            importance: Importance::Filler,
        }
    }

    #[must_use]
    pub fn filler(name: &str) -> Self {
        Self {
            id: name.to_string(),
            kind: ItemKind::Filler(name.to_string()),
            importance: Importance::Filler,
        }
    }

    #[must_use]
    pub fn is_progression(&self) -> bool {
        self.importance == Importance::Progression
    }

    /// The gate unlocked by this item, if it is a progression gate.
    #[must_use]
    pub fn progression_gate(&self) -> Option<&Gate> {
        match &self.kind {
            ItemKind::Gate(gate) if self.is_progression() => Some(gate),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_passage_token(&self) -> bool {
        matches!(self.kind, ItemKind::PassageToken(_))
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_copies_carry_no_logic() {
        let gate = Gate::parse("GATE_SU_HI").unwrap();
        let original = Item::gate(gate.clone());
        let copy = Item::gate_copy(&gate);
        assert_eq!(original.progression_gate(), Some(&gate));
        assert_eq!(copy.progression_gate(), None);
        assert_eq!(copy.id, "GATE_SU_HI (copy)");
    }

    #[test]
    fn passage_tokens_are_filler() {
        let token = Item::passage_token("Traveller");
        assert!(token.is_passage_token());
        assert!(!token.is_progression());
        assert_eq!(token.to_string(), "Passage Token-Traveller");
    }
}
