use std::collections::BTreeMap;

use crate::gate::Gate;
use crate::item::{Item, ItemKind};
use crate::profile::RegionId;
use crate::rule::Rule;
use crate::state::{FrontierSide, WorldState};

/// Traversal rules for both directions of a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GateTraversal {
    /// Travel out of the left endpoint.
    pub left: Rule,
    /// Travel out of the right endpoint.
    pub right: Rule,
}

impl Default for GateTraversal {
    fn default() -> Self {
        Self {
            left: Rule::Always,
            right: Rule::Always,
        }
    }
}

/// Working state of one run. Created by initialization and discarded when the
/// run ends; never shared across runs.
#[derive(Debug, Clone)]
pub(crate) struct GenerationSession {
    pub state: WorldState,
    pub pool: Vec<Item>,
    pub traversal: BTreeMap<String, GateTraversal>,
    pub start: RegionId,
    pub pre_opened: Vec<Gate>,
    pub force_opened: Vec<Gate>,
    /// Location index to assigned item.
    pub placements: BTreeMap<usize, Item>,
}

impl GenerationSession {
    /// Pool indices of progression gates on the frontier whose outgoing
    /// traversal rule is met.
    pub(crate) fn placeable_gates(&self) -> Vec<usize> {
        self.pool
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                let gate = item.progression_gate()?;
                let side = self.state.frontier_side(gate)?;
                self.can_traverse(gate, side).then_some(idx)
            })
            .collect()
    }

    /// Pool indices of non-gate progression; always eligible.
    pub(crate) fn placeable_other(&self) -> Vec<usize> {
        self.pool
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_progression() && item.progression_gate().is_none())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Pool indices of every progression gate, placeable or not.
    pub(crate) fn progression_gates(&self) -> Vec<usize> {
        self.pool
            .iter()
            .enumerate()
            .filter(|(_, item)| item.progression_gate().is_some())
            .map(|(idx, _)| idx)
            .collect()
    }

    fn can_traverse(&self, gate: &Gate, side: FrontierSide) -> bool {
        let Some(traversal) = self.traversal.get(&gate.name) else {
            return true;
        };
        let rule = match side {
            FrontierSide::Left => &traversal.left,
            FrontierSide::Right => &traversal.right,
        };
        rule.is_met(&self.state)
    }

    /// Apply a placed item's effect to the world state.
    pub(crate) fn fold(&mut self, item: &Item) -> usize {
        let newly = match &item.kind {
            ItemKind::Gate(gate) if item.is_progression() => self.state.add_gate(gate),
            ItemKind::Karma => self.state.add_karma(),
            ItemKind::Story(flag) => self.state.add_other_prog_item(flag),
            _ => return 0,
        };
        newly.len()
    }

    /// Pick the `nth` currently available location.
    pub(crate) fn nth_available(&self, nth: usize) -> Option<usize> {
        self.state.available().iter().nth(nth).copied()
    }

    /// Claim `location` for `item`. `location` must come from the available set.
    pub(crate) fn assign(&mut self, location: usize, item: Item) {
        let claimed = self.state.claim(location);
        debug_assert!(claimed, "location {location} was not available");
        self.placements.insert(location, item);
    }
}
