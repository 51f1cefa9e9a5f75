//! Accumulated facts and the one-directional reachability fixpoint.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::Options;
use crate::constants::DEFAULT_MAX_KARMA;
use crate::gate::Gate;
use crate::location::Location;
use crate::profile::{ProfileId, RegionId};
use crate::rule::Rule;

/// Locations that entered logic during one recalculation.
pub type NewlyAvailable = SmallVec<[usize; 8]>;

/// Creature and object kinds found in a region.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegionKinds {
    #[serde(default)]
    pub creatures: Vec<String>,
    #[serde(default)]
    pub objects: Vec<String>,
}

/// Immutable per-run facts about the active profile that rules consult for
/// possibility checks.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicContext {
    pub profile: ProfileId,
    pub timeline: Vec<ProfileId>,
    /// Regions that exist for this run.
    pub regions: BTreeSet<RegionId>,
    pub region_kinds: BTreeMap<RegionId, RegionKinds>,
    pub options: Options,
    pub max_karma: u8,
}

impl LogicContext {
    #[must_use]
    pub fn new(profile: ProfileId) -> Self {
        Self {
            profile,
            timeline: Vec::new(),
            regions: BTreeSet::new(),
            region_kinds: BTreeMap::new(),
            options: Options::new(),
            max_karma: DEFAULT_MAX_KARMA,
        }
    }

    #[must_use]
    pub fn with_timeline(mut self, timeline: Vec<ProfileId>) -> Self {
        self.timeline = timeline;
        self
    }

    #[must_use]
    pub fn with_regions(mut self, regions: impl IntoIterator<Item = RegionId>) -> Self {
        self.regions.extend(regions);
        self
    }

    #[must_use]
    pub fn with_region_kinds(mut self, region: RegionId, kinds: RegionKinds) -> Self {
        self.region_kinds.insert(region, kinds);
        self
    }

    #[must_use]
    pub fn with_option(mut self, name: &str, value: bool) -> Self {
        self.options.insert(name.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn with_max_karma(mut self, max_karma: u8) -> Self {
        self.max_karma = max_karma;
        self
    }

    #[must_use]
    pub fn is_valid_region(&self, region: &RegionId) -> bool {
        self.regions.contains(region)
    }

    #[must_use]
    pub fn timeline_position(&self, profile: &ProfileId) -> Option<usize> {
        self.timeline.iter().position(|entry| entry == profile)
    }
}

/// One-way traversal between two regions, followed by the fixpoint once
/// `from` is discovered and `rule` is met.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionLink {
    pub from: RegionId,
    pub to: RegionId,
    pub rule: Rule,
}

/// Which endpoint of a gate is already discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierSide {
    Left,
    Right,
}

/// Fact accumulator owning the Unreached / Available partition of locations.
///
/// Facts only ever grow, and a location that became available is never
/// re-examined.
#[derive(Debug, Clone)]
pub struct WorldState {
    context: LogicContext,
    regions: BTreeSet<RegionId>,
    gates: BTreeSet<String>,
    karma_cap: u8,
    flags: BTreeSet<String>,
    creatures: BTreeSet<String>,
    objects: BTreeSet<String>,
    links: Vec<RegionLink>,
    locations: Vec<Location>,
    unreached: Vec<usize>,
    available: BTreeSet<usize>,
    claimed: BTreeSet<usize>,
}

impl WorldState {
    /// Build a state with no discovered regions. Locations with rules that are
    /// already met (e.g. `Always`) become available immediately.
    #[must_use]
    pub fn new(context: LogicContext, locations: Vec<Location>, karma_cap: u8) -> Self {
        let unreached = (0..locations.len()).collect();
        let mut state = Self {
            context,
            regions: BTreeSet::new(),
            gates: BTreeSet::new(),
            karma_cap,
            flags: BTreeSet::new(),
            creatures: BTreeSet::new(),
            objects: BTreeSet::new(),
            links: Vec::new(),
            locations,
            unreached,
            available: BTreeSet::new(),
            claimed: BTreeSet::new(),
        };
        state.recalculate();
        state
    }

    #[must_use]
    pub const fn context(&self) -> &LogicContext {
        &self.context
    }

    /// Register a one-way region link and re-run the fixpoint.
    pub fn add_link(&mut self, link: RegionLink) -> NewlyAvailable {
        self.links.push(link);
        self.recalculate()
    }

    /// Discover a region directly (start region seeding).
    pub fn add_region(&mut self, region: &RegionId) -> NewlyAvailable {
        self.discover(region);
        self.recalculate()
    }

    /// Open a gate, discovering both of its endpoints.
    pub fn add_gate(&mut self, gate: &Gate) -> NewlyAvailable {
        self.gates.insert(gate.name.clone());
        self.discover(&gate.left);
        self.discover(&gate.right);
        self.recalculate()
    }

    /// Record a story/ability unlock.
    pub fn add_other_prog_item(&mut self, name: &str) -> NewlyAvailable {
        self.flags.insert(name.to_string());
        self.recalculate()
    }

    /// Raise the karma cap by one, saturating at the karma scale.
    pub fn add_karma(&mut self) -> NewlyAvailable {
        self.karma_cap = self.karma_cap.saturating_add(1).min(self.context.max_karma);
        self.recalculate()
    }

    fn discover(&mut self, region: &RegionId) {
        if !self.regions.insert(region.clone()) {
            return;
        }
        if let Some(kinds) = self.context.region_kinds.get(region) {
            self.creatures.extend(kinds.creatures.iter().cloned());
            self.objects.extend(kinds.objects.iter().cloned());
        }
    }

    /// Follow region links until stable, then move every unreached location
    /// whose rule is now met into the available set.
    pub fn recalculate(&mut self) -> NewlyAvailable {
        loop {
            let reached: Vec<RegionId> = self
                .links
                .iter()
                .filter(|link| {
                    self.regions.contains(&link.from)
                        && !self.regions.contains(&link.to)
                        && link.rule.is_met(self)
                })
                .map(|link| link.to.clone())
                .collect();
            if reached.is_empty() {
                break;
            }
            for region in &reached {
                self.discover(region);
            }
        }

        let pending = std::mem::take(&mut self.unreached);
        let (met, still): (Vec<usize>, Vec<usize>) = pending
            .into_iter()
            .partition(|idx| self.locations[*idx].rule.is_met(self));
        self.unreached = still;
        self.available.extend(met.iter().copied());
        met.into_iter().collect()
    }

    /// Move an available location into the claimed set. Returns false if the
    /// location was not available.
    pub fn claim(&mut self, idx: usize) -> bool {
        if self.available.remove(&idx) {
            self.claimed.insert(idx);
            true
        } else {
            false
        }
    }

    /// Which side of `gate` is discovered, if exactly one is.
    #[must_use]
    pub fn frontier_side(&self, gate: &Gate) -> Option<FrontierSide> {
        match (self.has_region(&gate.left), self.has_region(&gate.right)) {
            (true, false) => Some(FrontierSide::Left),
            (false, true) => Some(FrontierSide::Right),
            _ => None,
        }
    }

    #[must_use]
    pub fn has_region(&self, region: &RegionId) -> bool {
        self.regions.contains(region)
    }

    #[must_use]
    pub fn has_gate(&self, name: &str) -> bool {
        self.gates.contains(name)
    }

    #[must_use]
    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    #[must_use]
    pub fn has_creature(&self, kind: &str) -> bool {
        self.creatures.contains(kind)
    }

    #[must_use]
    pub fn has_object(&self, kind: &str) -> bool {
        self.objects.contains(kind)
    }

    #[must_use]
    pub const fn karma_cap(&self) -> u8 {
        self.karma_cap
    }

    #[must_use]
    pub const fn discovered_regions(&self) -> &BTreeSet<RegionId> {
        &self.regions
    }

    #[must_use]
    pub const fn opened_gates(&self) -> &BTreeSet<String> {
        &self.gates
    }

    /// Regions of the run not yet discovered.
    #[must_use]
    pub fn undiscovered_count(&self) -> usize {
        self.context
            .regions
            .iter()
            .filter(|region| !self.regions.contains(*region))
            .count()
    }

    #[must_use]
    pub fn is_fully_discovered(&self) -> bool {
        self.undiscovered_count() == 0
    }

    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    #[must_use]
    pub fn location(&self, idx: usize) -> &Location {
        &self.locations[idx]
    }

    /// Locations not yet in logic.
    #[must_use]
    pub fn unreached(&self) -> &[usize] {
        &self.unreached
    }

    /// Locations in logic that have not been claimed.
    #[must_use]
    pub const fn available(&self) -> &BTreeSet<usize> {
        &self.available
    }

    #[must_use]
    pub const fn claimed(&self) -> &BTreeSet<usize> {
        &self.claimed
    }

    /// Locations in logic, claimed or not.
    #[must_use]
    pub fn in_logic_count(&self) -> usize {
        self.available.len() + self.claimed.len()
    }
}
