//! Build locations, items, and the seeded world state for one run.
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

use super::Generator;
use super::session::{GateTraversal, GenerationSession};
use super::trace::Trace;
use crate::constants::{FALLBACK_START_REGION, PASSAGE_LOCATION_PREFIX};
use crate::error::FailureReason;
use crate::gate::Gate;
use crate::item::Item;
use crate::location::{Location, LocationKind};
use crate::overlay::{LogicPackage, SubRegion, combine};
use crate::profile::RegionId;
use crate::rule::Rule;
use crate::state::{LogicContext, RegionLink, WorldState};

pub(super) fn initialize<R: Rng + ?Sized>(
    generator: &Generator,
    rng: &mut R,
    trace: &mut Trace,
) -> Result<GenerationSession, FailureReason> {
    let empty = LogicPackage::default();
    let package = generator
        .registry
        .package(&generator.profile)
        .unwrap_or(&empty);

    let (region_rules, sub_regions) = surviving_regions(generator, package, trace);
    let context = run_context(generator, region_rules.keys().cloned());
    // Possibility checks only read the context, never the facts.
    let empty_state =
        WorldState::new(context.clone(), Vec::new(), generator.config.starting_karma);

    let (locations, mut pool) = build_locations(
        generator,
        package,
        &region_rules,
        &sub_regions,
        &empty_state,
        trace,
    );
    let (traversal, gate_items, force_opened) = build_gates(
        generator,
        package,
        &region_rules,
        &sub_regions,
        &empty_state,
        trace,
    );
    pool.extend(gate_items);
    pool.extend((0..generator.config.karma_items()).map(|_| Item::karma()));
    pool.extend(
        generator
            .catalog
            .story_items
            .iter()
            .filter(|entry| entry.profiles.applies_to(&generator.profile))
            .map(|entry| Item::story(&entry.id)),
    );

    let start = choose_start(generator, package, &region_rules, rng)?;
    trace.record(format!(
        "profile {}: {} regions, {} locations, {} items, start {start}",
        generator.profile,
        region_rules.len(),
        locations.len(),
        pool.len()
    ));

    let mut state = WorldState::new(context, locations, generator.config.starting_karma);
    for sub in &sub_regions {
        state.add_link(RegionLink {
            from: sub.parent.clone(),
            to: sub.id.clone(),
            rule: sub.entry_rule.clone(),
        });
        state.add_link(RegionLink {
            from: sub.id.clone(),
            to: sub.parent.clone(),
            rule: sub.exit_rule.clone(),
        });
    }
    state.add_region(&start);
    for gate in &force_opened {
        trace.record(format!("force-opened {gate}"));
        state.add_gate(gate);
    }

    Ok(GenerationSession {
        state,
        pool,
        traversal,
        start,
        pre_opened: Vec::new(),
        force_opened,
        placements: BTreeMap::new(),
    })
}

fn run_context(generator: &Generator, regions: impl IntoIterator<Item = RegionId>) -> LogicContext {
    let mut context = LogicContext::new(generator.profile.clone())
        .with_timeline(generator.catalog.timeline.clone())
        .with_regions(regions)
        .with_options(generator.config.options.clone())
        .with_max_karma(generator.config.max_karma);
    for entry in &generator.catalog.regions {
        if context.is_valid_region(&entry.id) {
            context = context.with_region_kinds(entry.id.clone(), entry.kinds.clone());
        }
    }
    context
}

/// Regions (and sub-regions) whose patched base rule is possible, mapped to
/// that rule.
fn surviving_regions(
    generator: &Generator,
    package: &LogicPackage,
    trace: &mut Trace,
) -> (BTreeMap<RegionId, Rule>, Vec<SubRegion>) {
    let profile = &generator.profile;
    let mut candidates: Vec<RegionId> = generator
        .catalog
        .regions
        .iter()
        .filter(|entry| entry.profiles.applies_to(profile))
        .map(|entry| entry.id.clone())
        .collect();
    let subs: Vec<&SubRegion> = package
        .sub_regions
        .iter()
        .filter(|sub| candidates.contains(&sub.parent))
        .collect();
    candidates.extend(subs.iter().map(|sub| sub.id.clone()));

    let empty_state = WorldState::new(
        run_context(generator, candidates.iter().cloned()),
        Vec::new(),
        generator.config.starting_karma,
    );
    let mut rules = BTreeMap::new();
    for region in candidates {
        let base = Rule::Region(region.clone());
        let rule = match package.region_patch(&region) {
            Some(patch) => combine(base, patch),
            None => base,
        };
        if rule.is_possible(&empty_state) {
            rules.insert(region, rule);
        } else {
            trace.record(format!("pruned region {region}: {rule}"));
        }
    }

    let sub_regions = subs
        .into_iter()
        .filter(|sub| rules.contains_key(&sub.id) && rules.contains_key(&sub.parent))
        .cloned()
        .collect();
    (rules, sub_regions)
}

fn build_locations(
    generator: &Generator,
    package: &LogicPackage,
    region_rules: &BTreeMap<RegionId, Rule>,
    sub_regions: &[SubRegion],
    empty_state: &WorldState,
    trace: &mut Trace,
) -> (Vec<Location>, Vec<Item>) {
    let profile = &generator.profile;
    let moved: BTreeMap<&str, &RegionId> = sub_regions
        .iter()
        .flat_map(|sub| {
            sub.locations
                .iter()
                .chain(sub.shelters.iter())
                .map(move |id| (id.as_str(), &sub.id))
        })
        .collect();

    let mut locations = Vec::new();
    let mut tokens = Vec::new();
    let mut keep = |location: Location, trace: &mut Trace| {
        if location.rule.is_possible(empty_state) {
            locations.push(location);
            true
        } else {
            trace.record(format!("pruned location {}: {}", location.id, location.rule));
            false
        }
    };

    for entry in &generator.catalog.locations {
        if !entry.profiles.applies_to(profile) {
            continue;
        }
        let region = moved.get(entry.id.as_str()).copied().unwrap_or(&entry.region);
        let Some(region_rule) = region_rules.get(region) else {
            continue;
        };
        let rule = with_requirement(region_rule.clone(), entry.requires.as_ref());
        let rule = match package.location_patch(&entry.id) {
            Some(patch) => combine(rule, patch),
            None => rule,
        };
        keep(
            Location::new(&entry.id, entry.kind, Some(region.clone()), rule),
            trace,
        );
    }

    for passage in &generator.catalog.passages {
        if !passage.applies_to(profile) {
            continue;
        }
        let id = format!("{PASSAGE_LOCATION_PREFIX}{}", passage.id);
        let rule = passage.requires.clone().unwrap_or(Rule::Always);
        let rule = match package.location_patch(&id) {
            Some(patch) => combine(rule, patch),
            None => rule,
        };
        if keep(Location::new(&id, LocationKind::Passage, None, rule), trace) {
            tokens.push(Item::passage_token(&passage.id));
        }
    }

    (locations, tokens)
}

fn with_requirement(base: Rule, requires: Option<&Rule>) -> Rule {
    match requires {
        None | Some(Rule::Always) => base,
        Some(extra) => Rule::all(vec![base, extra.clone()]),
    }
}

fn build_gates(
    generator: &Generator,
    package: &LogicPackage,
    region_rules: &BTreeMap<RegionId, Rule>,
    sub_regions: &[SubRegion],
    empty_state: &WorldState,
    trace: &mut Trace,
) -> (BTreeMap<String, GateTraversal>, Vec<Item>, Vec<Gate>) {
    let profile = &generator.profile;
    let mut candidates: Vec<(Gate, GateTraversal, bool)> = Vec::new();
    for entry in &generator.catalog.gates {
        if !entry.profiles.applies_to(profile) {
            continue;
        }
        let Ok(gate) = Gate::parse(&entry.name) else {
            continue;
        };
        let forced = entry.force_open.contains(profile);
        candidates.push((gate, GateTraversal::default(), forced));
    }
    for connection in &package.new_connections {
        let traversal = GateTraversal {
            left: connection.left_rule.clone(),
            right: connection.right_rule.clone(),
        };
        candidates.push((connection.gate(), traversal, false));
    }

    let mut seen = BTreeSet::new();
    let mut traversals = BTreeMap::new();
    let mut items = Vec::new();
    let mut forced_open = Vec::new();
    for (mut gate, mut traversal, forced) in candidates {
        if !seen.insert(gate.name.clone()) {
            continue;
        }
        for sub in sub_regions {
            if sub.connections.contains(&gate.name) {
                gate.remap_endpoint(&sub.parent, &sub.id);
            }
        }
        if !region_rules.contains_key(&gate.left) || !region_rules.contains_key(&gate.right) {
            trace.record(format!("pruned gate {gate}: endpoint unavailable"));
            continue;
        }
        if let Some(patch) = package.connection_patch(&gate.name) {
            traversal.left = combine(traversal.left, &patch.left);
            traversal.right = combine(traversal.right, &patch.right);
        }
        if !traversal.left.is_possible(empty_state) && !traversal.right.is_possible(empty_state) {
            trace.record(format!("pruned gate {gate}: no possible direction"));
            continue;
        }
        traversals.insert(gate.name.clone(), traversal);
        if forced {
            forced_open.push(gate);
        } else {
            items.push(Item::gate(gate));
        }
    }
    (traversals, items, forced_open)
}

fn choose_start<R: Rng + ?Sized>(
    generator: &Generator,
    package: &LogicPackage,
    region_rules: &BTreeMap<RegionId, Rule>,
    rng: &mut R,
) -> Result<RegionId, FailureReason> {
    let profile = &generator.profile;
    let eligible = |region: &RegionId| {
        region_rules.contains_key(region) && !package.is_blacklisted_start(region)
    };
    let candidates: Vec<RegionId> = generator
        .catalog
        .starts
        .iter()
        .filter(|entry| entry.profiles.applies_to(profile) && eligible(&entry.region))
        .map(|entry| entry.region.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if generator.config.random_start {
        if candidates.is_empty() {
            return Err(FailureReason::NoValidStart);
        }
        return Ok(candidates[rng.gen_range(0..candidates.len())].clone());
    }

    let start = generator
        .catalog
        .default_starts
        .get(profile)
        .cloned()
        .or_else(|| candidates.first().cloned())
        .unwrap_or_else(|| RegionId::new(FALLBACK_START_REGION));
    if eligible(&start) {
        Ok(start)
    } else {
        Err(FailureReason::NoValidStart)
    }
}
