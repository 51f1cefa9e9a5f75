use std::collections::BTreeSet;
use std::sync::Arc;

use rainfill_logic::{
    FailureReason, GenerationStage, Generator, GeneratorConfig, ItemKind, LogicRegistry, Options,
    ProfileId, RegionId, WorldCatalog,
};
use serde_json::{Value, json};

fn generator(catalog: &Value, config: GeneratorConfig) -> Generator {
    let catalog = WorldCatalog::from_json(&catalog.to_string(), &config.options).unwrap();
    let registry = LogicRegistry::new(catalog.profiles.clone(), Options::new());
    Generator::new(
        Arc::new(catalog),
        Arc::new(registry),
        config,
        ProfileId::new("White"),
    )
    .unwrap()
}

/// No karma items in the pool.
fn no_karma() -> GeneratorConfig {
    GeneratorConfig {
        starting_karma: 1,
        max_karma: 1,
        ..GeneratorConfig::default()
    }
}

fn regions(ids: &[&str]) -> Value {
    Value::Array(ids.iter().map(|id| json!({ "id": id })).collect())
}

#[test]
fn three_region_chain_places_gates_in_order() {
    let catalog = json!({
        "profiles": ["White"],
        "regions": regions(&["A", "B", "C"]),
        "gates": [{ "name": "GATE_A_B" }, { "name": "GATE_B_C" }],
        "locations": [
            { "id": "Loc1", "kind": "misc", "region": "A", "requires": "always" },
            { "id": "Loc2", "kind": "misc", "region": "B" },
            { "id": "Loc3", "kind": "misc", "region": "C" }
        ],
        "default_starts": { "White": "A" },
        "filler_items": ["Filler1"]
    });
    let generator = generator(&catalog, no_karma());

    for seed in [0, 1, 42, u64::MAX] {
        let generation = generator.generate(seed).unwrap();
        assert_eq!(generation.start, RegionId::new("A"));
        assert_eq!(generation.item_at("Loc1").unwrap().id, "GATE_A_B");
        assert_eq!(generation.item_at("Loc2").unwrap().id, "GATE_B_C");
        assert_eq!(generation.item_at("Loc3").unwrap().id, "Filler1");
        let expected: BTreeSet<RegionId> = ["A", "B", "C"].map(RegionId::new).into();
        assert_eq!(generation.discovered, expected);
        assert!(generation.pre_opened.is_empty());
    }
}

#[test]
fn disconnected_region_fails_without_partial_assignment() {
    let catalog = json!({
        "profiles": ["White"],
        "regions": regions(&["A", "B"]),
        "locations": [{ "id": "LocB", "kind": "misc", "region": "B" }],
        "default_starts": { "White": "A" },
        "filler_items": ["Filler1"]
    });
    let failure = generator(&catalog, no_karma()).generate(3).unwrap_err();

    assert_eq!(failure.stage, GenerationStage::PlacingProgression);
    assert_eq!(
        failure.reason,
        FailureReason::NoAvailableLocations { undiscovered: 1 }
    );
    assert_eq!(failure.available, 0);
    assert_eq!(failure.unreached, 1);
    assert!(failure.discovered.contains(&RegionId::new("A")));
    assert!(!failure.discovered.contains(&RegionId::new("B")));
    assert!(failure.trace.last().unwrap().contains("failed"));
}

fn chain_catalog(passages: Value) -> Value {
    json!({
        "profiles": ["White"],
        "regions": regions(&["A", "B", "C", "D", "E", "F", "G", "H"]),
        "gates": [
            { "name": "GATE_A_B" }, { "name": "GATE_B_C" }, { "name": "GATE_C_D" },
            { "name": "GATE_D_E" }, { "name": "GATE_E_F" }, { "name": "GATE_F_G" },
            { "name": "GATE_G_H" }
        ],
        "locations": [
            { "id": "L1", "kind": "misc", "region": "A" },
            { "id": "L2", "kind": "misc", "region": "A" },
            { "id": "L3", "kind": "misc", "region": "A" },
            { "id": "L4", "kind": "misc", "region": "A" },
            { "id": "L5", "kind": "misc", "region": "A" }
        ],
        "passages": passages,
        "default_starts": { "White": "A" }
    })
}

#[test]
fn excess_gates_are_pre_opened() {
    let generator = generator(&chain_catalog(json!([])), no_karma());
    for seed in 0..20 {
        let generation = generator.generate(seed).unwrap();
        assert_eq!(generation.pre_opened.len(), 2, "seed {seed}");
        assert_eq!(generation.assignments.len(), 5);
        assert!(
            generation
                .assignments
                .values()
                .all(|item| matches!(item.kind, ItemKind::Gate(_)))
        );
        let placed: BTreeSet<&str> = generation
            .assignments
            .values()
            .map(|item| item.id.as_str())
            .collect();
        for gate in &generation.pre_opened {
            assert!(!placed.contains(gate.name.as_str()));
        }
        assert_eq!(generation.discovered.len(), 8);
        assert!(generation.trace.iter().any(|entry| entry.contains("pre-opened")));
    }
}

#[test]
fn passage_tokens_are_trimmed_before_gates() {
    let passages = json!([{ "id": "Traveller" }, { "id": "Wanderer" }]);

    let generation = generator(&chain_catalog(passages.clone()), no_karma())
        .generate(5)
        .unwrap();
    assert!(generation.pre_opened.is_empty());
    assert!(
        generation
            .assignments
            .values()
            .all(|item| !item.is_passage_token())
    );

    let keep_one = GeneratorConfig {
        min_passage_tokens: 1,
        ..no_karma()
    };
    let generation = generator(&chain_catalog(passages), keep_one)
        .generate(5)
        .unwrap();
    assert_eq!(generation.pre_opened.len(), 1);
    assert_eq!(
        generation
            .assignments
            .values()
            .filter(|item| item.is_passage_token())
            .count(),
        1
    );
}

#[test]
fn exhausted_padding_is_a_balance_failure() {
    let catalog = json!({
        "profiles": ["White"],
        "regions": regions(&["A"]),
        "locations": [
            { "id": "L1", "kind": "misc", "region": "A" },
            { "id": "L2", "kind": "misc", "region": "A" }
        ],
        "default_starts": { "White": "A" }
    });
    let config = GeneratorConfig {
        filler_enabled: false,
        ..no_karma()
    };
    let failure = generator(&catalog, config).generate(1).unwrap_err();
    assert_eq!(failure.stage, GenerationStage::BalancingItems);
    assert_eq!(
        failure.reason,
        FailureReason::BalanceExhausted {
            items: 0,
            locations: 2
        }
    );
}

#[test]
fn disabled_filler_pads_with_gate_copies() {
    let catalog = json!({
        "profiles": ["White"],
        "regions": regions(&["A", "B"]),
        "gates": [{ "name": "GATE_A_B" }],
        "locations": [
            { "id": "L1", "kind": "misc", "region": "A" },
            { "id": "L2", "kind": "misc", "region": "A" },
            { "id": "L3", "kind": "misc", "region": "B" }
        ],
        "default_starts": { "White": "A" },
        "filler_items": ["Rock"]
    });
    let config = GeneratorConfig {
        filler_enabled: false,
        ..no_karma()
    };
    let generation = generator(&catalog, config).generate(9).unwrap();
    let copies = generation
        .assignments
        .values()
        .filter(|item| item.id == "GATE_A_B (copy)")
        .count();
    assert_eq!(copies, 2);
    assert!(generation.location_of("GATE_A_B").is_some());
    assert!(generation.location_of("Rock").is_none());
}

#[test]
fn cycle_filler_is_capped_by_density() {
    let locations: Vec<Value> = (1..=10)
        .map(|n| json!({ "id": format!("L{n}"), "kind": "misc", "region": "A" }))
        .collect();
    let catalog = json!({
        "profiles": ["White"],
        "regions": regions(&["A"]),
        "locations": locations,
        "default_starts": { "White": "A" },
        "filler_items": ["Rock"]
    });
    let mut config = no_karma();
    config.cycle_filler.profiles = vec![ProfileId::new("White")];
    config.cycle_filler.density = 0.3;
    let generation = generator(&catalog, config).generate(2).unwrap();
    let cycles = generation
        .assignments
        .values()
        .filter(|item| item.kind == ItemKind::CycleBonus)
        .count();
    assert_eq!(cycles, 3);
    assert_eq!(generation.assignments.len(), 10);
}

#[test]
fn karma_items_unlock_karma_locations() {
    let catalog = json!({
        "profiles": ["White"],
        "regions": regions(&["A"]),
        "locations": [
            { "id": "L1", "kind": "misc", "region": "A" },
            { "id": "L2", "kind": "misc", "region": "A" },
            { "id": "Echo", "kind": "echo", "region": "A", "requires": { "karma": 7 } }
        ],
        "default_starts": { "White": "A" },
        "filler_items": ["Rock"]
    });
    let config = GeneratorConfig {
        starting_karma: 5,
        max_karma: 7,
        ..GeneratorConfig::default()
    };
    let generation = generator(&catalog, config).generate(4).unwrap();
    assert_eq!(generation.assignments.len(), 3);
    let karma = generation
        .assignments
        .iter()
        .filter(|(_, item)| item.kind == ItemKind::Karma)
        .map(|(location, _)| location.as_str())
        .collect::<Vec<_>>();
    assert_eq!(karma.len(), 2);
    // The echo needs both karma items, so neither can sit behind it.
    assert!(!karma.contains(&"Echo"));
}

#[test]
fn impossible_location_is_pruned_not_failed() {
    let catalog = json!({
        "profiles": ["White", "Saint"],
        "regions": regions(&["A"]),
        "locations": [
            { "id": "L1", "kind": "misc", "region": "A" },
            { "id": "SaintOnly", "kind": "misc", "region": "A", "requires": { "profile": "Saint" } }
        ],
        "default_starts": { "White": "A" },
        "filler_items": ["Rock"]
    });
    let generation = generator(&catalog, no_karma()).generate(0).unwrap();
    assert_eq!(generation.assignments.len(), 1);
    assert!(generation.item_at("SaintOnly").is_none());
    assert!(generation.trace.iter().any(|entry| entry.contains("pruned location SaintOnly")));
}

#[test]
fn start_regions_must_exist_and_be_eligible() {
    let catalog = json!({
        "profiles": ["White"],
        "regions": regions(&["A"]),
        "locations": [{ "id": "L1", "kind": "misc", "region": "A" }],
        "default_starts": { "White": "Z" }
    });
    let err = WorldCatalog::from_json(&catalog.to_string(), &Options::new()).unwrap_err();
    assert!(err.to_string().contains("`Z`"));

    let catalog = json!({
        "profiles": ["White"],
        "regions": regions(&["A"]),
        "locations": [{ "id": "L1", "kind": "misc", "region": "A" }],
        "starts": [],
        "filler_items": ["Rock"]
    });
    let config = GeneratorConfig {
        random_start: true,
        ..no_karma()
    };
    let failure = generator(&catalog, config).generate(0).unwrap_err();
    assert_eq!(failure.stage, GenerationStage::InitializingState);
    assert_eq!(failure.reason, FailureReason::NoValidStart);
}
