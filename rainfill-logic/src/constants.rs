//! Centralized tuning constants for rule evaluation and fill.
//!
//! These values define the deterministic behaviour of a generation run.
//! Per-run tuning lives in `GeneratorConfig`; the constants below are its
//! defaults and the fixed names the pipeline relies on.

// Identifiers ---------------------------------------------------------------
pub(crate) const GATE_PREFIX: &str = "GATE_";
pub(crate) const FALLBACK_START_REGION: &str = "SU";
pub(crate) const KARMA_ITEM_ID: &str = "Karma";
pub(crate) const CYCLE_FILLER_ITEM_ID: &str = "Cycle Bonus";
pub(crate) const PASSAGE_LOCATION_PREFIX: &str = "Passage-";
pub(crate) const PASSAGE_TOKEN_PREFIX: &str = "Passage Token-";
pub(crate) const DUPLICATE_GATE_SUFFIX: &str = " (copy)";

// RNG stream domain tags -----------------------------------------------------
pub(crate) const RNG_DOMAIN_FILL: &[u8] = b"fill";

// Generator defaults ---------------------------------------------------------
pub(crate) const DEFAULT_OTHER_PROGRESSION_CHANCE: f64 = 0.6;
pub(crate) const DEFAULT_CYCLE_FILLER_DENSITY: f64 = 0.1;
pub(crate) const DEFAULT_STARTING_KARMA: u8 = 5;
pub(crate) const DEFAULT_MAX_KARMA: u8 = 10;
pub(crate) const DEFAULT_MIN_PASSAGE_TOKENS: usize = 0;
