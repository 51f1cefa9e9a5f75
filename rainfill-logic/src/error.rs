//! Error types for configuration mistakes and failed generation runs.
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::generator::GenerationStage;
use crate::profile::{ProfileId, RegionId};

/// Content-author or programmer mistakes detected before a run starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("option rule references unknown setting `{name}`")]
    UnknownOption { name: String },
    #[error("gate `{name}` does not follow the GATE_<left>_<right> form")]
    MalformedGate { name: String },
    #[error("profile `{profile}` is not part of the profile catalog")]
    UnknownProfile { profile: ProfileId },
    #[error("region `{region}` is not part of the region catalog")]
    UnknownRegion { region: RegionId },
    #[error("location id `{id}` is declared more than once")]
    DuplicateLocation { id: String },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("starting karma {starting} exceeds karma scale {max}")]
    KarmaBounds { starting: u8, max: u8 },
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a generation run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No start region survived pruning and blacklisting.
    NoValidStart,
    /// Item and location counts could not be matched.
    BalanceExhausted { items: usize, locations: usize },
    /// Available locations ran out before every region was discovered.
    NoAvailableLocations { undiscovered: usize },
    /// Nothing placeable remained before every region was discovered.
    NoPlaceableProgression { undiscovered: usize },
    /// Locations still out of logic once all progression was placed.
    UnreachableLocations { count: usize },
    /// The worker running the generation shut down before it finished.
    Interrupted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoValidStart => f.write_str("no eligible start region"),
            Self::BalanceExhausted { items, locations } => write!(
                f,
                "cannot balance {items} items against {locations} locations"
            ),
            Self::NoAvailableLocations { undiscovered } => write!(
                f,
                "no available locations with {undiscovered} regions undiscovered"
            ),
            Self::NoPlaceableProgression { undiscovered } => write!(
                f,
                "no placeable progression with {undiscovered} regions undiscovered"
            ),
            Self::UnreachableLocations { count } => {
                write!(f, "{count} locations remain out of logic")
            }
            Self::Interrupted => f.write_str("generation worker shut down"),
        }
    }
}

/// Terminal failure of one generation run. Never carries a partial assignment.
#[derive(Debug, Clone, Error)]
#[error("generation failed during {stage}: {reason}")]
pub struct GenerationFailure {
    pub stage: GenerationStage,
    pub reason: FailureReason,
    pub trace: Vec<String>,
    pub discovered: BTreeSet<RegionId>,
    pub available: usize,
    pub unreached: usize,
}
