//! Generator configuration and feature toggles.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{
    DEFAULT_CYCLE_FILLER_DENSITY, DEFAULT_MAX_KARMA, DEFAULT_MIN_PASSAGE_TOKENS,
    DEFAULT_OTHER_PROGRESSION_CHANCE, DEFAULT_STARTING_KARMA,
};
use crate::error::ConfigError;
use crate::profile::ProfileId;

const SAMPLE_CONFIG_JSON: &str = include_str!("../data/sample_config.json");

/// Boolean feature toggles read by option rules.
pub type Options = BTreeMap<String, bool>;

/// Profile-specific cycle-count filler used first when padding the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleFillerConfig {
    #[serde(default)]
    pub profiles: Vec<ProfileId>,
    /// Fraction of the location count that cycle filler may occupy.
    #[serde(default = "CycleFillerConfig::default_density")]
    pub density: f64,
}

impl CycleFillerConfig {
    const fn default_density() -> f64 {
        DEFAULT_CYCLE_FILLER_DENSITY
    }

    /// Maximum number of cycle filler items for a pool of `locations`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn cap(&self, locations: usize) -> usize {
        (self.density * locations as f64).floor().max(0.0) as usize
    }
}

impl Default for CycleFillerConfig {
    fn default() -> Self {
        Self {
            profiles: Vec::new(),
            density: Self::default_density(),
        }
    }
}

/// Tuning for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Chance of drawing from non-gate progression when both buckets are open.
    #[serde(default = "GeneratorConfig::default_other_progression_chance")]
    pub other_progression_chance: f64,
    #[serde(default)]
    pub random_start: bool,
    /// Passage tokens kept in the pool when trimming excess items.
    #[serde(default = "GeneratorConfig::default_min_passage_tokens")]
    pub min_passage_tokens: usize,
    #[serde(default = "GeneratorConfig::default_filler_enabled")]
    pub filler_enabled: bool,
    #[serde(default)]
    pub cycle_filler: CycleFillerConfig,
    #[serde(default = "GeneratorConfig::default_starting_karma")]
    pub starting_karma: u8,
    #[serde(default = "GeneratorConfig::default_max_karma")]
    pub max_karma: u8,
    #[serde(default)]
    pub options: Options,
}

impl GeneratorConfig {
    const fn default_other_progression_chance() -> f64 {
        DEFAULT_OTHER_PROGRESSION_CHANCE
    }

    const fn default_min_passage_tokens() -> usize {
        DEFAULT_MIN_PASSAGE_TOKENS
    }

    const fn default_filler_enabled() -> bool {
        true
    }

    const fn default_starting_karma() -> u8 {
        DEFAULT_STARTING_KARMA
    }

    const fn default_max_karma() -> u8 {
        DEFAULT_MAX_KARMA
    }

    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Configuration matching the bundled sample world.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled document fails validation.
    pub fn sample() -> Result<Self, ConfigError> {
        Self::from_json(SAMPLE_CONFIG_JSON)
    }

    /// Number of karma-increase items added to the pool.
    #[must_use]
    pub const fn karma_items(&self) -> usize {
        self.max_karma.saturating_sub(self.starting_karma) as usize
    }

    #[must_use]
    pub fn with_option(mut self, name: &str, value: bool) -> Self {
        self.options.insert(name.to_string(), value);
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_unit(
            "other_progression_chance",
            self.other_progression_chance,
        )?;
        validate_unit("cycle_filler.density", self.cycle_filler.density)?;
        if self.max_karma == 0 {
            return Err(ConfigError::RangeViolation {
                field: "max_karma",
                min: 1.0,
                max: f64::from(u8::MAX),
                value: 0.0,
            });
        }
        if self.starting_karma > self.max_karma {
            return Err(ConfigError::KarmaBounds {
                starting: self.starting_karma,
                max: self.max_karma,
            });
        }
        Ok(())
    }
}

fn validate_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RangeViolation {
            field,
            min: 0.0,
            max: 1.0,
            value,
        })
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            other_progression_chance: Self::default_other_progression_chance(),
            random_start: false,
            min_passage_tokens: Self::default_min_passage_tokens(),
            filler_enabled: Self::default_filler_enabled(),
            cycle_filler: CycleFillerConfig::default(),
            starting_karma: Self::default_starting_karma(),
            max_karma: Self::default_max_karma(),
            options: Options::new(),
        }
    }
}
