//! Multi-stage fill pipeline: initialization, balancing, progression
//! placement, and filler placement.
mod balance;
mod fill;
mod init;
mod session;
mod trace;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::catalog::WorldCatalog;
use crate::config::GeneratorConfig;
use crate::error::{ConfigError, FailureReason, GenerationFailure};
use crate::gate::Gate;
use crate::item::Item;
use crate::overlay::LogicRegistry;
use crate::profile::{ProfileId, RegionId};
use crate::rng::CountingRng;
use session::GenerationSession;
use trace::Trace;

/// Position of a run in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    #[default]
    NotStarted,
    InitializingState,
    BalancingItems,
    PlacingProgression,
    PlacingFillerGates,
    PlacingFiller,
    Complete,
    Failed,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not started",
            Self::InitializingState => "initializing state",
            Self::BalancingItems => "balancing items",
            Self::PlacingProgression => "placing progression",
            Self::PlacingFillerGates => "placing filler gates",
            Self::PlacingFiller => "placing filler",
            Self::Complete => "complete",
            Self::Failed => "failed",
        })
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub seed: u64,
    pub profile: ProfileId,
    pub start: RegionId,
    /// Location id to assigned item.
    pub assignments: BTreeMap<String, Item>,
    /// Gates opened during balancing instead of being placed.
    pub pre_opened: Vec<Gate>,
    /// Gates open from the start for this profile.
    pub force_opened: Vec<Gate>,
    pub discovered: BTreeSet<RegionId>,
    /// Regions that exist for this run.
    pub regions: BTreeSet<RegionId>,
    /// Number of locations built for this run.
    pub locations: usize,
    /// Pool items left without a location.
    pub unplaced: Vec<Item>,
    pub rng_draws: u64,
    pub trace: Vec<String>,
}

impl Generation {
    /// Item placed at `location`, if any.
    #[must_use]
    pub fn item_at(&self, location: &str) -> Option<&Item> {
        self.assignments.get(location)
    }

    /// Every location holds an item, every region of the run was discovered,
    /// and the pool was emptied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.assignments.len() == self.locations
            && self.discovered == self.regions
            && self.unplaced.is_empty()
    }

    /// Location holding the item with id `item`, if any.
    #[must_use]
    pub fn location_of(&self, item: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|(_, placed)| placed.id == item)
            .map(|(location, _)| location.as_str())
    }
}

/// Runs the fill pipeline for one profile. Cheap to clone; the catalog and
/// registry are shared read-only.
#[derive(Debug, Clone)]
pub struct Generator {
    catalog: Arc<WorldCatalog>,
    registry: Arc<LogicRegistry>,
    config: GeneratorConfig,
    profile: ProfileId,
}

impl Generator {
    /// Build a generator after checking that the configuration, catalog, and
    /// registry agree with each other.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid, the profile
    /// is not in the catalog, or a rule references an unknown option.
    pub fn new(
        catalog: Arc<WorldCatalog>,
        registry: Arc<LogicRegistry>,
        config: GeneratorConfig,
        profile: ProfileId,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if !catalog.has_profile(&profile) {
            return Err(ConfigError::UnknownProfile { profile });
        }
        catalog.validate(&config.options)?;
        if let Some(name) = registry
            .options()
            .keys()
            .find(|name| !config.options.contains_key(*name))
        {
            return Err(ConfigError::UnknownOption { name: name.clone() });
        }
        Ok(Self {
            catalog,
            registry,
            config,
            profile,
        })
    }

    #[must_use]
    pub const fn profile(&self) -> &ProfileId {
        &self.profile
    }

    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Run the pipeline on the stream derived from `seed`.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationFailure`] if the run cannot complete.
    pub fn generate(&self, seed: u64) -> Result<Generation, GenerationFailure> {
        let mut rng = CountingRng::for_fill(seed);
        self.run(seed, &mut rng)
    }

    /// Run the pipeline on a caller-supplied random stream. `seed` is only
    /// recorded in the result.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationFailure`] if the run cannot complete.
    pub fn generate_with_rng<R: RngCore + ?Sized>(
        &self,
        seed: u64,
        rng: &mut R,
    ) -> Result<Generation, GenerationFailure> {
        let mut rng = CountingRng::wrap(rng);
        self.run(seed, &mut rng)
    }

    /// Run [`Generator::generate`] on the blocking pool and await it.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationFailure`] if the run cannot complete or the
    /// worker was shut down before finishing.
    #[cfg(feature = "async")]
    pub async fn generate_async(&self, seed: u64) -> Result<Generation, GenerationFailure> {
        let generator = self.clone();
        match tokio::task::spawn_blocking(move || generator.generate(seed)).await {
            Ok(result) => result,
            Err(err) => match err.try_into_panic() {
                Ok(payload) => std::panic::resume_unwind(payload),
                Err(_) => Err(Trace::default().fail(FailureReason::Interrupted, None)),
            },
        }
    }

    fn run<R: RngCore>(
        &self,
        seed: u64,
        rng: &mut CountingRng<R>,
    ) -> Result<Generation, GenerationFailure> {
        let mut trace = Trace::default();
        trace.enter(GenerationStage::InitializingState);
        trace.record(format!("seed {seed}"));
        let mut session = match init::initialize(self, rng, &mut trace) {
            Ok(session) => session,
            Err(reason) => return Err(trace.fail(reason, None)),
        };

        if let Err(reason) = self.drive(&mut session, rng, &mut trace) {
            return Err(trace.fail(reason, Some(&session.state)));
        }

        trace.enter(GenerationStage::Complete);
        let locations = session.state.locations().len();
        let regions = session.state.context().regions.clone();
        let assignments = session
            .placements
            .into_iter()
            .map(|(idx, item)| (session.state.location(idx).id.clone(), item))
            .collect();
        Ok(Generation {
            seed,
            profile: self.profile.clone(),
            start: session.start,
            assignments,
            pre_opened: session.pre_opened,
            force_opened: session.force_opened,
            discovered: session.state.discovered_regions().clone(),
            regions,
            locations,
            unplaced: session.pool,
            rng_draws: rng.draws(),
            trace: trace.into_entries(),
        })
    }

    fn drive<R: RngCore>(
        &self,
        session: &mut GenerationSession,
        rng: &mut R,
        trace: &mut Trace,
    ) -> Result<(), FailureReason> {
        trace.enter(GenerationStage::BalancingItems);
        session.balance(
            &self.config,
            &self.profile,
            &self.catalog.filler_items,
            rng,
            trace,
        )?;

        trace.enter(GenerationStage::PlacingProgression);
        session.place_progression(self.config.other_progression_chance, rng, trace)?;

        trace.enter(GenerationStage::PlacingFillerGates);
        session.place_filler_gates(rng, trace)?;

        trace.enter(GenerationStage::PlacingFiller);
        session.place_filler(rng, trace);
        Ok(())
    }
}
