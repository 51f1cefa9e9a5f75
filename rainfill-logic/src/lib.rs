//! Rainfill Logic
//!
//! Rule engine and progression fill for logic-consistent item randomization.
//! Rules describe what a location needs, the world state accumulates facts as
//! items are placed, overlays let collaborators patch rules per profile, and
//! the generator assigns every item to a location so that progression is
//! always reachable before it is required.
//! This crate performs no I/O beyond parsing JSON strings handed to it.

pub mod catalog;
pub mod config;
mod constants;
pub mod error;
pub mod gate;
pub mod generator;
pub mod item;
pub mod location;
pub mod overlay;
pub mod profile;
pub mod rng;
pub mod rule;
pub mod state;

use std::sync::Arc;

// Re-export commonly used types
pub use catalog::{
    GateEntry, LocationEntry, PassageEntry, RegionEntry, StartEntry, StoryEntry, WorldCatalog,
};
pub use config::{CycleFillerConfig, GeneratorConfig, Options};
pub use error::{ConfigError, FailureReason, GenerationFailure};
pub use gate::Gate;
pub use generator::{Generation, GenerationStage, Generator};
pub use item::{Importance, Item, ItemKind};
pub use location::{Location, LocationKind};
pub use overlay::{
    ConnectionPatch, LogicPackage, LogicRegistry, NewConnection, Patch, PatchOp, Registration,
    SubRegion, combine,
};
pub use profile::{ProfileId, ProfileSelection, RegionId, SelectionMode, TimelineOp};
pub use rng::{CountingRng, derive_stream_seed};
pub use rule::{Quantifier, Rule};
pub use state::{LogicContext, NewlyAvailable, RegionKinds, RegionLink, WorldState};

/// Trait for abstracting where catalogs and overlay registrations come from.
/// Hosts provide this; the bundled [`SampleLoader`] serves the sample world.
pub trait CatalogLoader {
    type Error: std::error::Error + Send + Sync + From<ConfigError> + 'static;

    /// Load and validate the world catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or fails validation.
    fn load_catalog(&self, options: &Options) -> Result<WorldCatalog, Self::Error>;

    /// Load every overlay registration for `catalog`'s profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if a registration cannot be read or is invalid.
    fn load_registry(
        &self,
        catalog: &WorldCatalog,
        options: &Options,
    ) -> Result<LogicRegistry, Self::Error>;
}

/// Trait for persisting finished generations (spoiler logs).
pub trait SpoilerStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist `generation` under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the spoiler cannot be written.
    fn save_spoiler(&self, name: &str, generation: &Generation) -> Result<(), Self::Error>;
}

/// Loader serving the bundled sample world and overlays.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleLoader;

impl CatalogLoader for SampleLoader {
    type Error = ConfigError;

    fn load_catalog(&self, options: &Options) -> Result<WorldCatalog, Self::Error> {
        WorldCatalog::sample(options)
    }

    fn load_registry(
        &self,
        catalog: &WorldCatalog,
        options: &Options,
    ) -> Result<LogicRegistry, Self::Error> {
        catalog.sample_registry(options)
    }
}

/// Loads content once and hands out generators that share it.
#[derive(Debug)]
pub struct FillEngine<S> {
    catalog: Arc<WorldCatalog>,
    registry: Arc<LogicRegistry>,
    config: GeneratorConfig,
    spoilers: S,
}

impl<S: SpoilerStore> FillEngine<S> {
    /// Load catalog and registry through `loader`. The registry is frozen
    /// from here on.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the configuration is invalid.
    pub fn load<L: CatalogLoader>(
        loader: &L,
        config: GeneratorConfig,
        spoilers: S,
    ) -> Result<Self, L::Error> {
        config.validate()?;
        let catalog = loader.load_catalog(&config.options)?;
        let registry = loader.load_registry(&catalog, &config.options)?;
        Ok(Self {
            catalog: Arc::new(catalog),
            registry: Arc::new(registry),
            config,
            spoilers,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &WorldCatalog {
        &self.catalog
    }

    /// Generator for `profile` sharing this engine's content.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile is unknown or content disagrees with
    /// the configuration.
    pub fn generator(&self, profile: &ProfileId) -> Result<Generator, ConfigError> {
        Generator::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.registry),
            self.config.clone(),
            profile.clone(),
        )
    }

    /// Persist a finished generation under `<profile>-<seed>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the spoiler store rejects the write.
    pub fn save_spoiler(&self, generation: &Generation) -> Result<String, S::Error> {
        let name = format!("{}-{}", generation.profile, generation.seed);
        self.spoilers.save_spoiler(&name, generation)?;
        Ok(name)
    }
}
