//! Filesystem-backed catalog loading and spoiler persistence.
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use rainfill_logic::{
    CatalogLoader, ConfigError, Generation, LogicRegistry, Options, SpoilerStore, WorldCatalog,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to encode spoiler `{name}`: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

fn read(path: &Path) -> Result<String, StorageError> {
    fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the world catalog and overlay document from disk, falling back to
/// the bundled sample world when no catalog path is given.
#[derive(Debug, Clone, Default)]
pub struct FsCatalogLoader {
    pub catalog: Option<PathBuf>,
    pub overlays: Option<PathBuf>,
}

impl CatalogLoader for FsCatalogLoader {
    type Error = StorageError;

    fn load_catalog(&self, options: &Options) -> Result<WorldCatalog, Self::Error> {
        match &self.catalog {
            Some(path) => {
                log::debug!("loading catalog from {}", path.display());
                Ok(WorldCatalog::from_json(&read(path)?, options)?)
            }
            None => Ok(WorldCatalog::sample(options)?),
        }
    }

    fn load_registry(
        &self,
        catalog: &WorldCatalog,
        options: &Options,
    ) -> Result<LogicRegistry, Self::Error> {
        match (&self.overlays, &self.catalog) {
            (Some(path), _) => {
                log::debug!("loading overlays from {}", path.display());
                Ok(LogicRegistry::from_json(
                    catalog.profiles.clone(),
                    options.clone(),
                    &read(path)?,
                )?)
            }
            // Sample overlays only make sense against the sample catalog.
            (None, None) => Ok(catalog.sample_registry(options)?),
            (None, Some(_)) => Ok(LogicRegistry::new(
                catalog.profiles.clone(),
                options.clone(),
            )),
        }
    }
}

/// Writes each spoiler as pretty JSON to `<dir>/<name>.json`. Without a
/// directory nothing is written.
#[derive(Debug, Clone, Default)]
pub struct DirSpoilerStore {
    dir: Option<PathBuf>,
}

impl DirSpoilerStore {
    #[must_use]
    pub const fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    #[must_use]
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(format!("{name}.json")))
    }
}

impl SpoilerStore for DirSpoilerStore {
    type Error = StorageError;

    fn save_spoiler(&self, name: &str, generation: &Generation) -> Result<(), Self::Error> {
        let (Some(dir), Some(path)) = (&self.dir, self.path_for(name)) else {
            return Ok(());
        };
        fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        let json =
            serde_json::to_string_pretty(generation).map_err(|source| StorageError::Encode {
                name: name.to_string(),
                source,
            })?;
        fs::write(&path, json).map_err(|source| StorageError::Io { path, source })
    }
}
