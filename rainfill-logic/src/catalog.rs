//! Content catalogs supplied by the host: regions, gates, collectibles,
//! story unlocks, passages, and start candidates.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::Options;
use crate::constants::PASSAGE_LOCATION_PREFIX;
use crate::error::ConfigError;
use crate::gate::Gate;
use crate::location::LocationKind;
use crate::overlay::LogicRegistry;
use crate::profile::{ProfileId, ProfileSelection, RegionId};
use crate::rule::Rule;
use crate::state::RegionKinds;

const SAMPLE_WORLD_JSON: &str = include_str!("../data/sample_world.json");
const SAMPLE_OVERLAYS_JSON: &str = include_str!("../data/sample_overlays.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEntry {
    pub id: RegionId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub profiles: ProfileSelection,
    #[serde(flatten)]
    pub kinds: RegionKinds,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateEntry {
    pub name: String,
    #[serde(default)]
    pub profiles: ProfileSelection,
    /// Profiles for which the gate is always open and never an item.
    #[serde(default)]
    pub force_open: Vec<ProfileId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEntry {
    pub id: String,
    pub kind: LocationKind,
    pub region: RegionId,
    #[serde(default)]
    pub profiles: ProfileSelection,
    /// Content-specific requirement combined with the region rule.
    #[serde(default)]
    pub requires: Option<Rule>,
}

/// Story or ability unlock that becomes a progression item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryEntry {
    pub id: String,
    #[serde(default)]
    pub profiles: ProfileSelection,
}

/// Passage achievement: a region-less location plus a filler token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageEntry {
    pub id: String,
    #[serde(default)]
    pub excluded: Vec<ProfileId>,
    #[serde(default)]
    pub requires: Option<Rule>,
}

impl PassageEntry {
    #[must_use]
    pub fn applies_to(&self, profile: &ProfileId) -> bool {
        !self.excluded.contains(profile)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartEntry {
    pub region: RegionId,
    #[serde(default)]
    pub profiles: ProfileSelection,
}

/// Everything the generator needs to know about the host's content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorldCatalog {
    pub profiles: Vec<ProfileId>,
    /// Profiles ordered along the story timeline.
    #[serde(default)]
    pub timeline: Vec<ProfileId>,
    pub regions: Vec<RegionEntry>,
    #[serde(default)]
    pub gates: Vec<GateEntry>,
    #[serde(default)]
    pub locations: Vec<LocationEntry>,
    #[serde(default)]
    pub story_items: Vec<StoryEntry>,
    #[serde(default)]
    pub passages: Vec<PassageEntry>,
    #[serde(default)]
    pub starts: Vec<StartEntry>,
    /// Fixed start per profile used when random starts are disabled.
    #[serde(default)]
    pub default_starts: BTreeMap<ProfileId, RegionId>,
    /// Generic filler names used to pad the item pool.
    #[serde(default)]
    pub filler_items: Vec<String>,
}

impl WorldCatalog {
    /// Parse and validate a catalog document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the catalog is inconsistent.
    pub fn from_json(json: &str, options: &Options) -> Result<Self, ConfigError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate(options)?;
        Ok(catalog)
    }

    /// The bundled sample world.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled sample fails validation against `options`.
    pub fn sample(options: &Options) -> Result<Self, ConfigError> {
        Self::from_json(SAMPLE_WORLD_JSON, options)
    }

    /// Registry built from the bundled sample overlay file.
    ///
    /// # Errors
    ///
    /// Returns an error if a sample registration is invalid for `options`.
    pub fn sample_registry(&self, options: &Options) -> Result<LogicRegistry, ConfigError> {
        LogicRegistry::from_json(self.profiles.clone(), options.clone(), SAMPLE_OVERLAYS_JSON)
    }

    /// Check catalog consistency: gate names parse, referenced profiles and
    /// regions exist, location ids are unique, and every option rule names a
    /// known setting.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self, options: &Options) -> Result<(), ConfigError> {
        let profiles: BTreeSet<&ProfileId> = self.profiles.iter().collect();
        let check_profile = |profile: &ProfileId| {
            if profiles.contains(profile) {
                Ok(())
            } else {
                Err(ConfigError::UnknownProfile {
                    profile: profile.clone(),
                })
            }
        };
        let regions: BTreeSet<&RegionId> = self.regions.iter().map(|entry| &entry.id).collect();
        let check_region = |region: &RegionId| {
            if regions.contains(region) {
                Ok(())
            } else {
                Err(ConfigError::UnknownRegion {
                    region: region.clone(),
                })
            }
        };

        self.timeline.iter().try_for_each(check_profile)?;
        for entry in &self.regions {
            entry.profiles.profiles.iter().try_for_each(check_profile)?;
        }
        for entry in &self.gates {
            let gate = Gate::parse(&entry.name)?;
            check_region(&gate.left)?;
            check_region(&gate.right)?;
            entry.profiles.profiles.iter().try_for_each(check_profile)?;
            entry.force_open.iter().try_for_each(check_profile)?;
        }

        let mut seen = BTreeSet::new();
        for entry in &self.locations {
            if !seen.insert(entry.id.clone()) {
                return Err(ConfigError::DuplicateLocation {
                    id: entry.id.clone(),
                });
            }
            check_region(&entry.region)?;
            entry.profiles.profiles.iter().try_for_each(check_profile)?;
            if let Some(rule) = &entry.requires {
                rule.validate(options)?;
            }
        }
        for entry in &self.story_items {
            entry.profiles.profiles.iter().try_for_each(check_profile)?;
        }
        // Passage checks share the location namespace.
        for entry in &self.passages {
            let id = format!("{PASSAGE_LOCATION_PREFIX}{}", entry.id);
            if !seen.insert(id.clone()) {
                return Err(ConfigError::DuplicateLocation { id });
            }
            entry.excluded.iter().try_for_each(check_profile)?;
            if let Some(rule) = &entry.requires {
                rule.validate(options)?;
            }
        }
        for entry in &self.starts {
            check_region(&entry.region)?;
            entry.profiles.profiles.iter().try_for_each(check_profile)?;
        }
        for (profile, region) in &self.default_starts {
            check_profile(profile)?;
            check_region(region)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn has_profile(&self, profile: &ProfileId) -> bool {
        self.profiles.contains(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Options {
        let mut options = Options::new();
        options.insert("passage_checks".into(), true);
        options
    }

    #[test]
    fn sample_catalog_parses_and_validates() {
        let catalog = WorldCatalog::sample(&options()).unwrap();
        assert!(catalog.has_profile(&ProfileId::new("White")));
        assert!(!catalog.regions.is_empty());
        assert!(!catalog.gates.is_empty());
        assert!(catalog.sample_registry(&options()).is_ok());
    }

    #[test]
    fn malformed_gate_is_a_config_error() {
        let json = r#"{
            "profiles": ["White"],
            "regions": [{"id": "SU"}, {"id": "HI"}],
            "gates": [{"name": "SU_HI"}]
        }"#;
        let err = WorldCatalog::from_json(json, &Options::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedGate { name } if name == "SU_HI"));
    }

    #[test]
    fn gate_to_unknown_region_is_rejected() {
        let json = r#"{
            "profiles": ["White"],
            "regions": [{"id": "SU"}],
            "gates": [{"name": "GATE_SU_HI"}]
        }"#;
        let err = WorldCatalog::from_json(json, &Options::new()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRegion { .. }));
    }

    #[test]
    fn duplicate_location_ids_are_rejected() {
        let json = r#"{
            "profiles": ["White"],
            "regions": [{"id": "SU"}],
            "locations": [
                {"id": "Pearl-SU", "kind": "pearl", "region": "SU"},
                {"id": "Pearl-SU", "kind": "pearl", "region": "SU"}
            ]
        }"#;
        let err = WorldCatalog::from_json(json, &Options::new()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateLocation { .. }));
    }

    #[test]
    fn passage_check_colliding_with_location_is_rejected() {
        let json = r#"{
            "profiles": ["White"],
            "regions": [{"id": "SU"}],
            "locations": [
                {"id": "Passage-Traveller", "kind": "misc", "region": "SU"}
            ],
            "passages": [{"id": "Traveller"}]
        }"#;
        let err = WorldCatalog::from_json(json, &Options::new()).unwrap_err();
        assert!(
            matches!(err, ConfigError::DuplicateLocation { id } if id == "Passage-Traveller")
        );
    }

    #[test]
    fn duplicate_passages_are_rejected() {
        let json = r#"{
            "profiles": ["White"],
            "regions": [{"id": "SU"}],
            "passages": [{"id": "Traveller"}, {"id": "Traveller"}]
        }"#;
        let err = WorldCatalog::from_json(json, &Options::new()).unwrap_err();
        assert!(
            matches!(err, ConfigError::DuplicateLocation { id } if id == "Passage-Traveller")
        );
    }

    #[test]
    fn unknown_option_in_requirement_is_rejected() {
        let json = r#"{
            "profiles": ["White"],
            "regions": [{"id": "SU"}],
            "locations": [
                {"id": "Token-SU", "kind": "token", "region": "SU",
                 "requires": {"option": {"name": "missing", "inverted": false}}}
            ]
        }"#;
        let err = WorldCatalog::from_json(json, &Options::new()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOption { .. }));
    }

    #[test]
    fn region_kinds_flatten_into_entry() {
        let json = r#"{
            "profiles": ["White"],
            "regions": [{"id": "SU", "creatures": ["Lizard"], "objects": ["Spear"]}]
        }"#;
        let catalog = WorldCatalog::from_json(json, &Options::new()).unwrap();
        assert_eq!(catalog.regions[0].kinds.creatures, vec!["Lizard".to_string()]);
        assert_eq!(catalog.regions[0].kinds.objects, vec!["Spear".to_string()]);
    }
}
