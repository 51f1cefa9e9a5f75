//! Per-profile rule patches and structural additions.
//!
//! Collaborators register modifications against a [`LogicRegistry`] during
//! startup. Each registration selects profiles and accumulates into that
//! profile's [`LogicPackage`]. Once the registry is handed to a generator it
//! is only read.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::ops::Add;

use crate::config::Options;
use crate::error::ConfigError;
use crate::gate::Gate;
use crate::profile::{ProfileId, ProfileSelection, RegionId};
use crate::rule::Rule;

/// How a patch rule combines with the rule it modifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOp {
    Overwrite,
    #[default]
    And,
    Or,
}

/// Modification to an existing rule. A patch without a rule is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Patch {
    #[serde(default)]
    pub rule: Option<Rule>,
    #[serde(default)]
    pub op: PatchOp,
}

impl Patch {
    #[must_use]
    pub const fn new(rule: Rule, op: PatchOp) -> Self {
        Self {
            rule: Some(rule),
            op,
        }
    }

    #[must_use]
    pub const fn identity() -> Self {
        Self {
            rule: None,
            op: PatchOp::And,
        }
    }

    #[must_use]
    pub const fn overwrite(rule: Rule) -> Self {
        Self::new(rule, PatchOp::Overwrite)
    }

    #[must_use]
    pub const fn and(rule: Rule) -> Self {
        Self::new(rule, PatchOp::And)
    }

    #[must_use]
    pub const fn or(rule: Rule) -> Self {
        Self::new(rule, PatchOp::Or)
    }

    /// Apply this patch to `existing`.
    #[must_use]
    pub fn apply(&self, existing: Rule) -> Rule {
        combine(existing, self)
    }

    fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rule.iter()
    }
}

/// Combine an existing rule with a patch.
///
/// * absent patch rule: `existing` unchanged
/// * `Overwrite`: the patch rule
/// * `And`: `All([existing, patch])`
/// * `Or`: `Any([existing, patch])`
#[must_use]
pub fn combine(existing: Rule, patch: &Patch) -> Rule {
    let Some(rule) = &patch.rule else {
        return existing;
    };
    match patch.op {
        PatchOp::Overwrite => rule.clone(),
        PatchOp::And => Rule::all(vec![existing, rule.clone()]),
        PatchOp::Or => Rule::any(vec![existing, rule.clone()]),
    }
}

/// Nest `rhs` around `self`: the result's rule is `combine(self.rule, rhs)` and
/// its op is always `rhs.op`, including when `rhs` carries no rule.
impl Add for Patch {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let rule = match self.rule {
            Some(lhs) => Some(combine(lhs, &rhs)),
            None => rhs.rule,
        };
        Self { rule, op: rhs.op }
    }
}

/// Patches for the two traversal directions of a connection. `left` guards
/// travel out of the left endpoint, `right` travel out of the right endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionPatch {
    #[serde(default)]
    pub left: Patch,
    #[serde(default)]
    pub right: Patch,
}

impl ConnectionPatch {
    #[must_use]
    pub const fn new(left: Patch, right: Patch) -> Self {
        Self { left, right }
    }

    fn merge(self, later: Self) -> Self {
        Self {
            left: accumulate(Some(self.left), later.left),
            right: accumulate(Some(self.right), later.right),
        }
    }
}

/// Named slice of a parent region, reachable from it through its own rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRegion {
    pub id: RegionId,
    pub parent: RegionId,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub connections: Vec<String>,
    #[serde(default)]
    pub shelters: Vec<String>,
    /// Traversal from the parent into the sub-region.
    pub entry_rule: Rule,
    /// Traversal from the sub-region back into the parent.
    pub exit_rule: Rule,
}

/// Connection that does not exist in the base catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConnection {
    pub name: String,
    pub left: RegionId,
    pub right: RegionId,
    #[serde(default = "always")]
    pub left_rule: Rule,
    #[serde(default = "always")]
    pub right_rule: Rule,
}

const fn always() -> Rule {
    Rule::Always
}

impl NewConnection {
    #[must_use]
    pub fn gate(&self) -> Gate {
        Gate::between(&self.name, self.left.clone(), self.right.clone())
    }
}

/// Everything registered for one profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogicPackage {
    #[serde(default)]
    pub region_rules: BTreeMap<RegionId, Patch>,
    #[serde(default)]
    pub location_rules: BTreeMap<String, Patch>,
    #[serde(default)]
    pub connection_rules: BTreeMap<String, ConnectionPatch>,
    #[serde(default)]
    pub sub_regions: Vec<SubRegion>,
    #[serde(default)]
    pub new_connections: Vec<NewConnection>,
    #[serde(default)]
    pub blacklisted_starts: Vec<RegionId>,
}

impl LogicPackage {
    #[must_use]
    pub fn region_patch(&self, region: &RegionId) -> Option<&Patch> {
        self.region_rules.get(region)
    }

    #[must_use]
    pub fn location_patch(&self, id: &str) -> Option<&Patch> {
        self.location_rules.get(id)
    }

    #[must_use]
    pub fn connection_patch(&self, name: &str) -> Option<&ConnectionPatch> {
        self.connection_rules.get(name)
    }

    #[must_use]
    pub fn is_blacklisted_start(&self, region: &RegionId) -> bool {
        self.blacklisted_starts.contains(region)
    }
}

/// A later registration nests around an earlier one unless it overwrites.
/// A registration without a rule leaves the stored patch as it was.
fn accumulate(existing: Option<Patch>, later: Patch) -> Patch {
    match existing {
        Some(existing) if later.rule.is_none() => existing,
        Some(existing) if later.op != PatchOp::Overwrite => existing + later,
        _ => later,
    }
}

fn merge_patch<K: Ord>(map: &mut BTreeMap<K, Patch>, key: K, patch: Patch) {
    match map.entry(key) {
        Entry::Occupied(mut slot) => {
            let merged = accumulate(Some(slot.get().clone()), patch);
            slot.insert(merged);
        }
        Entry::Vacant(slot) => {
            slot.insert(patch);
        }
    }
}

/// One registration, as stored in an overlay file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Registration {
    RegionRule {
        region: RegionId,
        patch: Patch,
        #[serde(default)]
        selection: ProfileSelection,
    },
    LocationRule {
        location: String,
        patch: Patch,
        #[serde(default)]
        selection: ProfileSelection,
    },
    ConnectionRule {
        connection: String,
        patch: ConnectionPatch,
        #[serde(default)]
        selection: ProfileSelection,
    },
    SubRegion {
        definition: SubRegion,
        #[serde(default)]
        selection: ProfileSelection,
    },
    Connection {
        definition: NewConnection,
        #[serde(default)]
        selection: ProfileSelection,
    },
    BlacklistedStart {
        region: RegionId,
        #[serde(default)]
        selection: ProfileSelection,
    },
}

/// Registry of logic packages keyed by profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicRegistry {
    profiles: Vec<ProfileId>,
    options: Options,
    packages: BTreeMap<ProfileId, LogicPackage>,
}

impl LogicRegistry {
    /// Create an empty registry over a profile universe. `options` is the set
    /// of settings option rules may reference.
    #[must_use]
    pub fn new(profiles: Vec<ProfileId>, options: Options) -> Self {
        let packages = profiles
            .iter()
            .map(|profile| (profile.clone(), LogicPackage::default()))
            .collect();
        Self {
            profiles,
            options,
            packages,
        }
    }

    /// Build a registry from an overlay document (a JSON list of registrations
    /// applied in order).
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or any registration is invalid.
    pub fn from_json(
        profiles: Vec<ProfileId>,
        options: Options,
        json: &str,
    ) -> Result<Self, ConfigError> {
        let registrations: Vec<Registration> = serde_json::from_str(json)?;
        let mut registry = Self::new(profiles, options);
        registry.apply_all(registrations)?;
        Ok(registry)
    }

    #[must_use]
    pub fn profiles(&self) -> &[ProfileId] {
        &self.profiles
    }

    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn package(&self, profile: &ProfileId) -> Option<&LogicPackage> {
        self.packages.get(profile)
    }

    /// Apply registrations in order.
    ///
    /// # Errors
    ///
    /// Stops at the first invalid registration.
    pub fn apply_all(
        &mut self,
        registrations: impl IntoIterator<Item = Registration>,
    ) -> Result<(), ConfigError> {
        registrations
            .into_iter()
            .try_for_each(|registration| self.apply(registration))
    }

    /// Apply one registration.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown profiles, unknown option settings, or
    /// malformed connection definitions.
    pub fn apply(&mut self, registration: Registration) -> Result<(), ConfigError> {
        match registration {
            Registration::RegionRule {
                region,
                patch,
                selection,
            } => self.add_region_rule(&region, patch, &selection),
            Registration::LocationRule {
                location,
                patch,
                selection,
            } => self.add_location_rule(&location, patch, &selection),
            Registration::ConnectionRule {
                connection,
                patch,
                selection,
            } => self.add_connection_rule(&connection, patch, &selection),
            Registration::SubRegion {
                definition,
                selection,
            } => self.add_sub_region(definition, &selection),
            Registration::Connection {
                definition,
                selection,
            } => self.add_connection(definition, &selection),
            Registration::BlacklistedStart { region, selection } => {
                self.add_blacklisted_start(&region, &selection)
            }
        }
    }

    /// Patch the base rule of a region.
    ///
    /// # Errors
    ///
    /// See [`LogicRegistry::apply`].
    pub fn add_region_rule(
        &mut self,
        region: &RegionId,
        patch: Patch,
        selection: &ProfileSelection,
    ) -> Result<(), ConfigError> {
        self.validate_rules(patch.rules())?;
        self.for_each_selected(selection, |package| {
            merge_patch(&mut package.region_rules, region.clone(), patch.clone());
        })
    }

    /// Patch the rule of a location.
    ///
    /// # Errors
    ///
    /// See [`LogicRegistry::apply`].
    pub fn add_location_rule(
        &mut self,
        location: &str,
        patch: Patch,
        selection: &ProfileSelection,
    ) -> Result<(), ConfigError> {
        self.validate_rules(patch.rules())?;
        self.for_each_selected(selection, |package| {
            merge_patch(&mut package.location_rules, location.to_string(), patch.clone());
        })
    }

    /// Patch both traversal directions of a connection.
    ///
    /// # Errors
    ///
    /// See [`LogicRegistry::apply`].
    pub fn add_connection_rule(
        &mut self,
        connection: &str,
        patch: ConnectionPatch,
        selection: &ProfileSelection,
    ) -> Result<(), ConfigError> {
        self.validate_rules(patch.left.rules().chain(patch.right.rules()))?;
        self.for_each_selected(selection, |package| {
            let merged = match package.connection_rules.remove(connection) {
                Some(existing) => existing.merge(patch.clone()),
                None => patch.clone(),
            };
            package
                .connection_rules
                .insert(connection.to_string(), merged);
        })
    }

    /// Carve a sub-region out of a parent region.
    ///
    /// # Errors
    ///
    /// See [`LogicRegistry::apply`].
    pub fn add_sub_region(
        &mut self,
        definition: SubRegion,
        selection: &ProfileSelection,
    ) -> Result<(), ConfigError> {
        self.validate_rules([&definition.entry_rule, &definition.exit_rule])?;
        self.for_each_selected(selection, |package| {
            package.sub_regions.push(definition.clone());
        })
    }

    /// Add a connection missing from the base catalog.
    ///
    /// # Errors
    ///
    /// See [`LogicRegistry::apply`]. Both endpoints must differ.
    pub fn add_connection(
        &mut self,
        definition: NewConnection,
        selection: &ProfileSelection,
    ) -> Result<(), ConfigError> {
        if definition.name.is_empty() || definition.left == definition.right {
            return Err(ConfigError::MalformedGate {
                name: definition.name,
            });
        }
        self.validate_rules([&definition.left_rule, &definition.right_rule])?;
        self.for_each_selected(selection, |package| {
            package.new_connections.push(definition.clone());
        })
    }

    /// Forbid a region from being chosen as the start.
    ///
    /// # Errors
    ///
    /// See [`LogicRegistry::apply`].
    pub fn add_blacklisted_start(
        &mut self,
        region: &RegionId,
        selection: &ProfileSelection,
    ) -> Result<(), ConfigError> {
        self.for_each_selected(selection, |package| {
            if !package.blacklisted_starts.contains(region) {
                package.blacklisted_starts.push(region.clone());
            }
        })
    }

    fn validate_rules<'a>(
        &self,
        rules: impl IntoIterator<Item = &'a Rule>,
    ) -> Result<(), ConfigError> {
        rules
            .into_iter()
            .try_for_each(|rule| rule.validate(&self.options))
    }

    fn for_each_selected(
        &mut self,
        selection: &ProfileSelection,
        mut mutate: impl FnMut(&mut LogicPackage),
    ) -> Result<(), ConfigError> {
        if let Some(unknown) = selection
            .profiles
            .iter()
            .find(|profile| !self.packages.contains_key(*profile))
        {
            return Err(ConfigError::UnknownProfile {
                profile: unknown.clone(),
            });
        }
        for profile in &self.profiles {
            if selection.applies_to(profile)
                && let Some(package) = self.packages.get_mut(profile)
            {
                mutate(package);
            }
        }
        Ok(())
    }
}
