//! Identifiers shared across the rule engine, catalogs, and overlays.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named partition of the game world.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub String);

impl RegionId {
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Selected gameplay character/variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub String);

impl ProfileId {
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// How a profile list is interpreted by a registration or catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Only the listed profiles.
    Whitelist,
    /// Every profile except the listed ones.
    #[default]
    Blacklist,
}

/// Profile list plus its interpretation. The default selects every profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileSelection {
    #[serde(default)]
    pub mode: SelectionMode,
    #[serde(default)]
    pub profiles: Vec<ProfileId>,
}

impl ProfileSelection {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn only(profiles: &[&str]) -> Self {
        Self {
            mode: SelectionMode::Whitelist,
            profiles: profiles.iter().copied().map(ProfileId::new).collect(),
        }
    }

    #[must_use]
    pub fn except(profiles: &[&str]) -> Self {
        Self {
            mode: SelectionMode::Blacklist,
            profiles: profiles.iter().copied().map(ProfileId::new).collect(),
        }
    }

    #[must_use]
    pub fn applies_to(&self, profile: &ProfileId) -> bool {
        let listed = self.profiles.contains(profile);
        match self.mode {
            SelectionMode::Whitelist => listed,
            SelectionMode::Blacklist => !listed,
        }
    }

    /// Expand the selection against the full profile universe.
    pub fn resolve<'a>(
        &'a self,
        universe: &'a [ProfileId],
    ) -> impl Iterator<Item = &'a ProfileId> + 'a {
        universe.iter().filter(|profile| self.applies_to(profile))
    }
}

/// Comparison applied by a timeline rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineOp {
    At,
    AtOrBefore,
    AtOrAfter,
}

impl TimelineOp {
    #[must_use]
    pub const fn holds(self, active: usize, reference: usize) -> bool {
        match self {
            Self::At => active == reference,
            Self::AtOrBefore => active <= reference,
            Self::AtOrAfter => active >= reference,
        }
    }
}

impl fmt::Display for TimelineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::At => "at",
            Self::AtOrBefore => "at-or-before",
            Self::AtOrAfter => "at-or-after",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selection_covers_everyone() {
        let selection = ProfileSelection::default();
        assert!(selection.applies_to(&ProfileId::new("White")));
        assert!(selection.applies_to(&ProfileId::new("Saint")));
    }

    #[test]
    fn whitelist_and_blacklist_are_complements() {
        let universe = vec![
            ProfileId::new("White"),
            ProfileId::new("Red"),
            ProfileId::new("Saint"),
        ];
        let only = ProfileSelection::only(&["Red"]);
        let except = ProfileSelection::except(&["Red"]);
        let picked: Vec<_> = only.resolve(&universe).cloned().collect();
        let rest: Vec<_> = except.resolve(&universe).cloned().collect();
        assert_eq!(picked, vec![ProfileId::new("Red")]);
        assert_eq!(rest, vec![ProfileId::new("White"), ProfileId::new("Saint")]);
    }

    #[test]
    fn empty_whitelist_selects_nobody() {
        let selection = ProfileSelection {
            mode: SelectionMode::Whitelist,
            profiles: Vec::new(),
        };
        assert!(!selection.applies_to(&ProfileId::new("White")));
    }

    #[test]
    fn timeline_ops_compare_positions() {
        assert!(TimelineOp::At.holds(2, 2));
        assert!(!TimelineOp::At.holds(1, 2));
        assert!(TimelineOp::AtOrBefore.holds(1, 2));
        assert!(!TimelineOp::AtOrBefore.holds(3, 2));
        assert!(TimelineOp::AtOrAfter.holds(3, 2));
        assert!(!TimelineOp::AtOrAfter.holds(1, 2));
    }
}
