//! Boolean access rules evaluated against a [`WorldState`].
//!
//! Every rule answers two questions:
//!
//! * [`Rule::is_met`]: satisfied by the facts accumulated so far.
//! * [`Rule::is_possible`]: satisfiable at all for the active profile,
//!   ignoring progress. Content whose rule is not possible is pruned.
//!
//! `is_met` must be monotonic in the state's facts: adding a region, gate,
//! flag, or karma never turns a met rule back into an unmet one.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Options;
use crate::error::ConfigError;
use crate::profile::{ProfileId, RegionId, TimelineOp};
use crate::state::WorldState;

/// Quantifier applied by a compound rule over its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    All,
    Any,
    AtLeast(usize),
}

impl Quantifier {
    /// Apply the quantifier to a sequence of child results.
    ///
    /// `All` over nothing is true, `Any` over nothing is false, and
    /// `AtLeast(k)` over nothing is false for every `k > 0`.
    pub fn apply(self, mut results: impl Iterator<Item = bool>) -> bool {
        match self {
            Self::All => results.all(|met| met),
            Self::Any => results.any(|met| met),
            Self::AtLeast(needed) => {
                if needed == 0 {
                    return true;
                }
                let mut count = 0;
                for met in results {
                    if met {
                        count += 1;
                        if count >= needed {
                            return true;
                        }
                    }
                }
                false
            }
        }
    }
}

/// Access rule attached to a location, region, or gate traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Unconditional access.
    Always,
    /// Content that can never exist for this run.
    Never,
    /// Named "other progression" unlock (story flag, ability).
    Flag(String),
    Region(RegionId),
    Karma(u8),
    Gate(String),
    Creature(String),
    Object(String),
    /// Echo encounter; reachable exactly when its region is.
    Echo { echo: String, region: RegionId },
    Profile(ProfileId),
    Timeline { reference: ProfileId, op: TimelineOp },
    Option { name: String, inverted: bool },
    Compound { op: Quantifier, children: Vec<Rule> },
}

impl Rule {
    /// Free access when `name` is empty, otherwise a named flag.
    #[must_use]
    pub fn wildcard(name: &str) -> Self {
        if name.is_empty() {
            Self::Always
        } else {
            Self::Flag(name.to_string())
        }
    }

    #[must_use]
    pub fn region(region: &str) -> Self {
        Self::Region(RegionId::new(region))
    }

    #[must_use]
    pub fn gate(name: &str) -> Self {
        Self::Gate(name.to_string())
    }

    #[must_use]
    pub fn echo(echo: &str, region: &str) -> Self {
        Self::Echo {
            echo: echo.to_string(),
            region: RegionId::new(region),
        }
    }

    #[must_use]
    pub fn profile(profile: &str) -> Self {
        Self::Profile(ProfileId::new(profile))
    }

    #[must_use]
    pub fn timeline(reference: &str, op: TimelineOp) -> Self {
        Self::Timeline {
            reference: ProfileId::new(reference),
            op,
        }
    }

    /// Rule reading a boolean setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownOption`] when `name` is not a known setting.
    pub fn option(name: &str, inverted: bool, options: &Options) -> Result<Self, ConfigError> {
        if !options.contains_key(name) {
            return Err(ConfigError::UnknownOption {
                name: name.to_string(),
            });
        }
        Ok(Self::Option {
            name: name.to_string(),
            inverted,
        })
    }

    #[must_use]
    pub const fn all(children: Vec<Self>) -> Self {
        Self::Compound {
            op: Quantifier::All,
            children,
        }
    }

    #[must_use]
    pub const fn any(children: Vec<Self>) -> Self {
        Self::Compound {
            op: Quantifier::Any,
            children,
        }
    }

    #[must_use]
    pub const fn at_least(needed: usize, children: Vec<Self>) -> Self {
        Self::Compound {
            op: Quantifier::AtLeast(needed),
            children,
        }
    }

    /// True under the facts accumulated in `state` so far.
    #[must_use]
    pub fn is_met(&self, state: &WorldState) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Flag(name) => state.has_flag(name),
            Self::Region(region) | Self::Echo { region, .. } => state.has_region(region),
            Self::Karma(needed) => state.karma_cap() >= *needed,
            Self::Gate(name) => state.has_gate(name),
            Self::Creature(kind) => state.has_creature(kind),
            Self::Object(kind) => state.has_object(kind),
            Self::Profile(_) | Self::Timeline { .. } | Self::Option { .. } => true,
            Self::Compound { op, children } => {
                op.apply(children.iter().map(|child| child.is_met(state)))
            }
        }
    }

    /// True if the rule can be satisfied at all for the active profile.
    #[must_use]
    pub fn is_possible(&self, state: &WorldState) -> bool {
        let context = state.context();
        match self {
            Self::Never => false,
            Self::Always
            | Self::Flag(_)
            | Self::Gate(_)
            | Self::Creature(_)
            | Self::Object(_) => true,
            Self::Region(region) | Self::Echo { region, .. } => context.is_valid_region(region),
            Self::Karma(needed) => *needed > 0 && *needed <= context.max_karma,
            Self::Profile(profile) => &context.profile == profile,
            Self::Timeline { reference, op } => {
                match (
                    context.timeline_position(&context.profile),
                    context.timeline_position(reference),
                ) {
                    (Some(active), Some(reference)) => op.holds(active, reference),
                    _ => false,
                }
            }
            Self::Option { name, inverted } => context
                .options
                .get(name)
                .is_some_and(|value| *value != *inverted),
            Self::Compound { op, children } => {
                op.apply(children.iter().map(|child| child.is_possible(state)))
            }
        }
    }

    /// Reject option rules that reference settings missing from `options`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::UnknownOption`] found in the tree.
    pub fn validate(&self, options: &Options) -> Result<(), ConfigError> {
        match self {
            Self::Option { name, .. } if !options.contains_key(name) => {
                Err(ConfigError::UnknownOption { name: name.clone() })
            }
            Self::Compound { children, .. } => children
                .iter()
                .try_for_each(|child| child.validate(options)),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::Never => f.write_str("Never"),
            Self::Flag(name) => write!(f, "Flag({name})"),
            Self::Region(region) => write!(f, "Region({region})"),
            Self::Karma(needed) => write!(f, "Karma({needed})"),
            Self::Gate(name) => write!(f, "Gate({name})"),
            Self::Creature(kind) => write!(f, "Creature({kind})"),
            Self::Object(kind) => write!(f, "Object({kind})"),
            Self::Echo { echo, region } => write!(f, "Echo({echo}@{region})"),
            Self::Profile(profile) => write!(f, "Profile({profile})"),
            Self::Timeline { reference, op } => write!(f, "Timeline({op} {reference})"),
            Self::Option { name, inverted } => {
                if *inverted {
                    write!(f, "Option(!{name})")
                } else {
                    write!(f, "Option({name})")
                }
            }
            Self::Compound { op, children } => {
                match op {
                    Quantifier::All => f.write_str("All(")?,
                    Quantifier::Any => f.write_str("Any(")?,
                    Quantifier::AtLeast(needed) => write!(f, "AtLeast({needed}: ")?,
                }
                for (idx, child) in children.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LogicContext;

    fn state() -> WorldState {
        let context = LogicContext::new(ProfileId::new("Yellow"))
            .with_timeline(vec![
                ProfileId::new("Spear"),
                ProfileId::new("Yellow"),
                ProfileId::new("Saint"),
            ])
            .with_regions(["SU", "HI", "DS"].map(RegionId::new))
            .with_option("allow_echoes", true)
            .with_option("hard_mode", false);
        WorldState::new(context, Vec::new(), 3)
    }

    fn flags(values: &[bool]) -> Vec<Rule> {
        values
            .iter()
            .map(|met| if *met { Rule::Always } else { Rule::Never })
            .collect()
    }

    #[test]
    fn compound_quantifiers_match_truth_table() {
        let state = state();
        assert!(Rule::all(flags(&[true, true])).is_met(&state));
        assert!(!Rule::all(flags(&[true, false])).is_met(&state));
        assert!(!Rule::any(flags(&[false, false])).is_met(&state));
        assert!(Rule::any(flags(&[false, true])).is_met(&state));
        assert!(Rule::at_least(2, flags(&[true, true, false])).is_met(&state));
        assert!(!Rule::at_least(2, flags(&[true, false, false])).is_met(&state));
    }

    #[test]
    fn compound_quantifiers_pin_empty_lists() {
        let state = state();
        assert!(Rule::all(Vec::new()).is_met(&state));
        assert!(!Rule::any(Vec::new()).is_met(&state));
        assert!(!Rule::at_least(1, Vec::new()).is_met(&state));
        assert!(!Rule::at_least(3, Vec::new()).is_met(&state));
        assert!(Rule::all(Vec::new()).is_possible(&state));
        assert!(!Rule::any(Vec::new()).is_possible(&state));
    }

    #[test]
    fn wildcard_empty_name_is_free() {
        let state = state();
        assert_eq!(Rule::wildcard(""), Rule::Always);
        assert!(Rule::wildcard("").is_met(&state));
        assert!(!Rule::wildcard("The Mark").is_met(&state));
        assert!(Rule::wildcard("The Mark").is_possible(&state));
        assert!(!Rule::Never.is_possible(&state));
    }

    #[test]
    fn region_rules_follow_discovery_and_validity() {
        let mut state = state();
        let rule = Rule::region("HI");
        assert!(rule.is_possible(&state));
        assert!(!rule.is_met(&state));
        state.add_region(&RegionId::new("HI"));
        assert!(rule.is_met(&state));
        assert!(!Rule::region("UW").is_possible(&state));
        assert!(Rule::echo("Echo-HI", "HI").is_met(&state));
        assert!(!Rule::echo("Echo-UW", "UW").is_possible(&state));
    }

    #[test]
    fn karma_possible_only_within_scale() {
        let state = state();
        assert!(Rule::Karma(3).is_met(&state));
        assert!(!Rule::Karma(4).is_met(&state));
        assert!(!Rule::Karma(0).is_possible(&state));
        assert!(Rule::Karma(10).is_possible(&state));
        assert!(!Rule::Karma(11).is_possible(&state));
    }

    #[test]
    fn profile_and_timeline_only_affect_possibility() {
        let state = state();
        assert!(Rule::profile("Saint").is_met(&state));
        assert!(!Rule::profile("Saint").is_possible(&state));
        assert!(Rule::profile("Yellow").is_possible(&state));
        assert!(Rule::timeline("Saint", TimelineOp::AtOrBefore).is_possible(&state));
        assert!(!Rule::timeline("Spear", TimelineOp::AtOrBefore).is_possible(&state));
        assert!(Rule::timeline("Spear", TimelineOp::AtOrAfter).is_possible(&state));
        assert!(Rule::timeline("Yellow", TimelineOp::At).is_possible(&state));
        assert!(!Rule::timeline("Inv", TimelineOp::At).is_possible(&state));
    }

    #[test]
    fn option_rules_read_settings_and_invert() {
        let state = state();
        let options = state.context().options.clone();
        let echoes = Rule::option("allow_echoes", false, &options).unwrap();
        let no_hard = Rule::option("hard_mode", true, &options).unwrap();
        let hard = Rule::option("hard_mode", false, &options).unwrap();
        assert!(echoes.is_possible(&state));
        assert!(no_hard.is_possible(&state));
        assert!(!hard.is_possible(&state));
        assert!(hard.is_met(&state));
    }

    #[test]
    fn option_construction_rejects_unknown_setting() {
        let state = state();
        let err = Rule::option("missing", false, &state.context().options).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOption { name } if name == "missing"));

        let nested = Rule::any(vec![
            Rule::Always,
            Rule::Option {
                name: "ghost".to_string(),
                inverted: false,
            },
        ]);
        assert!(nested.validate(&state.context().options).is_err());
        assert!(Rule::all(vec![Rule::Always]).validate(&state.context().options).is_ok());
    }

    #[test]
    fn display_renders_nested_rules() {
        let rule = Rule::all(vec![
            Rule::region("SU"),
            Rule::at_least(1, vec![Rule::Karma(5), Rule::Flag("The Mark".into())]),
        ]);
        assert_eq!(
            rule.to_string(),
            "All(Region(SU), AtLeast(1: Karma(5), Flag(The Mark)))"
        );
    }

    #[test]
    fn rules_deserialize_from_json() {
        let rule: Rule = serde_json::from_str(
            r#"{"compound": {"op": {"at_least": 2}, "children": [
                {"region": "SU"}, {"karma": 5}, "always"
            ]}}"#,
        )
        .unwrap();
        assert_eq!(
            rule,
            Rule::at_least(2, vec![Rule::region("SU"), Rule::Karma(5), Rule::Always])
        );
    }
}
