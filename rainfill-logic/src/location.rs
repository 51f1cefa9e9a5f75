use serde::{Deserialize, Serialize};
use std::fmt;

use crate::profile::RegionId;
use crate::rule::Rule;

/// Classification tag; only used for display by collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Pearl,
    Token,
    Echo,
    Broadcast,
    Shelter,
    Story,
    Passage,
    Misc,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pearl => "pearl",
            Self::Token => "token",
            Self::Echo => "echo",
            Self::Broadcast => "broadcast",
            Self::Shelter => "shelter",
            Self::Story => "story",
            Self::Passage => "passage",
            Self::Misc => "misc",
        };
        f.write_str(label)
    }
}

/// A place a reward can be assigned to, guarded by exactly one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub kind: LocationKind,
    /// Owning region; `None` for region-less content such as passages.
    pub region: Option<RegionId>,
    pub rule: Rule,
}

impl Location {
    #[must_use]
    pub fn new(id: &str, kind: LocationKind, region: Option<RegionId>, rule: Rule) -> Self {
        Self {
            id: id.to_string(),
            kind,
            region,
            rule,
        }
    }
}
