//! Gates: named bidirectional edges between two regions.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::GATE_PREFIX;
use crate::error::ConfigError;
use crate::profile::RegionId;

/// A connection between two regions. `left` and `right` follow the order in
/// which the endpoints appear in the gate name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Gate {
    pub name: String,
    pub left: RegionId,
    pub right: RegionId,
}

impl Gate {
    /// Parse a `GATE_<left>_<right>` name into its endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedGate`] when the name lacks the prefix or
    /// does not split into exactly two non-empty region identifiers.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::MalformedGate {
            name: name.to_string(),
        };
        let rest = name.strip_prefix(GATE_PREFIX).ok_or_else(malformed)?;
        let mut parts = rest.split('_');
        let (Some(left), Some(right), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };
        if left.is_empty() || right.is_empty() || left == right {
            return Err(malformed());
        }
        Ok(Self {
            name: name.to_string(),
            left: RegionId::new(left),
            right: RegionId::new(right),
        })
    }

    /// Connection with explicit endpoints, used for registered connections
    /// whose name does not encode them.
    #[must_use]
    pub fn between(name: &str, left: RegionId, right: RegionId) -> Self {
        Self {
            name: name.to_string(),
            left,
            right,
        }
    }

    #[must_use]
    pub fn touches(&self, region: &RegionId) -> bool {
        &self.left == region || &self.right == region
    }

    /// Replace `from` with `to` on whichever side matches.
    pub fn remap_endpoint(&mut self, from: &RegionId, to: &RegionId) {
        if &self.left == from {
            self.left = to.clone();
        }
        if &self.right == from {
            self.right = to.clone();
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
