//! Compaction strategy: how much recent history is protected from cutting.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How aggressively a session is compacted.
///
/// The strategy sets the minimum number of trailing entries that are never
/// cut (`min_keep_count`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Keep the last 2 entries.
    Aggressive,
    /// Keep the last 4 entries.
    #[default]
    Balanced,
    /// Keep the last 6 entries.
    Conservative,
}

impl Strategy {
    /// Number of trailing entries this strategy never cuts into.
    pub fn min_keep_count(&self) -> usize {
        match self {
            Self::Aggressive => 2,
            Self::Balanced => 4,
            Self::Conservative => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aggressive => "aggressive",
            Self::Balanced => "balanced",
            Self::Conservative => "conservative",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aggressive" => Ok(Self::Aggressive),
            "balanced" => Ok(Self::Balanced),
            "conservative" => Ok(Self::Conservative),
            other => Err(format!(
                "unknown strategy '{other}' (expected aggressive, balanced or conservative)"
            )),
        }
    }
}
