use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

///
/// IdentifierState
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierState {
    #[default]
    Draft,
    Registered,
    Findable,
    Tombstoned,
    Flagged,
    Broken,
}

impl IdentifierState {
    pub const ALL: [Self; 6] = [
        Self::Draft,
        Self::Registered,
        Self::Findable,
        Self::Tombstoned,
        Self::Flagged,
        Self::Broken,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Registered => "registered",
            Self::Findable => "findable",
            Self::Tombstoned => "tombstoned",
            Self::Flagged => "flagged",
            Self::Broken => "broken",
        }
    }

    /// Resolvable states that must carry a URL and get bound externally.
    #[must_use]
    pub const fn is_registered_or_findable(self) -> bool {
        matches!(self, Self::Registered | Self::Findable)
    }

    /// Only drafts may be hard-deleted.
    #[must_use]
    pub const fn is_deletable(self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Visible to anonymous search.
    #[must_use]
    pub const fn is_discoverable(self) -> bool {
        matches!(self, Self::Findable)
    }
}

impl fmt::Display for IdentifierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentifierState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown identifier state '{s}'"))
    }
}
