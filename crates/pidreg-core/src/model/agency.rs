use serde::{Deserialize, Serialize};
use std::fmt;

///
/// RegistrationAgency
///
/// Authority that owns resolution for an identifier. Only `Datacite`
/// identifiers are bound by this registry; the rest handle their own binding.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationAgency {
    #[default]
    Datacite,
    Crossref,
    Kisti,
    Medra,
    Istic,
    Jalc,
    Airiti,
    Cnki,
    Op,
}

impl RegistrationAgency {
    /// Agencies excluded by `exclude-registration-agencies`.
    pub const FOREIGN: [Self; 8] = [
        Self::Crossref,
        Self::Kisti,
        Self::Medra,
        Self::Jalc,
        Self::Istic,
        Self::Airiti,
        Self::Cnki,
        Self::Op,
    ];

    /// Blank or unrecognized input falls back to `Datacite`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "crossref" => Self::Crossref,
            "kisti" => Self::Kisti,
            "medra" => Self::Medra,
            "istic" => Self::Istic,
            "jalc" => Self::Jalc,
            "airiti" => Self::Airiti,
            "cnki" => Self::Cnki,
            "op" => Self::Op,
            _ => Self::Datacite,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Datacite => "datacite",
            Self::Crossref => "crossref",
            Self::Kisti => "kisti",
            Self::Medra => "medra",
            Self::Istic => "istic",
            Self::Jalc => "jalc",
            Self::Airiti => "airiti",
            Self::Cnki => "cnki",
            Self::Op => "op",
        }
    }

    #[must_use]
    pub const fn is_datacite(self) -> bool {
        matches!(self, Self::Datacite)
    }
}

impl fmt::Display for RegistrationAgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
