use crate::{
    lifecycle::IdentifierState,
    model::{LandingPage, Metadata, RegistrationAgency},
    types::{ClientId, Doi, ProviderId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance recorded when a save does not name one.
const DEFAULT_SOURCE: &str = "api";

///
/// ResourceTypes
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceTypes {
    pub resource_type_general: Option<String>,
    pub resource_type: Option<String>,
}

///
/// Identifier
///
/// The persisted identifier aggregate.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Identifier {
    pub doi: Doi,
    pub url: Option<String>,
    pub state: IdentifierState,
    pub client_id: ClientId,
    pub provider_id: ProviderId,
    #[serde(default)]
    pub agency: RegistrationAgency,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub types: ResourceTypes,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub schema_version: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub landing_page: Option<LandingPage>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub registered: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u32,
}

impl Identifier {
    /// New identifier in the initial `draft` state.
    #[must_use]
    pub fn draft(doi: Doi, client_id: ClientId, provider_id: ProviderId, now: DateTime<Utc>) -> Self {
        Self {
            doi,
            url: None,
            state: IdentifierState::Draft,
            client_id,
            provider_id,
            agency: RegistrationAgency::Datacite,
            metadata: Metadata::default(),
            types: ResourceTypes::default(),
            publisher: None,
            schema_version: None,
            publication_year: None,
            language: None,
            source: None,
            landing_page: None,
            created: now,
            updated: now,
            registered: None,
            version: 0,
        }
    }

    #[must_use]
    pub fn uid(&self) -> String {
        self.doi.uid()
    }

    /// Stamp bookkeeping fields ahead of a save.
    ///
    /// Bumps the version, refreshes `updated`, defaults the source, and
    /// records the first time the identifier became resolvable.
    pub fn prepare_save(&mut self, now: DateTime<Utc>) {
        self.version = self.version.saturating_add(1);
        self.updated = now;
        if self.source.as_deref().is_none_or(str::is_empty) {
            self.source = Some(DEFAULT_SOURCE.to_string());
        }
        if self.registered.is_none() && self.state.is_registered_or_findable() {
            self.registered = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn prepare_save_bumps_version_and_stamps_first_registration() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let saved = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let doi = Doi::parse("10.5072/abc").expect("doi should parse");
        let mut identifier = Identifier::draft(doi, ClientId::new("a.b"), ProviderId::new("a"), created);

        identifier.prepare_save(saved);
        assert_eq!(identifier.version, 1);
        assert_eq!(identifier.source.as_deref(), Some("api"));
        assert_eq!(identifier.registered, None);

        identifier.state = IdentifierState::Findable;
        identifier.prepare_save(saved);
        assert_eq!(identifier.version, 2);
        assert_eq!(identifier.registered, Some(saved));
        assert_eq!(identifier.updated, saved);
    }
}
