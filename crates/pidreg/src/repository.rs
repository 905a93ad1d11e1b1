//! Module: repository
//! Responsibility: persistence seams for identifiers and their owners, with
//! in-memory implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use pidreg_core::{
    error::RegistryError,
    facet::{NameLookup, TotalsScope},
    lifecycle::IdentifierState,
    model::{Client, Identifier, Provider},
    types::{ClientId, Doi, ProviderId},
};
use std::collections::{BTreeMap, HashMap, btree_map::Entry};

///
/// RepositoryFilter
///
/// Conjunctive equality filter; `None` fields match everything.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RepositoryFilter {
    pub client_id: Option<ClientId>,
    pub provider_id: Option<ProviderId>,
    pub state: Option<IdentifierState>,
}

impl RepositoryFilter {
    #[must_use]
    pub fn matches(&self, identifier: &Identifier) -> bool {
        self.client_id.as_ref().is_none_or(|id| *id == identifier.client_id)
            && self.provider_id.as_ref().is_none_or(|id| *id == identifier.provider_id)
            && self.state.is_none_or(|state| state == identifier.state)
    }
}

///
/// IdentifierRepository
///
/// Identifiers keyed by uid (the lowercased DOI).
///

#[async_trait]
pub trait IdentifierRepository: Send + Sync {
    async fn find_by_id(&self, doi: &Doi) -> Result<Option<Identifier>, RegistryError>;

    async fn query(&self, filter: &RepositoryFilter) -> Result<Vec<Identifier>, RegistryError>;

    /// Create-only write. A record already stored under the uid is a
    /// Conflict and is left untouched.
    async fn insert(&self, identifier: &Identifier) -> Result<(), RegistryError>;

    async fn save(&self, identifier: &Identifier) -> Result<(), RegistryError>;

    /// Returns whether a record was removed.
    async fn delete(&self, doi: &Doi) -> Result<bool, RegistryError>;

    /// Up to `limit` identifiers in uid order, strictly after `after`.
    async fn scan(&self, after: Option<&str>, limit: usize) -> Result<Vec<Identifier>, RegistryError>;
}

///
/// MemoryRepository
///

#[derive(Debug, Default)]
pub struct MemoryRepository {
    rows: RwLock<BTreeMap<String, Identifier>>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl IdentifierRepository for MemoryRepository {
    async fn find_by_id(&self, doi: &Doi) -> Result<Option<Identifier>, RegistryError> {
        Ok(self.rows.read().get(&doi.uid()).cloned())
    }

    async fn query(&self, filter: &RepositoryFilter) -> Result<Vec<Identifier>, RegistryError> {
        Ok(self
            .rows
            .read()
            .values()
            .filter(|identifier| filter.matches(identifier))
            .cloned()
            .collect())
    }

    async fn insert(&self, identifier: &Identifier) -> Result<(), RegistryError> {
        match self.rows.write().entry(identifier.uid()) {
            Entry::Occupied(_) => Err(RegistryError::duplicate_identifier(identifier.doi.as_str())),
            Entry::Vacant(slot) => {
                slot.insert(identifier.clone());
                Ok(())
            }
        }
    }

    async fn save(&self, identifier: &Identifier) -> Result<(), RegistryError> {
        self.rows.write().insert(identifier.uid(), identifier.clone());
        Ok(())
    }

    async fn delete(&self, doi: &Doi) -> Result<bool, RegistryError> {
        Ok(self.rows.write().remove(&doi.uid()).is_some())
    }

    async fn scan(&self, after: Option<&str>, limit: usize) -> Result<Vec<Identifier>, RegistryError> {
        let rows = self.rows.read();
        let window: Vec<Identifier> = match after {
            Some(after) => rows
                .range::<str, _>((std::ops::Bound::Excluded(after), std::ops::Bound::Unbounded))
                .take(limit)
                .map(|(_, identifier)| identifier.clone())
                .collect(),
            None => rows.values().take(limit).cloned().collect(),
        };
        Ok(window)
    }
}

///
/// OwnerDirectory
///
/// Lookup of the repository accounts and organizations owning identifiers.
///

pub trait OwnerDirectory: Send + Sync {
    fn client(&self, id: &ClientId) -> Option<Client>;

    fn provider(&self, id: &ProviderId) -> Option<Provider>;
}

///
/// Directory
///

#[derive(Debug, Default)]
pub struct Directory {
    clients: RwLock<HashMap<ClientId, Client>>,
    providers: RwLock<HashMap<ProviderId, Provider>>,
}

impl Directory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_client(&self, client: Client) {
        self.clients.write().insert(client.id.clone(), client);
    }

    pub fn add_provider(&self, provider: Provider) {
        self.providers.write().insert(provider.id.clone(), provider);
    }
}

impl OwnerDirectory for Directory {
    fn client(&self, id: &ClientId) -> Option<Client> {
        self.clients.read().get(id).cloned()
    }

    fn provider(&self, id: &ProviderId) -> Option<Provider> {
        self.providers.read().get(id).cloned()
    }
}

///
/// OwnerNames
///
/// Totals titles read from an owner directory. Prefixes have no display
/// name of their own.
///

#[derive(Clone, Copy)]
pub struct OwnerNames<'a>(pub &'a dyn OwnerDirectory);

impl NameLookup for OwnerNames<'_> {
    fn display_name(&self, scope: TotalsScope, id: &str) -> Option<String> {
        match scope {
            TotalsScope::Provider => self.0.provider(&ProviderId::new(id)).map(|p| p.name),
            TotalsScope::Client | TotalsScope::ClientExport => self.0.client(&ClientId::new(id)).map(|c| c.name),
            TotalsScope::Prefix => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pidreg_core::error::ErrorClass;

    fn identifier(suffix: &str, state: IdentifierState) -> Identifier {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut identifier = Identifier::draft(
            Doi::parse(&format!("10.5072/{suffix}")).expect("doi should parse"),
            ClientId::new("example.repo"),
            ProviderId::new("example"),
            at,
        );
        identifier.state = state;
        identifier
    }

    #[tokio::test]
    async fn scan_pages_in_uid_order() {
        let repository = MemoryRepository::new();
        for suffix in ["c", "a", "b", "d"] {
            repository
                .save(&identifier(suffix, IdentifierState::Draft))
                .await
                .expect("save should succeed");
        }

        let first = repository.scan(None, 2).await.expect("scan should succeed");
        let last_uid = first.last().map(Identifier::uid).expect("first window should not be empty");
        let second = repository.scan(Some(&last_uid), 2).await.expect("scan should succeed");

        let uids: Vec<_> = first.iter().chain(&second).map(Identifier::uid).collect();
        assert_eq!(uids, vec!["10.5072/a", "10.5072/b", "10.5072/c", "10.5072/d"]);
    }

    #[tokio::test]
    async fn insert_refuses_an_existing_uid_and_keeps_the_stored_record() {
        let repository = MemoryRepository::new();
        let first = identifier("a", IdentifierState::Draft);
        repository.insert(&first).await.expect("first insert should succeed");

        let mut second = identifier("A", IdentifierState::Findable);
        second.url = Some("https://example.org/other".to_string());
        let err = repository.insert(&second).await.expect_err("second insert should conflict");

        assert_eq!(err.class, ErrorClass::Conflict);
        assert_eq!(err.field_errors()[0].field, "doi");
        let stored = repository
            .find_by_id(&first.doi)
            .await
            .expect("find should succeed")
            .expect("record should exist");
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn query_filters_by_state() {
        let repository = MemoryRepository::new();
        repository
            .save(&identifier("a", IdentifierState::Findable))
            .await
            .expect("save should succeed");
        repository
            .save(&identifier("b", IdentifierState::Draft))
            .await
            .expect("save should succeed");

        let filter = RepositoryFilter {
            state: Some(IdentifierState::Findable),
            ..RepositoryFilter::default()
        };
        let found = repository.query(&filter).await.expect("query should succeed");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uid(), "10.5072/a");
    }

    #[test]
    fn directory_names_drive_totals_titles() {
        let directory = Directory::new();
        directory.add_provider(Provider::new("example", "Example Org"));

        let names = OwnerNames(&directory);

        assert_eq!(
            names.display_name(TotalsScope::Provider, "EXAMPLE"),
            Some("Example Org".to_string())
        );
        assert_eq!(names.display_name(TotalsScope::Prefix, "10.5072"), None);
    }
}
