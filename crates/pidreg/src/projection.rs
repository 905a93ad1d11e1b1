//! Module: projection
//! Responsibility: turning stored identifiers into index documents, with
//! owner lookups and relation counters served through the cache.

use crate::{
    cache::{CacheKey, CacheScope, CacheService, get_as, set_as},
    repository::OwnerDirectory,
};
use pidreg_core::model::{Client, Identifier, IdentifierDocument, Provider, RelationCounter, RelationCounts};
use std::sync::Arc;

///
/// Projector
///

pub struct Projector {
    directory: Arc<dyn OwnerDirectory>,
    counter: Arc<dyn RelationCounter>,
    cache: Arc<dyn CacheService>,
}

impl Projector {
    pub fn new(
        directory: Arc<dyn OwnerDirectory>,
        counter: Arc<dyn RelationCounter>,
        cache: Arc<dyn CacheService>,
    ) -> Self {
        Self {
            directory,
            counter,
            cache,
        }
    }

    #[must_use]
    pub fn project(&self, identifier: &Identifier) -> IdentifierDocument {
        let client = self.client(identifier);
        let provider = self.provider(identifier);
        let counts = self.counts(identifier);

        IdentifierDocument::project(identifier, client.as_ref(), provider.as_ref(), counts)
    }

    pub fn client(&self, identifier: &Identifier) -> Option<Client> {
        let key = CacheKey::new(CacheScope::Lookup, format!("client:{}", identifier.client_id));
        if let Some(client) = get_as(self.cache.as_ref(), &key) {
            return Some(client);
        }
        let client = self.directory.client(&identifier.client_id)?;
        set_as(self.cache.as_ref(), key, &client);

        Some(client)
    }

    fn provider(&self, identifier: &Identifier) -> Option<Provider> {
        let key = CacheKey::new(CacheScope::Lookup, format!("provider:{}", identifier.provider_id));
        if let Some(provider) = get_as(self.cache.as_ref(), &key) {
            return Some(provider);
        }
        let provider = self.directory.provider(&identifier.provider_id)?;
        set_as(self.cache.as_ref(), key, &provider);

        Some(provider)
    }

    fn counts(&self, identifier: &Identifier) -> RelationCounts {
        let key = CacheKey::new(CacheScope::MetadataCounts, identifier.uid());
        if let Some(counts) = get_as(self.cache.as_ref(), &key) {
            return counts;
        }
        let counts = self.counter.counts_for(&identifier.doi);
        set_as(self.cache.as_ref(), key, &counts);

        counts
    }

    /// Forget cached counters after the identifier changed or went away.
    pub fn forget(&self, identifier: &Identifier) {
        self.cache.invalidate(CacheScope::MetadataCounts, &identifier.uid());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::MokaCache, config::CacheConfig, repository::Directory};
    use chrono::Utc;
    use pidreg_core::{
        model::{RelationEvent, RelationType},
        types::{ClientId, Doi, ProviderId},
    };

    #[test]
    fn counts_are_cached_until_forgotten() {
        let doi = Doi::parse("10.5072/p1").expect("doi should parse");
        let identifier = Identifier::draft(doi.clone(), ClientId::new("example.repo"), ProviderId::new("example"), Utc::now());
        let directory = Directory::new();
        directory.add_provider(Provider::new("example", "Example Provider"));
        directory.add_client(Client::new("example.repo", "example", "Example Repository"));
        let events = vec![RelationEvent {
            subject: doi,
            relation: RelationType::Citation,
            total: 1,
            occurred: Utc::now(),
        }];
        let cache = Arc::new(MokaCache::new(&CacheConfig::default()));
        let projector = Projector::new(Arc::new(directory), Arc::new(events), cache.clone());

        let document = projector.project(&identifier);

        assert_eq!(document.counts.citation_count, 1);
        assert_eq!(document.client_id_and_name, "example.repo:Example Repository");
        assert!(cache.get(&CacheKey::new(CacheScope::MetadataCounts, identifier.uid())).is_some());

        projector.forget(&identifier);
        assert!(cache.get(&CacheKey::new(CacheScope::MetadataCounts, identifier.uid())).is_none());
    }
}
