//! Module: service
//! Responsibility: the identifier operations callers see, and the explicit
//! post-save hooks (index the projection, then dispatch registration).
//! Does not own: query construction, facet shaping, or transport.

use crate::{
    actor::Actor,
    cache::{CacheKey, CacheScope, CacheService, get_as, set_as},
    config::{Config, Environment},
    link_check::{self, LinkChecker},
    projection::Projector,
    queue::TaskQueue,
    registration::{RegistrationDispatcher, ResolutionRegistry, TaskId},
    reindex::{ReindexReport, Reindexer},
    repository::{IdentifierRepository, OwnerDirectory, OwnerNames},
};
use chrono::{DateTime, Utc};
use pidreg_core::{
    error::{ErrorClass, ErrorOrigin, FieldError, RegistryError},
    facet::{FacetSelection, TotalsEntry, TotalsScope},
    fingerprint::RequestFingerprint,
    lifecycle::{self, GuardContext, IdentifierState, LifecycleEvent, TransitionPolicy, UserEvent},
    model::{Client, Identifier, LandingPage, Metadata, RegistrationAgency, RelationCounter, ResourceTypes},
    page::PageRequest,
    query::{SearchParams, TEST_SEED},
    search::{SearchBackend, SearchOptions, SearchResults, execute},
    types::{ClientId, Doi},
    validate::{self, ValidationContext},
};
use serde::Deserialize;
use std::sync::Arc;

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[must_use]
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

///
/// IdentifierInput
///
/// Create/update payload. Absent fields leave the stored value unchanged.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct IdentifierInput {
    pub doi: Option<String>,
    pub url: Option<String>,
    pub client_id: Option<String>,
    /// `register`, `publish`, `hide` or `show`.
    pub event: Option<String>,
    pub agency: Option<String>,
    pub types: Option<ResourceTypes>,
    pub metadata: Option<Metadata>,
    pub publisher: Option<String>,
    pub schema_version: Option<String>,
    pub publication_year: Option<i32>,
    pub language: Option<String>,
    pub source: Option<String>,
}

impl IdentifierInput {
    fn event(&self) -> Result<Option<UserEvent>, RegistryError> {
        self.event
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                raw.parse::<UserEvent>()
                    .map_err(|message| RegistryError::validation(vec![FieldError::new("event", message)]))
            })
            .transpose()
    }

    fn apply_to(&self, identifier: &mut Identifier) {
        if let Some(url) = &self.url {
            identifier.url = Some(url.trim().to_string()).filter(|url| !url.is_empty());
        }
        if let Some(agency) = &self.agency {
            identifier.agency = RegistrationAgency::parse_lenient(agency);
        }
        if let Some(types) = &self.types {
            identifier.types = types.clone();
        }
        if let Some(metadata) = &self.metadata {
            identifier.metadata = metadata.clone();
        }
        for (slot, value) in [
            (&mut identifier.publisher, &self.publisher),
            (&mut identifier.schema_version, &self.schema_version),
            (&mut identifier.language, &self.language),
            (&mut identifier.source, &self.source),
        ] {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        if self.publication_year.is_some() {
            identifier.publication_year = self.publication_year;
        }
    }
}

///
/// Committed
///
/// A saved identifier and the registration task its save triggered.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Committed {
    pub identifier: Identifier,
    pub task: Option<TaskId>,
}

///
/// ServiceParts
///

pub struct ServiceParts {
    pub config: Config,
    pub repository: Arc<dyn IdentifierRepository>,
    pub directory: Arc<dyn OwnerDirectory>,
    pub counter: Arc<dyn RelationCounter>,
    pub backend: Arc<dyn SearchBackend>,
    pub cache: Arc<dyn CacheService>,
    pub queue: Arc<dyn TaskQueue>,
    pub registry: Arc<dyn ResolutionRegistry>,
    pub link_checker: Arc<dyn LinkChecker>,
    pub clock: Clock,
}

///
/// IdentifierService
///

pub struct IdentifierService {
    environment: Environment,
    policy: TransitionPolicy,
    repository: Arc<dyn IdentifierRepository>,
    directory: Arc<dyn OwnerDirectory>,
    backend: Arc<dyn SearchBackend>,
    cache: Arc<dyn CacheService>,
    registry: Arc<dyn ResolutionRegistry>,
    link_checker: Arc<dyn LinkChecker>,
    projector: Projector,
    dispatcher: RegistrationDispatcher,
    clock: Clock,
}

impl IdentifierService {
    #[must_use]
    pub fn new(parts: ServiceParts) -> Self {
        let dispatcher = RegistrationDispatcher::new(parts.queue, &parts.config.registry.self_managed_providers);
        let projector = Projector::new(Arc::clone(&parts.directory), parts.counter, Arc::clone(&parts.cache));

        Self {
            environment: parts.config.environment,
            policy: TransitionPolicy::default(),
            repository: parts.repository,
            directory: parts.directory,
            backend: parts.backend,
            cache: parts.cache,
            registry: parts.registry,
            link_checker: parts.link_checker,
            projector,
            dispatcher,
            clock: parts.clock,
        }
    }

    /// Report illegal transitions instead of ignoring them.
    #[must_use]
    pub const fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn projector(&self) -> &Projector {
        &self.projector
    }

    pub async fn create(&self, input: IdentifierInput, actor: &Actor) -> Result<Committed, RegistryError> {
        let doi = validate::parse_doi_field(input.doi.as_deref().unwrap_or_default())
            .map_err(|err| RegistryError::validation(vec![err]))?;

        self.insert(doi, &input, actor).await
    }

    /// Update in place, or create when the identifier does not exist yet.
    pub async fn update(&self, raw_doi: &str, input: IdentifierInput, actor: &Actor) -> Result<Committed, RegistryError> {
        let doi = validate::parse_doi_field(raw_doi).map_err(|err| RegistryError::validation(vec![err]))?;
        let Some(mut identifier) = self.repository.find_by_id(&doi).await? else {
            return self.insert(doi, &input, actor).await;
        };

        let client = self.projector.client(&identifier);
        input.apply_to(&mut identifier);
        self.transition(&mut identifier, input.event()?, client.as_ref())?;
        validate::validate_identifier(
            &identifier,
            ValidationContext {
                client: client.as_ref(),
                duplicate: false,
            },
        )?;

        self.commit(identifier, actor, Write::Replace).await
    }

    /// Hard-delete a draft. Any other state is refused.
    pub async fn delete(&self, raw_doi: &str) -> Result<(), RegistryError> {
        let identifier = self.find(raw_doi).await?;
        if !identifier.state.is_deletable() {
            return Err(RegistryError::not_allowed(format!(
                "identifier in state {} cannot be deleted",
                identifier.state
            )));
        }

        self.repository.delete(&identifier.doi).await?;
        self.projector.forget(&identifier);
        if let Err(err) = self.backend.delete(&identifier.uid()).await {
            tracing::warn!(target: "pidreg::service", doi = %identifier.doi, error = %err.display_with_class(), "index delete failed");
        }
        tracing::info!(target: "pidreg::service", doi = %identifier.doi, "identifier deleted");

        Ok(())
    }

    pub async fn find(&self, raw_doi: &str) -> Result<Identifier, RegistryError> {
        let doi = Doi::parse(raw_doi).map_err(|_| RegistryError::identifier_not_found(raw_doi))?;

        self.repository
            .find_by_id(&doi)
            .await?
            .ok_or_else(|| RegistryError::identifier_not_found(doi.as_str()))
    }

    /// Search with raw request parameters. Callers below provider admin
    /// only ever see findable identifiers.
    pub async fn search<K, V>(&self, pairs: &[(K, V)], actor: &Actor) -> Result<SearchResults, RegistryError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let raw = || pairs.iter().map(|(key, value)| (key.as_ref(), value.as_ref()));
        let mut params = SearchParams::from_pairs(raw())?;
        let page = PageRequest::from_pairs(raw())?;
        restrict_visibility(&mut params, actor);

        self.run(&params, &page).await
    }

    /// Grouped rollups for `scope`, cached per visibility and parameters.
    pub async fn totals<K, V>(
        &self,
        scope: TotalsScope,
        pairs: &[(K, V)],
        actor: &Actor,
    ) -> Result<Vec<TotalsEntry>, RegistryError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let raw = || pairs.iter().map(|(key, value)| (key.as_ref(), value.as_ref()));
        let visibility = if actor.sees_only_findable() { "findable" } else { "all" };
        let fingerprint = RequestFingerprint::of_pairs(raw().chain([("visibility", visibility)]));
        let key = CacheKey::new(CacheScope::Totals, scope.as_str()).with_fingerprint(fingerprint);
        if let Some(entries) = get_as(self.cache.as_ref(), &key) {
            return Ok(entries);
        }

        let mut params = SearchParams::from_pairs(raw())?;
        params.totals = Some(scope);
        params.facets = FacetSelection::disabled();
        params.sample = None;
        restrict_visibility(&mut params, actor);

        let entries = self
            .run(&params, &PageRequest::offset(1, 0))
            .await?
            .totals
            .unwrap_or_default();
        set_as(self.cache.as_ref(), key, &entries);

        Ok(entries)
    }

    /// URL an identifier resolves to. Identifiers this registry does not
    /// bind answer from the local record.
    pub async fn get_url(&self, raw_doi: &str, actor: &Actor) -> Result<String, RegistryError> {
        let identifier = self.find(raw_doi).await?;
        if !identifier.state.is_registered_or_findable() || self.dispatcher.resolves_elsewhere(&identifier) {
            return identifier
                .url
                .ok_or_else(|| RegistryError::identifier_not_found(identifier.doi.as_str()));
        }

        let Some(credentials) = actor.registration_credentials() else {
            return Err(RegistryError::new(
                ErrorClass::PermissionDenied,
                ErrorOrigin::Registry,
                "registry credentials are required",
            ));
        };

        self.registry.fetch_url(&identifier.doi, credentials).await
    }

    /// Check the landing page. A definitive failure marks the identifier
    /// broken; a timeout is returned and changes nothing.
    pub async fn check_link(&self, raw_doi: &str) -> Result<LandingPage, RegistryError> {
        let mut identifier = self.find(raw_doi).await?;
        let landing = match identifier.url.as_deref() {
            Some(url) => self.link_checker.check(url).await?,
            None => link_check::missing_url((self.clock)()),
        };

        let outcome = lifecycle::transition(
            identifier.state,
            LifecycleEvent::LinkCheck,
            GuardContext {
                registerable: false,
                health_check_failed: landing.is_failure(),
            },
        );
        tracing::info!(
            target: "pidreg::service",
            doi = %identifier.doi,
            status = landing.status,
            state = %outcome.state(),
            "landing page checked"
        );
        identifier.state = outcome.state();
        identifier.landing_page = Some(landing.clone());
        identifier.prepare_save((self.clock)());
        self.repository.save(&identifier).await?;
        self.index(&identifier).await;

        Ok(landing)
    }

    /// Rebuild the search index from the repository.
    pub async fn reindex(&self) -> Result<ReindexReport, RegistryError> {
        Reindexer::new(self.repository.as_ref(), self.backend.as_ref(), &self.projector)
            .run()
            .await
    }

    async fn run(&self, params: &SearchParams, page: &PageRequest) -> Result<SearchResults, RegistryError> {
        let seed = match self.environment {
            Environment::Test => TEST_SEED.to_string(),
            Environment::Production | Environment::Stage => format!("random_{}", rand::random::<u16>()),
        };
        let names = OwnerNames(self.directory.as_ref());
        let options = SearchOptions {
            seed: &seed,
            today: (self.clock)().date_naive(),
            names: &names,
        };

        execute(self.backend.as_ref(), params, page, options).await
    }

    async fn insert(&self, doi: Doi, input: &IdentifierInput, actor: &Actor) -> Result<Committed, RegistryError> {
        let duplicate = self.repository.find_by_id(&doi).await?.is_some();
        let client = self.owning_client(input)?;
        let mut identifier = Identifier::draft(doi, client.id.clone(), client.provider_id.clone(), (self.clock)());

        input.apply_to(&mut identifier);
        self.transition(&mut identifier, input.event()?, Some(&client))?;
        validate::validate_identifier(
            &identifier,
            ValidationContext {
                client: Some(&client),
                duplicate,
            },
        )?;

        self.commit(identifier, actor, Write::Create).await
    }

    fn owning_client(&self, input: &IdentifierInput) -> Result<Client, RegistryError> {
        let Some(raw) = input.client_id.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Err(RegistryError::validation(vec![FieldError::new("client_id", "can't be blank")]));
        };

        self.directory
            .client(&ClientId::new(raw))
            .ok_or_else(|| RegistryError::validation(vec![FieldError::new("client_id", "does not exist")]))
    }

    // The registerable guard asks whether the record is valid as it stands,
    // before the requested state is applied.
    fn transition(
        &self,
        identifier: &mut Identifier,
        event: Option<UserEvent>,
        client: Option<&Client>,
    ) -> Result<(), RegistryError> {
        let Some(event) = event else {
            return Ok(());
        };
        let registerable = validate::collect_errors(
            identifier,
            ValidationContext {
                client,
                duplicate: false,
            },
        )
        .is_empty();

        let outcome = lifecycle::apply(
            identifier.state,
            event.into(),
            GuardContext {
                registerable,
                health_check_failed: false,
            },
            self.policy,
        )?;
        if !outcome.is_applied() {
            tracing::debug!(target: "pidreg::service", doi = %identifier.doi, state = %identifier.state, "event ignored");
        }
        identifier.state = outcome.state();

        Ok(())
    }

    async fn commit(&self, mut identifier: Identifier, actor: &Actor, write: Write) -> Result<Committed, RegistryError> {
        identifier.prepare_save((self.clock)());
        match write {
            Write::Create => self.repository.insert(&identifier).await?,
            Write::Replace => self.repository.save(&identifier).await?,
        }
        tracing::info!(
            target: "pidreg::service",
            doi = %identifier.doi,
            state = %identifier.state,
            version = identifier.version,
            "identifier saved"
        );

        self.index(&identifier).await;
        let task = match self.dispatcher.dispatch(&identifier, actor).await {
            Ok(task) => task,
            Err(err) => {
                tracing::warn!(target: "pidreg::service", doi = %identifier.doi, error = %err.display_with_class(), "registration not dispatched");
                None
            }
        };

        Ok(Committed { identifier, task })
    }

    // Index failures never fail the save; a reindex repairs the document.
    async fn index(&self, identifier: &Identifier) {
        self.projector.forget(identifier);
        let document = self.projector.project(identifier);
        if let Err(err) = self.backend.index(&document).await {
            tracing::warn!(target: "pidreg::service", doi = %identifier.doi, error = %err.display_with_class(), "index update failed");
        }
    }
}

// A create must not overwrite a record that appeared after the duplicate
// check, so it goes through the repository's create-only write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Write {
    Create,
    Replace,
}

fn restrict_visibility(params: &mut SearchParams, actor: &Actor) {
    if actor.sees_only_findable() {
        params.states = vec![IdentifierState::Findable];
    }
}
