use crate::{
    actor::Actor,
    queue::TaskQueue,
    registration::{RegistrationTask, TaskId, TaskKind},
};
use pidreg_core::{
    error::{ErrorClass, ErrorOrigin, RegistryError},
    model::Identifier,
    types::ProviderId,
};
use std::{collections::BTreeSet, sync::Arc};

///
/// RegistrationDispatcher
///
/// Decides which registration task, if any, a committed identifier needs
/// and hands it to the queue.
///

pub struct RegistrationDispatcher {
    queue: Arc<dyn TaskQueue>,
    self_managed: BTreeSet<ProviderId>,
}

impl RegistrationDispatcher {
    pub fn new<'a>(queue: Arc<dyn TaskQueue>, self_managed: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            queue,
            self_managed: self_managed.into_iter().map(|id| ProviderId::new(id)).collect(),
        }
    }

    /// Resolution for this identifier is handled outside this registry.
    #[must_use]
    pub fn resolves_elsewhere(&self, identifier: &Identifier) -> bool {
        self.self_managed.contains(&identifier.provider_id) || !identifier.agency.is_datacite()
    }

    /// Task an identifier in its current state calls for.
    #[must_use]
    pub fn plan(&self, identifier: &Identifier) -> Option<TaskKind> {
        if !identifier.state.is_registered_or_findable() {
            return None;
        }
        if self.resolves_elsewhere(identifier) {
            return Some(TaskKind::RefreshUrl);
        }

        identifier.url.clone().map(|url| TaskKind::Bind { url })
    }

    /// Enqueue at most one task. Callers without registration credentials
    /// never trigger one; credentials of a client other than the owner are
    /// refused.
    pub async fn dispatch(&self, identifier: &Identifier, actor: &Actor) -> Result<Option<TaskId>, RegistryError> {
        let Some(credentials) = actor.registration_credentials() else {
            return Ok(None);
        };
        if !credentials.username.eq_ignore_ascii_case(identifier.client_id.as_str()) {
            return Err(RegistryError::new(
                ErrorClass::PermissionDenied,
                ErrorOrigin::Registry,
                format!(
                    "doi {}: credentials of {} cannot register an identifier owned by {}",
                    identifier.doi, credentials.username, identifier.client_id
                ),
            ));
        }
        let Some(kind) = self.plan(identifier) else {
            return Ok(None);
        };

        let task = RegistrationTask::new(identifier.doi.clone(), kind, credentials.clone());
        let id = task.id;
        tracing::debug!(
            target: "pidreg::registration",
            doi = %identifier.doi,
            task = %id,
            kind = task.kind.as_str(),
            "registration dispatched"
        );
        self.queue.enqueue(task).await?;

        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ClientCredentials, Role};
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use pidreg_core::{
        lifecycle::IdentifierState,
        model::RegistrationAgency,
        types::{ClientId, Doi},
    };

    #[derive(Default)]
    struct Recorder(Mutex<Vec<RegistrationTask>>);

    #[async_trait]
    impl TaskQueue for Recorder {
        async fn enqueue(&self, task: RegistrationTask) -> Result<(), RegistryError> {
            self.0.lock().push(task);
            Ok(())
        }
    }

    fn identifier(provider: &str, state: IdentifierState) -> Identifier {
        let mut identifier = Identifier::draft(
            Doi::parse("10.5072/d1").expect("doi should parse"),
            ClientId::new(&format!("{provider}.repo")),
            ProviderId::new(provider),
            Utc::now(),
        );
        identifier.state = state;
        identifier.url = Some("https://example.org/d1".to_string());
        identifier
    }

    fn dispatcher(queue: Arc<Recorder>) -> RegistrationDispatcher {
        RegistrationDispatcher::new(queue, &["ethz".to_string()])
    }

    fn admin() -> Actor {
        Actor::client_admin(ClientCredentials::new("EXAMPLE.REPO", "secret"))
    }

    #[test]
    fn plan_binds_resolvable_datacite_identifiers() {
        let dispatcher = dispatcher(Arc::default());

        assert_eq!(dispatcher.plan(&identifier("example", IdentifierState::Draft)), None);
        assert_eq!(
            dispatcher.plan(&identifier("example", IdentifierState::Findable)),
            Some(TaskKind::Bind {
                url: "https://example.org/d1".to_string()
            })
        );
    }

    #[test]
    fn plan_refreshes_self_managed_and_foreign_identifiers() {
        let dispatcher = dispatcher(Arc::default());
        let mut foreign = identifier("example", IdentifierState::Registered);
        foreign.agency = RegistrationAgency::Crossref;

        assert_eq!(
            dispatcher.plan(&identifier("ETHZ", IdentifierState::Findable)),
            Some(TaskKind::RefreshUrl)
        );
        assert_eq!(dispatcher.plan(&foreign), Some(TaskKind::RefreshUrl));
    }

    #[tokio::test]
    async fn dispatch_enqueues_exactly_one_task_for_privileged_actors() {
        let queue = Arc::new(Recorder::default());
        let dispatcher = dispatcher(Arc::clone(&queue));
        let findable = identifier("example", IdentifierState::Findable);

        let id = dispatcher.dispatch(&findable, &admin()).await.expect("dispatch should succeed");
        let skipped = dispatcher
            .dispatch(&findable, &Actor::with_role(Role::User))
            .await
            .expect("dispatch should succeed");

        assert!(id.is_some());
        assert!(skipped.is_none());
        let tasks = queue.0.lock();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].credentials.username, "EXAMPLE.REPO");
        assert_eq!(tasks[0].attempt, 1);
    }

    #[tokio::test]
    async fn dispatch_refuses_credentials_of_another_client() {
        let queue = Arc::new(Recorder::default());
        let dispatcher = dispatcher(Arc::clone(&queue));
        let findable = identifier("example", IdentifierState::Findable);
        let stranger = Actor::client_admin(ClientCredentials::new("OTHER.REPO", "secret"));

        let err = dispatcher
            .dispatch(&findable, &stranger)
            .await
            .expect_err("foreign credentials should be refused");

        assert_eq!(err.class, ErrorClass::PermissionDenied);
        assert!(queue.0.lock().is_empty());
    }
}
