use crate::{
    queue::TaskHandler,
    registration::{RegistrationTask, ResolutionRegistry, TaskKind},
    repository::IdentifierRepository,
    service::Clock,
};
use async_trait::async_trait;
use pidreg_core::error::{ErrorDetail, RegistryError};
use std::sync::Arc;

///
/// RegistrationWorker
///
/// Executes registration tasks. Failures are logged and returned so the
/// queue can decide on redelivery; nothing is retried inline.
///

pub struct RegistrationWorker {
    registry: Arc<dyn ResolutionRegistry>,
    repository: Arc<dyn IdentifierRepository>,
    clock: Clock,
}

impl RegistrationWorker {
    pub fn new(
        registry: Arc<dyn ResolutionRegistry>,
        repository: Arc<dyn IdentifierRepository>,
        clock: Clock,
    ) -> Self {
        Self {
            registry,
            repository,
            clock,
        }
    }

    async fn bind(&self, task: &RegistrationTask, url: &str) -> Result<(), RegistryError> {
        match self.registry.bind(&task.doi, url, &task.credentials).await {
            Ok(()) => {
                tracing::info!(target: "pidreg::registration", doi = %task.doi, url, attempt = task.attempt, "url bound");
                Ok(())
            }
            Err(err) => {
                let (status, body) = match &err.detail {
                    Some(ErrorDetail::Http { status, body }) => (Some(*status), body.as_str()),
                    _ => (None, ""),
                };
                tracing::warn!(
                    target: "pidreg::registration",
                    doi = %task.doi,
                    status,
                    body,
                    attempt = task.attempt,
                    error = %err.display_with_class(),
                    "url binding failed"
                );
                Err(err)
            }
        }
    }

    async fn refresh_url(&self, task: &RegistrationTask) -> Result<(), RegistryError> {
        let bound = self.registry.fetch_url(&task.doi, &task.credentials).await?;
        let Some(mut identifier) = self.repository.find_by_id(&task.doi).await? else {
            return Err(RegistryError::identifier_not_found(task.doi.as_str()));
        };
        if identifier.url.as_deref() == Some(bound.as_str()) {
            return Ok(());
        }

        tracing::info!(target: "pidreg::registration", doi = %task.doi, url = %bound, "local url refreshed");
        identifier.url = Some(bound);
        identifier.prepare_save((self.clock)());
        self.repository.save(&identifier).await
    }
}

#[async_trait]
impl TaskHandler for RegistrationWorker {
    async fn handle(&self, task: &RegistrationTask) -> Result<(), RegistryError> {
        match &task.kind {
            TaskKind::Bind { url } => self.bind(task, url).await,
            TaskKind::RefreshUrl => self.refresh_url(task).await,
        }
    }
}
