//! Module: bootstrap
//! Responsibility: wiring the networked collaborators from configuration.

use crate::{
    backend::ElasticBackend,
    cache::MokaCache,
    config::Config,
    link_check::HttpLinkChecker,
    queue::{LocalTaskQueue, TaskQueue},
    registration::{HttpRegistry, RegistrationWorker, ResolutionRegistry},
    repository::{IdentifierRepository, OwnerDirectory},
    service::{IdentifierService, ServiceParts, system_clock},
};
use pidreg_core::{error::RegistryError, model::RelationCounter};
use std::sync::Arc;

///
/// Runtime
///
/// A service wired to HTTP collaborators, plus the queue handle needed to
/// drain registration work on shutdown.
///

pub struct Runtime {
    pub service: IdentifierService,
    pub queue: Arc<LocalTaskQueue>,
}

impl Runtime {
    /// Must be called inside a tokio runtime; the queue spawns its runner.
    pub fn start(
        config: Config,
        repository: Arc<dyn IdentifierRepository>,
        directory: Arc<dyn OwnerDirectory>,
        counter: Arc<dyn RelationCounter>,
    ) -> Result<Self, RegistryError> {
        config.validate()?;

        let registry = Arc::new(HttpRegistry::new(&config.registry)?);
        let clock = system_clock();
        let worker = RegistrationWorker::new(
            registry.clone() as Arc<dyn ResolutionRegistry>,
            Arc::clone(&repository),
            Arc::clone(&clock),
        );
        let queue = Arc::new(LocalTaskQueue::start(&config.queue, Arc::new(worker)));

        let parts = ServiceParts {
            backend: Arc::new(ElasticBackend::new(&config.search)?),
            cache: Arc::new(MokaCache::new(&config.cache)),
            link_checker: Arc::new(HttpLinkChecker::new(&config.link_check)?),
            queue: queue.clone() as Arc<dyn TaskQueue>,
            registry,
            repository,
            directory,
            counter,
            clock,
            config,
        };
        tracing::info!(target: "pidreg::bootstrap", environment = ?parts.config.environment, "runtime started");

        Ok(Self {
            service: IdentifierService::new(parts),
            queue,
        })
    }

    pub async fn shutdown(&self) {
        self.queue.drain().await;
    }
}
