#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use pidreg::{
    actor::{Actor, ClientCredentials},
    cache::MokaCache,
    config::{Config, Environment, QueueConfig},
    link_check::LinkChecker,
    queue::LocalTaskQueue,
    registration::{MemoryRegistry, RegistrationWorker},
    repository::{Directory, IdentifierRepository, MemoryRepository},
    service::{IdentifierInput, IdentifierService, ServiceParts},
};
use pidreg_core::{
    error::{ErrorOrigin, RegistryError},
    model::{Client, LandingPage, Provider, RelationEvent},
    search::MemoryBackend,
};
use std::sync::Arc;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

///
/// LinkOutcome
///

#[derive(Clone, Copy, Debug)]
pub enum LinkOutcome {
    Status(u16),
    Unreachable,
    Timeout,
}

///
/// StaticLinkChecker
///

pub struct StaticLinkChecker(Mutex<LinkOutcome>);

impl StaticLinkChecker {
    pub fn answer(&self, outcome: LinkOutcome) {
        *self.0.lock() = outcome;
    }
}

#[async_trait]
impl LinkChecker for StaticLinkChecker {
    async fn check(&self, _: &str) -> Result<LandingPage, RegistryError> {
        let outcome = *self.0.lock();
        match outcome {
            LinkOutcome::Status(status) => Ok(LandingPage {
                status: Some(status),
                content_type: Some("text/html".to_string()),
                checked: Some(now()),
                ..LandingPage::default()
            }),
            LinkOutcome::Unreachable => Ok(LandingPage {
                checked: Some(now()),
                error: Some("connection refused".to_string()),
                ..LandingPage::default()
            }),
            LinkOutcome::Timeout => Err(RegistryError::timeout(ErrorOrigin::LinkCheck, "landing page timed out")),
        }
    }
}

///
/// Harness
///
/// Service wired to in-memory collaborators and a real local queue.
///

pub struct Harness {
    pub service: IdentifierService,
    pub repository: Arc<MemoryRepository>,
    pub backend: Arc<MemoryBackend>,
    pub registry: Arc<MemoryRegistry>,
    pub queue: Arc<LocalTaskQueue>,
    pub links: Arc<StaticLinkChecker>,
}

impl Harness {
    pub fn new() -> Self {
        let repository = Arc::new(MemoryRepository::new());
        let backend = Arc::new(MemoryBackend::new());
        let registry = Arc::new(MemoryRegistry::new());
        let links = Arc::new(StaticLinkChecker(Mutex::new(LinkOutcome::Status(200))));
        let (service, queue) = wire(repository.clone(), backend.clone(), registry.clone(), links.clone());

        Self {
            service,
            repository,
            backend,
            registry,
            queue,
            links,
        }
    }
}

/// Service over an arbitrary repository, with every other collaborator in memory.
pub fn service_over(repository: Arc<dyn IdentifierRepository>) -> IdentifierService {
    let links = Arc::new(StaticLinkChecker(Mutex::new(LinkOutcome::Status(200))));
    let (service, _) = wire(
        repository,
        Arc::new(MemoryBackend::new()),
        Arc::new(MemoryRegistry::new()),
        links,
    );
    service
}

fn config() -> Config {
    let mut config = Config {
        environment: Environment::Test,
        queue: QueueConfig {
            workers: 2,
            capacity: 64,
            max_attempts: 3,
            backoff_ms: 0,
        },
        ..Config::default()
    };
    config.registry.self_managed_providers = vec!["ethz".to_string()];
    config
}

fn directory() -> Directory {
    let directory = Directory::new();
    directory.add_provider(Provider::new("example", "Example Provider"));
    directory.add_provider(Provider::new("ethz", "ETH Zurich"));
    directory.add_client(Client::new("example.repo", "example", "Example Repository"));
    directory.add_client(Client::new("ethz.repo", "ethz", "ETH Repository"));
    directory.add_client(Client::new("other.repo", "example", "Other Repository"));
    directory
}

fn wire(
    repository: Arc<dyn IdentifierRepository>,
    backend: Arc<MemoryBackend>,
    registry: Arc<MemoryRegistry>,
    links: Arc<StaticLinkChecker>,
) -> (IdentifierService, Arc<LocalTaskQueue>) {
    let config = config();
    let worker = RegistrationWorker::new(registry.clone(), Arc::clone(&repository), Arc::new(now));
    let queue = Arc::new(LocalTaskQueue::start(&config.queue, Arc::new(worker)));

    let service = IdentifierService::new(ServiceParts {
        config,
        repository,
        directory: Arc::new(directory()),
        counter: Arc::new(Vec::<RelationEvent>::new()),
        backend,
        cache: Arc::new(MokaCache::new(&Default::default())),
        queue: queue.clone(),
        registry,
        link_checker: links,
        clock: Arc::new(now),
    });

    (service, queue)
}

pub fn admin(client: &str) -> Actor {
    Actor::client_admin(ClientCredentials::new(client.to_uppercase(), "secret"))
}

pub fn input(doi: &str, client: &str) -> IdentifierInput {
    IdentifierInput {
        doi: Some(doi.to_string()),
        client_id: Some(client.to_string()),
        url: Some(format!("https://example.org/{}", doi.rsplit('/').next().unwrap_or_default())),
        ..IdentifierInput::default()
    }
}

pub fn with_event(mut input: IdentifierInput, event: &str) -> IdentifierInput {
    input.event = Some(event.to_string());
    input
}

pub fn event(event: &str) -> IdentifierInput {
    IdentifierInput {
        event: Some(event.to_string()),
        ..IdentifierInput::default()
    }
}
