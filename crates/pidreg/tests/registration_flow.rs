mod common;

use common::{Harness, admin, event, input, with_event};
use pidreg::{
    actor::{Actor, ClientCredentials, Role},
    registration::{RegistryCall, ResolutionRegistry},
};
use pidreg_core::{error::ErrorClass, types::Doi};
use reqwest::StatusCode;

fn doi(raw: &str) -> Doi {
    Doi::parse(raw).expect("doi should parse")
}

#[tokio::test]
async fn publishing_binds_the_url_once() {
    let harness = Harness::new();

    let committed = harness
        .service
        .create(with_event(input("10.5072/bind-1", "example.repo"), "publish"), &admin("example.repo"))
        .await
        .expect("findable should be created");
    harness.queue.drain().await;

    assert!(committed.task.is_some());
    assert_eq!(
        harness.registry.bound_url(&doi("10.5072/bind-1")).as_deref(),
        Some("https://example.org/bind-1")
    );
    assert_eq!(harness.registry.calls().len(), 1);
    assert_eq!(harness.queue.stats().completed, 1);
}

#[tokio::test]
async fn drafts_and_unprivileged_callers_dispatch_nothing() {
    let harness = Harness::new();

    let draft = harness
        .service
        .create(input("10.5072/quiet-1", "example.repo"), &admin("example.repo"))
        .await
        .expect("draft should be created");
    let user = harness
        .service
        .create(
            with_event(input("10.5072/quiet-2", "example.repo"), "publish"),
            &Actor {
                role: Role::User,
                credentials: Some(ClientCredentials::new("EXAMPLE.REPO", "secret")),
            },
        )
        .await
        .expect("findable should be created");
    harness.queue.drain().await;

    assert!(draft.task.is_none());
    assert!(user.task.is_none());
    assert!(harness.registry.calls().is_empty());
}

#[tokio::test]
async fn binding_the_same_identifier_twice_is_safe() {
    let harness = Harness::new();
    let actor = admin("example.repo");

    harness
        .service
        .create(with_event(input("10.5072/twice", "example.repo"), "publish"), &actor)
        .await
        .expect("findable should be created");
    harness
        .service
        .update("10.5072/twice", event("show"), &actor)
        .await
        .expect("no-op update should succeed");
    harness.queue.drain().await;

    assert_eq!(harness.registry.calls().len(), 2);
    assert_eq!(
        harness.registry.bound_url(&doi("10.5072/twice")).as_deref(),
        Some("https://example.org/twice")
    );
    assert_eq!(harness.queue.stats().abandoned, 0);
}

#[tokio::test]
async fn unavailable_registry_is_retried_by_the_queue() {
    let harness = Harness::new();
    harness.registry.fail_next(StatusCode::SERVICE_UNAVAILABLE, "maintenance");

    harness
        .service
        .create(with_event(input("10.5072/retry", "example.repo"), "publish"), &admin("example.repo"))
        .await
        .expect("findable should be created");
    harness.queue.drain().await;

    let stats = harness.queue.stats();
    assert_eq!(stats.redelivered, 1);
    assert_eq!(stats.completed, 1);
    assert!(harness.registry.bound_url(&doi("10.5072/retry")).is_some());
}

#[tokio::test]
async fn another_clients_credentials_never_reach_the_registry() {
    let harness = Harness::new();

    let committed = harness
        .service
        .create(with_event(input("10.5072/owned-1", "example.repo"), "publish"), &admin("other.repo"))
        .await
        .expect("the save itself should succeed");
    harness.queue.drain().await;

    assert!(committed.task.is_none());
    assert!(harness.registry.calls().is_empty());
    assert_eq!(harness.queue.stats().completed, 0);
}

#[tokio::test]
async fn rejected_credentials_are_terminal() {
    let harness = Harness::new();
    harness.registry.fail_next(StatusCode::UNAUTHORIZED, "bad credentials");

    harness
        .service
        .create(with_event(input("10.5072/denied", "example.repo"), "publish"), &admin("example.repo"))
        .await
        .expect("the save itself should succeed");
    harness.queue.drain().await;

    assert_eq!(harness.queue.stats().abandoned, 1);
    assert_eq!(harness.registry.calls().len(), 1);
    assert!(harness.registry.bound_url(&doi("10.5072/denied")).is_none());
}

#[tokio::test]
async fn self_managed_providers_refresh_instead_of_binding() {
    let harness = Harness::new();
    harness.registry.preload(doi("10.5072/ethz-1"), "https://research.ethz.ch/ethz-1");

    harness
        .service
        .create(with_event(input("10.5072/ethz-1", "ethz.repo"), "publish"), &admin("ethz.repo"))
        .await
        .expect("findable should be created");
    harness.queue.drain().await;

    assert_eq!(harness.registry.calls(), vec![RegistryCall::Fetch { doi: doi("10.5072/ethz-1") }]);
    let stored = harness.service.find("10.5072/ethz-1").await.expect("identifier should exist");
    assert_eq!(stored.url.as_deref(), Some("https://research.ethz.ch/ethz-1"));
}

#[tokio::test]
async fn get_url_answers_locally_or_from_the_registry() {
    let harness = Harness::new();
    let actor = admin("example.repo");
    harness
        .service
        .create(input("10.5072/local", "example.repo"), &actor)
        .await
        .expect("draft should be created");
    harness
        .service
        .create(with_event(input("10.5072/remote", "example.repo"), "publish"), &actor)
        .await
        .expect("findable should be created");
    harness.queue.drain().await;

    let local = harness.service.get_url("10.5072/local", &actor).await.expect("draft url should be local");
    assert_eq!(local, "https://example.org/local");
    let before = harness.registry.calls().len();

    let remote = harness.service.get_url("10.5072/remote", &actor).await.expect("registry should answer");
    assert_eq!(remote, "https://example.org/remote");
    assert_eq!(harness.registry.calls().len(), before + 1);

    let err = harness
        .service
        .get_url("10.5072/remote", &Actor::anonymous())
        .await
        .expect_err("anonymous callers cannot query the registry");
    assert_eq!(err.class, ErrorClass::PermissionDenied);
}

#[tokio::test]
async fn registry_errors_surface_through_fetch() {
    let harness = Harness::new();
    harness.registry.fail_next(StatusCode::BAD_REQUEST, "responseCode=301");

    let err = harness
        .registry
        .fetch_url(&doi("10.5072/elsewhere"), &ClientCredentials::new("EXAMPLE.REPO", "secret"))
        .await
        .expect_err("scripted failure should surface");

    assert_eq!(err.class, ErrorClass::NotAuthoritative);
    assert_eq!(err.upstream_status(), Some(400));
}
