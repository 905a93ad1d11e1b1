use super::*;
use crate::{
    facet::{FacetRegistry, TotalsScope},
    lifecycle::IdentifierState,
    model::{Client, Identifier, IdentifierDocument, Provider, RelationCounts},
    page::{PageMeta, PageRequest, ScrollId, ScrollLifetime},
    query::{Query, SearchParams, TEST_SEED},
    types::{ClientId, Doi, ProviderId},
};
use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn doc(suffix: &str, provider: &str, state: IdentifierState, offset_minutes: i64) -> IdentifierDocument {
    let created = base_time() + TimeDelta::minutes(offset_minutes);
    let mut identifier = Identifier::draft(
        Doi::parse(&format!("10.5072/{suffix}")).expect("doi should parse"),
        ClientId::new(&format!("{provider}.repo")),
        ProviderId::new(provider),
        created,
    );
    identifier.state = state;
    identifier.url = Some(format!("https://example.org/{suffix}"));
    identifier.publication_year = Some(2020);
    identifier.metadata.titles = vec![serde_json::json!({ "title": format!("Ocean study {suffix}") })];

    let client = Client::new(&format!("{provider}.repo"), provider, "Repository");
    let owner = Provider::new(provider, &provider.to_uppercase());
    IdentifierDocument::project(&identifier, Some(&client), Some(&owner), RelationCounts::default())
}

async fn seeded() -> MemoryBackend {
    let backend = MemoryBackend::new();
    let mut docs = Vec::new();
    for n in 0..5 {
        docs.push(doc(&format!("find-{n}"), "example", IdentifierState::Findable, n));
    }
    for n in 0..3 {
        docs.push(doc(&format!("draft-{n}"), "example", IdentifierState::Draft, 10 + n));
    }
    for n in 0..2 {
        docs.push(doc(&format!("other-{n}"), "other", IdentifierState::Findable, 20 + n));
    }
    let outcome = backend.bulk_index(&docs).await.expect("bulk index should succeed");
    assert_eq!(outcome.indexed, 10);
    backend
}

fn params(pairs: &[(&str, &str)]) -> SearchParams {
    SearchParams::from_pairs(pairs.iter().copied()).expect("params should parse")
}

fn no_names(_: TotalsScope, _: &str) -> Option<String> {
    None
}

fn options() -> SearchOptions<'static> {
    SearchOptions {
        seed: TEST_SEED,
        today: NaiveDate::from_ymd_opt(2024, 6, 1).expect("date should be valid"),
        names: &no_names,
    }
}

#[tokio::test]
async fn filtered_offset_page_reports_total_and_page_count() {
    let backend = seeded().await;
    let params = params(&[("state", "findable"), ("provider-id", "EXAMPLE")]);

    let results = execute(&backend, &params, &PageRequest::offset(1, 2), options())
        .await
        .expect("search should succeed");

    assert_eq!(results.hits.len(), 2);
    assert_eq!(
        results.meta,
        PageMeta::Offset {
            total: 5,
            total_pages: 3,
            page: 1
        }
    );
    assert!(results.hits.iter().all(|hit| hit.provider_id == "example"));
}

#[tokio::test]
async fn facet_counts_never_exceed_the_total() {
    let backend = seeded().await;
    let params = params(&[("provider-id", "example")]);

    let results = execute(&backend, &params, &PageRequest::default(), options())
        .await
        .expect("search should succeed");
    let total = results.meta.total();

    assert_eq!(total, 8);
    for name in results.facets.names() {
        let facet = results.facets.get(name).expect("listed facet should exist");
        assert!(facet.iter().all(|value| value.count <= total), "{name} bucket over total");
    }
    let states = results.facets.get("states").expect("states facet should be present");
    assert_eq!(states.iter().map(|v| v.count).sum::<u64>(), total);
}

#[tokio::test]
async fn multi_valued_facets_may_sum_past_the_total() {
    let backend = MemoryBackend::new();
    let mut docs = Vec::new();
    for (suffix, subjects, affiliations) in [
        ("multi-0", vec!["ocean", "ice"], vec![("ror-1", "Polar Institute"), ("ror-2", "Ocean Lab")]),
        ("multi-1", vec!["ocean"], vec![("ror-1", "Polar Institute")]),
    ] {
        let created = base_time();
        let mut identifier = Identifier::draft(
            Doi::parse(&format!("10.5072/{suffix}")).expect("doi should parse"),
            ClientId::new("example.repo"),
            ProviderId::new("example"),
            created,
        );
        identifier.state = IdentifierState::Findable;
        identifier.metadata.subjects = subjects
            .into_iter()
            .map(|subject| serde_json::json!({ "subject": subject }))
            .collect();
        let affiliation: Vec<_> = affiliations
            .into_iter()
            .map(|(id, name)| serde_json::json!({ "affiliationIdentifier": id, "name": name }))
            .collect();
        identifier.metadata.creators = vec![serde_json::json!({ "name": "Doe, Jane", "affiliation": affiliation })];
        docs.push(IdentifierDocument::project(&identifier, None, None, RelationCounts::default()));
    }
    backend.bulk_index(&docs).await.expect("bulk index should succeed");

    let results = execute(&backend, &params(&[]), &PageRequest::default(), options())
        .await
        .expect("search should succeed");
    let total = results.meta.total();
    let sum = |name: &str| -> u64 {
        results
            .facets
            .get(name)
            .map(|values| values.iter().map(|v| v.count).sum())
            .unwrap_or_default()
    };

    assert_eq!(total, 2);
    assert_eq!(sum("subjects"), 3);
    assert_eq!(sum("affiliations"), 3);
    let registry = FacetRegistry::identifiers();
    for dimension in registry.dimensions() {
        let Some(values) = results.facets.get(dimension.name) else {
            continue;
        };
        if dimension.is_metric() {
            continue;
        }
        assert!(values.iter().all(|v| v.count <= total), "{} bucket over total", dimension.name);
        if !dimension.is_multi_valued() {
            assert!(sum(dimension.name) <= total, "{} sums past the total", dimension.name);
        }
    }
    assert!(registry.get("subjects").is_some_and(|d| d.is_multi_valued()));
    assert!(registry.get("states").is_some_and(|d| !d.is_multi_valued()));
}

#[tokio::test]
async fn empty_result_has_no_facets() {
    let backend = seeded().await;
    let params = params(&[("provider-id", "nobody")]);

    let results = execute(&backend, &params, &PageRequest::default(), options())
        .await
        .expect("search should succeed");

    assert_eq!(results.meta.total(), 0);
    assert!(results.facets.is_empty());
}

async fn collect_with_cursor(backend: &MemoryBackend, params: &SearchParams, size: u32) -> Vec<String> {
    let mut seen = Vec::new();
    let mut token = String::new();
    loop {
        let page = PageRequest::cursor(size, &token);
        let results = execute(backend, params, &page, options())
            .await
            .expect("cursor page should succeed");
        seen.extend(results.hits.iter().map(|hit| hit.uid.clone()));
        match results.meta {
            PageMeta::Cursor {
                next_cursor: Some(next),
                ..
            } => token = next,
            _ => break,
        }
    }
    seen
}

#[tokio::test]
async fn cursor_traversal_matches_the_unpaged_ordering() {
    let backend = seeded().await;
    let params = SearchParams::default();

    let paged = collect_with_cursor(&backend, &params, 3).await;
    let unpaged = collect_with_cursor(&backend, &params, 100).await;

    assert_eq!(paged.len(), 10);
    assert_eq!(paged, unpaged);
}

#[tokio::test]
async fn cursor_traversal_survives_inserts_with_later_timestamps() {
    let backend = seeded().await;
    let params = SearchParams::default();

    let first = execute(&backend, &params, &PageRequest::cursor(4, ""), options())
        .await
        .expect("first page should succeed");
    let PageMeta::Cursor {
        next_cursor: Some(mut token),
        ..
    } = first.meta
    else {
        panic!("a full first page should carry a next cursor");
    };
    let mut seen: Vec<String> = first.hits.iter().map(|hit| hit.uid.clone()).collect();

    backend
        .index(&doc("late-0", "example", IdentifierState::Findable, 500))
        .await
        .expect("insert should succeed");

    loop {
        let results = execute(&backend, &params, &PageRequest::cursor(4, &token), options())
            .await
            .expect("page should succeed");
        seen.extend(results.hits.iter().map(|hit| hit.uid.clone()));
        match results.meta {
            PageMeta::Cursor {
                next_cursor: Some(next),
                ..
            } => token = next,
            _ => break,
        }
    }

    let mut deduped = seen.clone();
    deduped.dedup();
    assert_eq!(deduped, seen, "no identifier should repeat");
    assert_eq!(seen.len(), 11);
    assert_eq!(seen.last().map(String::as_str), Some("10.5072/late-0"));
}

#[tokio::test]
async fn scroll_walks_the_snapshot_without_facets() {
    let backend = seeded().await;
    let params = SearchParams::default();
    let lifetime = ScrollLifetime::new(Duration::from_secs(60));

    let opened = execute(&backend, &params, &PageRequest::scroll(4, lifetime, None), options())
        .await
        .expect("scroll should open");
    assert!(opened.facets.is_empty());
    let PageMeta::Scroll {
        total,
        scroll_id: Some(handle),
    } = opened.meta
    else {
        panic!("scroll response should carry a handle");
    };
    assert_eq!(total, 10);

    let mut seen = opened.hits.len();
    loop {
        let page = PageRequest::scroll(4, lifetime, Some(handle.clone()));
        let next = execute(&backend, &params, &page, options())
            .await
            .expect("scroll should resume");
        if next.hits.is_empty() {
            break;
        }
        seen += next.hits.len();
    }
    assert_eq!(seen, 10);
}

#[tokio::test]
async fn expired_scroll_handle_is_not_found() {
    let now = Arc::new(Mutex::new(base_time()));
    let clock = Arc::clone(&now);
    let backend = MemoryBackend::with_clock(move || *clock.lock());
    backend
        .index(&doc("a", "example", IdentifierState::Findable, 0))
        .await
        .expect("index should succeed");
    let lifetime = ScrollLifetime::new(Duration::from_secs(30));

    let mut request = SearchRequest::new(Query::MatchAll, 1);
    request.scroll = Some(lifetime);
    let opened = backend.search(&request).await.expect("scroll should open");
    let handle = opened.scroll_id.expect("scroll should return a handle");

    *now.lock() += TimeDelta::seconds(31);
    let err = backend
        .scroll(&handle, lifetime)
        .await
        .expect_err("expired scroll should fail");

    assert!(err.is_not_found());
    assert!(
        backend
            .scroll(&ScrollId::new("scroll-unknown"), lifetime)
            .await
            .expect_err("unknown scroll should fail")
            .is_not_found()
    );
}

#[tokio::test]
async fn random_mode_is_reproducible_for_a_seed() {
    let backend = seeded().await;
    let params = params(&[("random", "true")]);

    let first = execute(&backend, &params, &PageRequest::offset(1, 10), options())
        .await
        .expect("search should succeed");
    let second = execute(&backend, &params, &PageRequest::offset(1, 10), options())
        .await
        .expect("search should succeed");

    assert_eq!(first.hits, second.hits);
    assert_eq!(first.meta.total(), 10);
}

#[tokio::test]
async fn free_text_matches_titles_and_malformed_text_is_rejected() {
    let backend = seeded().await;

    let found = execute(&backend, &params(&[("query", "find-3")]), &PageRequest::default(), options())
        .await
        .expect("search should succeed");
    assert_eq!(found.meta.total(), 1);
    assert_eq!(found.hits[0].uid, "10.5072/find-3");

    let err = execute(
        &backend,
        &params(&[("query", "\"unterminated")]),
        &PageRequest::default(),
        options(),
    )
    .await
    .expect_err("unbalanced quote should fail");
    assert_eq!(err.class, crate::error::ErrorClass::QuerySyntax);
}

#[tokio::test]
async fn free_text_operators_select_by_range_existence_and_similarity() {
    let backend = MemoryBackend::new();
    let mut docs = Vec::new();
    for (n, (year, citations, url)) in [(2014, 0, true), (2020, 3, false), (2022, 12, true)]
        .into_iter()
        .enumerate()
    {
        let mut doc = doc(&format!("op-{n}"), "example", IdentifierState::Findable, 0);
        doc.publication_year = Some(year);
        doc.counts.citation_count = citations;
        if !url {
            doc.url = None;
        }
        docs.push(doc);
    }
    backend.bulk_index(&docs).await.expect("bulk index should succeed");

    let total = |query: &'static str| {
        let backend = &backend;
        async move {
            execute(backend, &params(&[("query", query)]), &PageRequest::default(), options())
                .await
                .expect("search should succeed")
                .meta
                .total()
        }
    };

    assert_eq!(total("ocean").await, 3);
    assert_eq!(total("url:*").await, 2);
    assert_eq!(total("-url:*").await, 1);
    assert_eq!(total("citationCount:[1 TO *]").await, 2);
    assert_eq!(total("citationCount:{3 TO 12]").await, 1);
    assert_eq!(total("publicationYear:>2015").await, 2);
    assert_eq!(total("publicationYear:<=2014").await, 1);
    assert_eq!(total("ocan~1").await, 3);
    assert_eq!(total("titles:oc?an").await, 3);
    assert_eq!(total("titles:ocean^2 AND publicationYear:2022").await, 1);
}

#[tokio::test]
async fn sample_groups_return_hits_per_group() {
    let backend = seeded().await;
    let params = params(&[("sample-group", "provider"), ("sample", "2")]);

    let results = execute(&backend, &params, &PageRequest::default(), options())
        .await
        .expect("search should succeed");

    assert_eq!(results.hits.len(), 4);
    assert_eq!(
        results.meta,
        PageMeta::Offset {
            total: 4,
            total_pages: 1,
            page: 1
        }
    );
}

#[tokio::test]
async fn client_totals_roll_up_per_client() {
    let backend = seeded().await;
    let params = params(&[("totals", "client")]);

    let results = execute(&backend, &params, &PageRequest::default(), options())
        .await
        .expect("search should succeed");
    let totals = results.totals.expect("totals should be present");

    assert_eq!(totals.len(), 2);
    assert_eq!(totals[0].id, "example.repo");
    assert_eq!(totals[0].count, 8);
    assert_eq!(totals[0].temporal.this_year, 8);
    assert_eq!(totals[0].temporal.last_year, 0);
}

#[tokio::test]
async fn deleted_documents_drop_out_of_results() {
    let backend = seeded().await;
    backend.delete("10.5072/find-0").await.expect("delete should succeed");

    assert_eq!(backend.len(), 9);
    assert!(backend.get("10.5072/find-0").is_none());
}
