use super::*;
use chrono::NaiveDate;
use serde_json::json;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).expect("fixed date should be valid")
}

fn context() -> FacetContext {
    FacetContext { today: today() }
}

fn text(key: &str, count: u64) -> Bucket {
    Bucket::new(BucketKey::Text(key.to_string()), count)
}

fn year(key: i64, count: u64) -> Bucket {
    Bucket::new(BucketKey::Int(key), count)
}

fn results(entries: Vec<(&str, Vec<Bucket>)>) -> AggregationResults {
    entries
        .into_iter()
        .map(|(name, buckets)| (name.to_string(), AggregationResult::Buckets(buckets)))
        .collect()
}

fn format(total: u64, raw: &AggregationResults) -> Facets {
    format_facets(
        &FacetRegistry::identifiers(),
        &FacetSelection::default(),
        total,
        raw,
        context(),
    )
}

#[test]
fn zero_total_returns_every_facet_absent() {
    let raw = results(vec![("states", vec![text("findable", 3)])]);

    let facets = format(0, &raw);

    assert!(facets.is_empty());
    assert_eq!(facets.get("states"), None);
}

#[test]
fn combined_keys_split_into_id_and_title() {
    let raw = results(vec![
        ("providers", vec![text("example:Example Provider", 5)]),
        ("resourceTypes", vec![text("journal_article:Journal Article", 2)]),
    ]);

    let facets = format(5, &raw);

    assert_eq!(
        facets.get("providers"),
        Some(&[FacetValue::new("example", "Example Provider", 5)][..])
    );
    assert_eq!(
        facets.get("resourceTypes"),
        Some(&[FacetValue::new("journal-article", "Journal Article", 2)][..])
    );
}

#[test]
fn keyed_formatters_apply_fixed_labels() {
    let raw = results(vec![
        ("states", vec![text("findable", 4)]),
        ("schemaVersions", vec![text("http://datacite.org/schema/kernel-4", 4)]),
        ("licenses", vec![text("cc-by-4.0", 3), text("custom-1", 1)]),
        ("sources", vec![text("fabricaForm", 2), text("mds", 2)]),
        ("registrationAgencies", vec![text("datacite", 4)]),
        (
            "fieldsOfScience",
            vec![text("FOS: Computer and information sciences", 1)],
        ),
    ]);

    let facets = format(4, &raw);

    assert_eq!(facets.get("states"), Some(&[FacetValue::new("findable", "Findable", 4)][..]));
    assert_eq!(
        facets.get("schemaVersions"),
        Some(&[FacetValue::new("4", "Schema 4", 4)][..])
    );
    assert_eq!(
        facets.get("licenses"),
        Some(
            &[
                FacetValue::new("cc-by-4.0", "CC-BY-4.0", 3),
                FacetValue::new("custom-1", "CUSTOM-1", 1),
            ][..]
        )
    );
    assert_eq!(
        facets.get("sources"),
        Some(
            &[
                FacetValue::new("fabricaForm", "Fabrica Form", 2),
                FacetValue::new("mds", "MDS", 2),
            ][..]
        )
    );
    assert_eq!(
        facets.get("registrationAgencies"),
        Some(&[FacetValue::new("datacite", "DataCite", 4)][..])
    );
    assert_eq!(
        facets.get("fieldsOfScience"),
        Some(
            &[FacetValue::new(
                "computer_and_information_sciences",
                "Computer and information sciences",
                1
            )][..]
        )
    );
}

#[test]
fn published_years_drop_future_and_pre_2010_years() {
    let raw = results(vec![(
        "published",
        vec![year(2005, 1), year(2015, 2), year(2024, 3), year(2030, 4)],
    )]);

    let facets = format(10, &raw);

    assert_eq!(
        facets.get("published"),
        Some(
            &[
                FacetValue::new("2024", "2024", 3),
                FacetValue::new("2015", "2015", 2),
            ][..]
        )
    );
}

#[test]
fn created_years_keep_the_ten_most_recent() {
    let buckets = (2000..2015).map(|y| year(y, 1)).collect();
    let raw = results(vec![("created", buckets)]);

    let facets = format(15, &raw);
    let created = facets.get("created").expect("created facet should be present");

    assert_eq!(created.len(), 10);
    assert_eq!(created[0].id, "2014");
    assert_eq!(created[9].id, "2005");
}

#[test]
fn metric_facets_emit_yearly_sums_and_drop_zero_years() {
    let mut with_views = year(2020, 4);
    with_views.metric = Some(12.0);
    let mut without_views = year(2021, 2);
    without_views.metric = Some(0.0);
    let raw = results(vec![("views", vec![with_views, without_views])]);

    let facets = format(6, &raw);

    assert_eq!(facets.get("views"), Some(&[FacetValue::new("2020", "2020", 12)][..]));
}

#[test]
fn selection_limits_and_disables_dimensions() {
    let registry = FacetRegistry::identifiers();
    let selection = FacetSelection::default().with_include("states,resource_types");

    let names: Vec<_> = registry
        .aggregations(&selection)
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["states".to_string(), "resourceTypes".to_string()]);

    assert!(registry.aggregations(&FacetSelection::default().with_size(0)).is_empty());
    assert!(registry.aggregations(&FacetSelection::disabled()).is_empty());
    assert!(
        registry
            .aggregations(&FacetSelection::default().with_include("none"))
            .is_empty()
    );
}

#[test]
fn disabled_selection_stays_disabled_after_include() {
    let selection = FacetSelection::disabled().with_include("all");

    assert!(selection.is_disabled());
}

#[test]
fn facet_count_overrides_terms_size() {
    let registry = FacetRegistry::identifiers();
    let selection = FacetSelection::default().with_size(3).with_include("states");

    let aggs = registry.aggregations(&selection);

    assert_eq!(
        aggs[0].to_json(),
        json!({ "terms": { "field": "state", "size": 3, "min_doc_count": 1 } })
    );
}

#[test]
fn metric_dimension_renders_histogram_with_sum() {
    let registry = FacetRegistry::identifiers();
    let citations = registry.get("citations").expect("citations should be registered");

    assert_eq!(
        citations.aggregation(10).to_json(),
        json!({
            "histogram": { "field": "publication_year", "interval": 1, "min_doc_count": 1 },
            "aggs": { "metric_count": { "sum": { "field": "citation_count" } } }
        })
    );
}

#[test]
fn totals_scope_parses_known_values() {
    assert_eq!("client-export".parse::<TotalsScope>(), Ok(TotalsScope::ClientExport));
    assert_eq!("Provider".parse::<TotalsScope>(), Ok(TotalsScope::Provider));
    assert!("consortium".parse::<TotalsScope>().is_err());
}

fn sub_names(request: &AggregationRequest) -> Vec<String> {
    match &request.kind {
        AggregationKind::Terms { sub, .. } => sub.iter().map(|s| s.name.clone()).collect(),
        other => panic!("totals should be a terms aggregation, got {other:?}"),
    }
}

#[test]
fn totals_windows_follow_scope() {
    assert_eq!(
        sub_names(&totals_aggregation(TotalsScope::Provider, today())),
        vec!["states", "this_month", "this_year", "last_year", "two_years_ago"]
    );
    assert_eq!(
        sub_names(&totals_aggregation(TotalsScope::ClientExport, today())),
        vec!["this_year", "last_year", "two_years_ago"]
    );
    assert_eq!(
        sub_names(&totals_aggregation(TotalsScope::Prefix, today())),
        vec!["states", "this_month", "this_year", "last_year"]
    );
}

#[test]
fn this_month_window_is_half_open_calendar_month() {
    let request = totals_aggregation(TotalsScope::Client, today());
    let AggregationKind::Terms { sub, .. } = &request.kind else {
        panic!("totals should be a terms aggregation");
    };
    let this_month = sub
        .iter()
        .find(|s| s.name == "this_month")
        .expect("this_month should be present");

    assert_eq!(
        this_month.to_json(),
        json!({
            "filter": {
                "range": {
                    "created": {
                        "gte": "2024-06-01T00:00:00.000Z",
                        "lt": "2024-07-01T00:00:00.000Z"
                    }
                }
            }
        })
    );
}

fn rollup_bucket(key: &str, count: u64) -> Bucket {
    let mut bucket = text(key, count);
    bucket.sub.insert(
        "states".to_string(),
        AggregationResult::Buckets(vec![text("findable", count)]),
    );
    for (window, n) in [("this_month", 1), ("this_year", 2), ("last_year", 3), ("two_years_ago", 4)] {
        bucket.sub.insert(
            window.to_string(),
            AggregationResult::Filter {
                doc_count: n,
                sub: AggregationResults::new(),
            },
        );
    }
    bucket
}

#[test]
fn provider_totals_drop_unknown_providers() {
    let raw: AggregationResults = [(
        "provider_totals".to_string(),
        AggregationResult::Buckets(vec![rollup_bucket("example", 9), rollup_bucket("ghost", 1)]),
    )]
    .into_iter()
    .collect();
    let names = |_: TotalsScope, id: &str| (id == "example").then(|| "Example Provider".to_string());

    let entries = format_totals(TotalsScope::Provider, &raw, &names);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Example Provider");
    assert_eq!(entries[0].count, 9);
    assert_eq!(
        entries[0].temporal,
        Temporal {
            this_month: Some(1),
            this_year: 2,
            last_year: 3,
            two_years_ago: Some(4),
        }
    );
    assert_eq!(
        entries[0].states,
        Some(vec![FacetValue::new("findable", "Findable", 9)])
    );
}

#[test]
fn client_export_totals_omit_states_and_this_month() {
    let raw: AggregationResults = [(
        "client_export_totals".to_string(),
        AggregationResult::Buckets(vec![rollup_bucket("example.repo", 2)]),
    )]
    .into_iter()
    .collect();
    let names = |_: TotalsScope, _: &str| -> Option<String> { None };

    let entries = format_totals(TotalsScope::ClientExport, &raw, &names);

    assert_eq!(entries[0].title, "example.repo");
    assert_eq!(entries[0].states, None);
    assert_eq!(entries[0].temporal.this_month, None);
    let rendered = serde_json::to_value(&entries[0]).expect("entry should serialize");
    assert!(rendered.get("states").is_none());
    assert!(rendered["temporal"].get("this_month").is_none());
}
