//! Response decoding for the Elasticsearch-compatible wire format. Every
//! function here is pure so the shapes can be pinned by fixtures.

use pidreg_core::{
    error::{ErrorClass, ErrorOrigin, RegistryError},
    facet::{AggregationKind, AggregationRequest, AggregationResult, AggregationResults, Bucket, BucketKey},
    model::IdentifierDocument,
    page::ScrollId,
    search::{BulkOutcome, SearchHit, SearchResponse},
};
use serde_json::Value;

/// Decode a `_search` (or `_search/scroll`) response. Aggregations are read
/// back using the shapes that were requested.
pub fn search_response(body: &Value, requested: &[AggregationRequest]) -> Result<SearchResponse, RegistryError> {
    let hits = &body["hits"];
    let total = match &hits["total"] {
        Value::Number(number) => number.as_u64().unwrap_or_default(),
        total => total["value"].as_u64().unwrap_or_default(),
    };

    let hits = hits["hits"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(hit)
        .collect::<Result<Vec<_>, _>>()?;

    let aggregations = aggregations(&body["aggregations"], requested)?;
    let scroll_id = body["_scroll_id"].as_str().map(ScrollId::new);

    Ok(SearchResponse {
        total,
        hits,
        aggregations,
        scroll_id,
    })
}

fn hit(raw: &Value) -> Result<SearchHit, RegistryError> {
    Ok(SearchHit {
        document: source(raw)?,
        score: raw["_score"].as_f64(),
        sort: raw["sort"].as_array().cloned().unwrap_or_default(),
    })
}

fn source(raw: &Value) -> Result<IdentifierDocument, RegistryError> {
    serde_json::from_value(raw["_source"].clone())
        .map_err(|err| RegistryError::backend_internal(format!("undecodable document: {err}")))
}

fn aggregations(body: &Value, requested: &[AggregationRequest]) -> Result<AggregationResults, RegistryError> {
    let mut results = AggregationResults::new();
    for request in requested {
        let raw = &body[request.name.as_str()];
        if raw.is_null() {
            continue;
        }
        results.insert(request.name.clone(), aggregation(&request.kind, raw)?);
    }

    Ok(results)
}

fn aggregation(kind: &AggregationKind, raw: &Value) -> Result<AggregationResult, RegistryError> {
    match kind {
        AggregationKind::Terms { sub, top_hits, .. } => {
            let buckets = buckets(raw)
                .iter()
                .filter_map(|bucket| {
                    let key = term_key(&bucket["key"])?;
                    Some((key, bucket))
                })
                .map(|(key, raw)| {
                    let mut bucket = Bucket::new(key, doc_count(raw));
                    bucket.sub = aggregations(raw, sub)?;
                    if top_hits.is_some() {
                        bucket.hits = raw["hits"]["hits"]["hits"]
                            .as_array()
                            .map(Vec::as_slice)
                            .unwrap_or_default()
                            .iter()
                            .map(source)
                            .collect::<Result<_, _>>()?;
                    }
                    Ok(bucket)
                })
                .collect::<Result<Vec<_>, RegistryError>>()?;

            Ok(AggregationResult::Buckets(buckets))
        }
        AggregationKind::YearHistogram { metric_sum, .. } => {
            let buckets = buckets(raw)
                .iter()
                .filter_map(|raw| {
                    let year = year_key(raw)?;
                    let mut bucket = Bucket::new(BucketKey::Int(year), doc_count(raw));
                    if metric_sum.is_some() {
                        bucket.metric = Some(raw["metric_count"]["value"].as_f64().unwrap_or_default());
                    }
                    Some(bucket)
                })
                .collect();

            Ok(AggregationResult::Buckets(buckets))
        }
        AggregationKind::Filter { sub, .. } => Ok(AggregationResult::Filter {
            doc_count: doc_count(raw),
            sub: aggregations(raw, sub)?,
        }),
    }
}

fn buckets(raw: &Value) -> &[Value] {
    raw["buckets"].as_array().map(Vec::as_slice).unwrap_or_default()
}

fn doc_count(raw: &Value) -> u64 {
    raw["doc_count"].as_u64().unwrap_or_default()
}

fn term_key(raw: &Value) -> Option<BucketKey> {
    match raw {
        Value::String(text) => Some(BucketKey::Text(text.clone())),
        Value::Number(number) => number.as_i64().map(BucketKey::Int),
        Value::Bool(flag) => Some(BucketKey::Text(flag.to_string())),
        _ => None,
    }
}

// Date histograms report the formatted year in `key_as_string`; numeric
// histograms report the year as a float key.
#[allow(clippy::cast_possible_truncation)]
fn year_key(raw: &Value) -> Option<i64> {
    if let Some(text) = raw["key_as_string"].as_str() {
        return text.get(..4)?.parse().ok();
    }

    raw["key"].as_f64().map(|key| key as i64)
}

/// Decode a `_bulk` response into indexed and rejected uids.
#[must_use]
pub fn bulk_response(body: &Value) -> BulkOutcome {
    let mut outcome = BulkOutcome::default();
    for item in body["items"].as_array().map(Vec::as_slice).unwrap_or_default() {
        let action = &item["index"];
        let status = action["status"].as_u64().unwrap_or_default();
        if action["error"].is_null() && (200..300).contains(&status) {
            outcome.indexed += 1;
        } else if let Some(uid) = action["_id"].as_str() {
            outcome.failed.push(uid.to_string());
        }
    }

    outcome
}

/// Most specific reason in an error body, falling back to the raw text.
#[must_use]
pub fn error_reason(raw: &str) -> String {
    let Ok(body) = serde_json::from_str::<Value>(raw) else {
        return raw.to_string();
    };
    let error = &body["error"];

    error["root_cause"][0]["reason"]
        .as_str()
        .or_else(|| error["reason"].as_str())
        .or_else(|| error.as_str())
        .map_or_else(|| raw.to_string(), ToString::to_string)
}

/// Map a non-success status onto an error class.
#[must_use]
pub fn status_error(status: u16, raw: &str, scroll: Option<&ScrollId>) -> RegistryError {
    match status {
        400 => RegistryError::query_syntax(error_reason(raw)),
        404 if scroll.is_some() => {
            RegistryError::scroll_not_found(scroll.map(ScrollId::as_str).unwrap_or_default())
        }
        404 => RegistryError::new(ErrorClass::NotFound, ErrorOrigin::Backend, error_reason(raw)),
        429 | 500.. => RegistryError::backend_unavailable(format!("search backend returned {status}: {}", error_reason(raw))),
        _ => RegistryError::backend_internal(format!("search backend returned {status}: {}", error_reason(raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pidreg_core::query::Query;
    use serde_json::json;

    fn document(uid: &str) -> Value {
        json!({
            "uid": uid,
            "doi": uid.to_uppercase(),
            "url": null,
            "state": "findable",
            "client_id": "example.repo",
            "client_id_and_name": "example.repo:Example Repository",
            "provider_id": "example",
            "provider_id_and_name": "example:Example Provider",
            "prefix": "10.5072",
            "agency": "datacite",
            "created": "2024-01-02T00:00:00Z",
            "updated": "2024-01-02T00:00:00Z",
        })
    }

    #[test]
    fn hits_total_and_scroll_id_are_decoded() {
        let body = json!({
            "_scroll_id": "c2Nyb2xs",
            "hits": {
                "total": { "value": 7, "relation": "eq" },
                "hits": [
                    { "_score": 1.5, "_source": document("10.5072/a"), "sort": [1_704_153_600_000_i64, "10.5072/a"] }
                ]
            }
        });

        let response = search_response(&body, &[]).expect("response should decode");

        assert_eq!(response.total, 7);
        assert_eq!(response.hits.len(), 1);
        assert_eq!(response.hits[0].document.uid, "10.5072/a");
        assert_eq!(response.hits[0].score, Some(1.5));
        assert_eq!(response.hits[0].sort.len(), 2);
        assert_eq!(response.scroll_id.as_ref().map(ScrollId::as_str), Some("c2Nyb2xs"));
    }

    #[test]
    fn aggregations_follow_the_requested_shapes() {
        let requested = vec![
            AggregationRequest::terms("states", "state", 10),
            AggregationRequest {
                name: "created".to_string(),
                kind: AggregationKind::YearHistogram {
                    field: "created".to_string(),
                    calendar: true,
                    metric_sum: None,
                },
            },
            AggregationRequest {
                name: "views".to_string(),
                kind: AggregationKind::YearHistogram {
                    field: "publication_year".to_string(),
                    calendar: false,
                    metric_sum: Some("view_count".to_string()),
                },
            },
            AggregationRequest::filter("this_year", Query::MatchAll),
        ];
        let body = json!({
            "hits": { "total": 3, "hits": [] },
            "aggregations": {
                "states": { "buckets": [ { "key": "findable", "doc_count": 2 }, { "key": "draft", "doc_count": 1 } ] },
                "created": { "buckets": [ { "key": 1_704_067_200_000_i64, "key_as_string": "2024", "doc_count": 3 } ] },
                "views": { "buckets": [ { "key": 2019.0, "doc_count": 2, "metric_count": { "value": 41.0 } } ] },
                "this_year": { "doc_count": 3 }
            }
        });

        let response = search_response(&body, &requested).expect("response should decode");
        let aggs = &response.aggregations;

        assert_eq!(aggs["states"].buckets()[0].key, BucketKey::Text("findable".to_string()));
        assert_eq!(aggs["states"].buckets()[1].doc_count, 1);
        assert_eq!(aggs["created"].buckets()[0].key, BucketKey::Int(2024));
        assert_eq!(aggs["views"].buckets()[0].key, BucketKey::Int(2019));
        assert_eq!(aggs["views"].buckets()[0].metric, Some(41.0));
        assert_eq!(aggs["this_year"].doc_count(), 3);
    }

    #[test]
    fn bulk_failures_are_reported_by_uid() {
        let body = json!({
            "errors": true,
            "items": [
                { "index": { "_id": "10.5072/a", "status": 201 } },
                { "index": { "_id": "10.5072/b", "status": 400, "error": { "type": "mapper_parsing_exception" } } }
            ]
        });

        let outcome = bulk_response(&body);

        assert_eq!(outcome.indexed, 1);
        assert_eq!(outcome.failed, vec!["10.5072/b".to_string()]);
    }

    #[test]
    fn statuses_map_onto_error_classes() {
        let rejected = r#"{"error":{"root_cause":[{"type":"query_shard_exception","reason":"Failed to parse query [title:(]"}],"reason":"all shards failed"}}"#;

        let err = status_error(400, rejected, None);
        assert_eq!(err.class, ErrorClass::QuerySyntax);
        assert_eq!(err.message, "Failed to parse query [title:(]");

        let scroll = ScrollId::new("gone");
        assert!(status_error(404, "{}", Some(&scroll)).is_not_found());
        assert!(status_error(503, "unavailable", None).is_retryable());
        assert!(!status_error(409, "conflict", None).is_retryable());
    }
}
