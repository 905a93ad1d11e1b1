use crate::{model::IdentifierDocument, query::Query};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

///
/// AggregationRequest
///

#[derive(Clone, Debug, PartialEq)]
pub struct AggregationRequest {
    pub name: String,
    pub kind: AggregationKind,
}

///
/// AggregationKind
///

#[derive(Clone, Debug, PartialEq)]
pub enum AggregationKind {
    /// Top `size` values by document count.
    Terms {
        field: String,
        size: u32,
        /// Hits kept per bucket (grouped sampling).
        top_hits: Option<u32>,
        sub: Vec<AggregationRequest>,
    },
    /// One bucket per year. `calendar` marks date fields; otherwise the
    /// field holds the year as an integer.
    YearHistogram {
        field: String,
        calendar: bool,
        metric_sum: Option<String>,
    },
    /// Single bucket of documents matching `query`.
    Filter {
        query: Query,
        sub: Vec<AggregationRequest>,
    },
}

impl AggregationRequest {
    #[must_use]
    pub fn terms(name: &str, field: &str, size: u32) -> Self {
        Self {
            name: name.to_string(),
            kind: AggregationKind::Terms {
                field: field.to_string(),
                size,
                top_hits: None,
                sub: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn filter(name: &str, query: Query) -> Self {
        Self {
            name: name.to_string(),
            kind: AggregationKind::Filter {
                query,
                sub: Vec::new(),
            },
        }
    }

    /// Elasticsearch-compatible wire form of one named aggregation body.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match &self.kind {
            AggregationKind::Terms {
                field,
                size,
                top_hits,
                sub,
            } => {
                let mut body = json!({
                    "terms": { "field": field, "size": size, "min_doc_count": 1 }
                });
                let mut aggs = to_json_map(sub);
                if let Some(hits) = top_hits {
                    aggs.insert("hits".to_string(), json!({ "top_hits": { "size": hits } }));
                }
                if !aggs.is_empty() {
                    body["aggs"] = Value::Object(aggs);
                }
                body
            }
            AggregationKind::YearHistogram {
                field,
                calendar,
                metric_sum,
            } => {
                let mut body = if *calendar {
                    json!({
                        "date_histogram": {
                            "field": field,
                            "calendar_interval": "year",
                            "format": "yyyy",
                            "min_doc_count": 1
                        }
                    })
                } else {
                    json!({ "histogram": { "field": field, "interval": 1, "min_doc_count": 1 } })
                };
                if let Some(metric) = metric_sum {
                    body["aggs"] = json!({ "metric_count": { "sum": { "field": metric } } });
                }
                body
            }
            AggregationKind::Filter { query, sub } => {
                let mut body = json!({ "filter": query.to_json() });
                if !sub.is_empty() {
                    body["aggs"] = Value::Object(to_json_map(sub));
                }
                body
            }
        }
    }
}

/// `{ name: body }` map for a set of aggregations.
#[must_use]
pub fn to_json_map(requests: &[AggregationRequest]) -> Map<String, Value> {
    requests
        .iter()
        .map(|request| (request.name.clone(), request.to_json()))
        .collect()
}

///
/// AggregationResult
///

#[derive(Clone, Debug, Default, PartialEq)]
pub enum AggregationResult {
    #[default]
    Empty,
    Buckets(Vec<Bucket>),
    Filter {
        doc_count: u64,
        sub: AggregationResults,
    },
}

impl AggregationResult {
    #[must_use]
    pub fn buckets(&self) -> &[Bucket] {
        match self {
            Self::Buckets(buckets) => buckets,
            Self::Empty | Self::Filter { .. } => &[],
        }
    }

    #[must_use]
    pub const fn doc_count(&self) -> u64 {
        match self {
            Self::Filter { doc_count, .. } => *doc_count,
            Self::Empty | Self::Buckets(_) => 0,
        }
    }
}

/// Results keyed by aggregation name.
pub type AggregationResults = BTreeMap<String, AggregationResult>;

///
/// BucketKey
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum BucketKey {
    Int(i64),
    Text(String),
}

impl BucketKey {
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Int(int) => int.to_string(),
            Self::Text(text) => text.clone(),
        }
    }

    #[must_use]
    pub fn as_year(&self) -> Option<i32> {
        match self {
            Self::Int(int) => i32::try_from(*int).ok(),
            Self::Text(text) => text.get(..4)?.parse().ok(),
        }
    }
}

///
/// Bucket
///

#[derive(Clone, Debug, PartialEq)]
pub struct Bucket {
    pub key: BucketKey,
    pub doc_count: u64,
    /// Metric sub-aggregation value, when requested.
    pub metric: Option<f64>,
    pub sub: AggregationResults,
    pub hits: Vec<IdentifierDocument>,
}

impl Bucket {
    #[must_use]
    pub fn new(key: BucketKey, doc_count: u64) -> Self {
        Self {
            key,
            doc_count,
            metric: None,
            sub: AggregationResults::new(),
            hits: Vec::new(),
        }
    }
}
