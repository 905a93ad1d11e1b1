use crate::{
    facet::{AggregationRequest, AggregationResults, to_json_map},
    model::IdentifierDocument,
    page::{ScrollId, ScrollLifetime},
    query::{Query, SortField},
};
use serde_json::{Value, json};

///
/// SearchRequest
///
/// One backend read. `sort` is `None` when hits are ordered by score alone.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SearchRequest {
    pub query: Query,
    pub sort: Option<Vec<SortField>>,
    pub from: u64,
    pub size: u32,
    pub search_after: Option<Vec<Value>>,
    pub aggregations: Vec<AggregationRequest>,
    /// Opens a scroll snapshot with this lifetime.
    pub scroll: Option<ScrollLifetime>,
}

impl SearchRequest {
    #[must_use]
    pub fn new(query: Query, size: u32) -> Self {
        Self {
            query,
            sort: None,
            from: 0,
            size,
            search_after: None,
            aggregations: Vec::new(),
            scroll: None,
        }
    }

    /// Elasticsearch-compatible `_search` body.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "query": self.query.to_json(),
            "size": self.size,
            "track_total_hits": true,
        });
        if self.from > 0 {
            body["from"] = json!(self.from);
        }
        if let Some(sort) = &self.sort {
            body["sort"] = Value::Array(sort.iter().map(SortField::to_json).collect());
        }
        if let Some(after) = &self.search_after {
            body["search_after"] = Value::Array(after.clone());
        }
        if !self.aggregations.is_empty() {
            body["aggs"] = Value::Object(to_json_map(&self.aggregations));
        }
        body
    }
}

///
/// SearchHit
///

#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub document: IdentifierDocument,
    pub score: Option<f64>,
    /// Sort values of this hit, in request sort order.
    pub sort: Vec<Value>,
}

///
/// SearchResponse
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchResponse {
    pub total: u64,
    pub hits: Vec<SearchHit>,
    pub aggregations: AggregationResults,
    pub scroll_id: Option<ScrollId>,
}

///
/// BulkOutcome
///
/// Per-item result of a bulk index call.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BulkOutcome {
    pub indexed: usize,
    /// Uids of items the backend rejected.
    pub failed: Vec<String>,
}

impl BulkOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
