//! In-memory search backend: evaluates the query tree directly over JSON
//! rows of the projected documents.

mod aggregate;
mod eval;
mod row;

use crate::{
    error::RegistryError,
    facet::AggregationResults,
    model::IdentifierDocument,
    page::{ScrollId, ScrollLifetime},
    query::{Direction, SCORE_FIELD, SortField},
    search::{BulkOutcome, SearchBackend, SearchHit, SearchRequest, SearchResponse},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use row::SortKey;
use serde_json::Value;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, VecDeque},
    fmt,
    sync::Arc,
};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

///
/// Stored
///

struct Stored {
    document: IdentifierDocument,
    row: Value,
}

///
/// Snapshot
///

struct Snapshot {
    remaining: VecDeque<SearchHit>,
    total: u64,
    size: u32,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    documents: BTreeMap<String, Stored>,
    scrolls: HashMap<String, Snapshot>,
    next_scroll: u64,
}

///
/// MemoryBackend
///

pub struct MemoryBackend {
    state: RwLock<State>,
    clock: Clock,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemoryBackend")
            .field("documents", &state.documents.len())
            .field("scrolls", &state.scrolls.len())
            .finish()
    }
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Backend whose scroll leases expire against `clock`.
    #[must_use]
    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            state: RwLock::new(State::default()),
            clock: Arc::new(clock),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, uid: &str) -> Option<IdentifierDocument> {
        self.state.read().documents.get(uid).map(|s| s.document.clone())
    }

    fn lease_deadline(&self, lifetime: ScrollLifetime) -> DateTime<Utc> {
        let lease = TimeDelta::from_std(lifetime.duration()).unwrap_or(TimeDelta::MAX);
        (self.clock)()
            .checked_add_signed(lease)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn purge_expired(&self) {
        let now = (self.clock)();
        self.state.write().scrolls.retain(|_, snapshot| snapshot.expires_at > now);
    }

    fn store(&self, document: &IdentifierDocument) -> Result<(), RegistryError> {
        let row = serde_json::to_value(document)
            .map_err(|err| RegistryError::backend_internal(format!("document is not serializable: {err}")))?;
        self.state.write().documents.insert(
            document.uid.clone(),
            Stored {
                document: document.clone(),
                row,
            },
        );
        Ok(())
    }

    // Sorted hits for every match, plus aggregations over the match set.
    fn evaluate(&self, request: &SearchRequest) -> (Vec<SearchHit>, u64, AggregationResults) {
        let state = self.state.read();
        let matched: Vec<&Stored> = state
            .documents
            .values()
            .filter(|doc| eval::matches(&request.query, &doc.row))
            .collect();
        let total = matched.len() as u64;
        let aggregations = aggregate::aggregate(&request.aggregations, &matched);

        let sort = request
            .sort
            .clone()
            .unwrap_or_else(|| vec![SortField::new(SCORE_FIELD, Direction::Desc)]);

        let mut ranked: Vec<Ranked> = matched
            .into_iter()
            .map(|doc| {
                let score = eval::score(&request.query, &doc.row, &doc.document.uid);
                let values: Vec<Value> = sort
                    .iter()
                    .map(|field| {
                        if field.field == SCORE_FIELD {
                            Value::from(score)
                        } else {
                            row::sort_value(row::values(&doc.row, &field.field).first().copied())
                        }
                    })
                    .collect();
                let keys = values.iter().map(row::sort_key).collect();

                Ranked {
                    hit: SearchHit {
                        document: doc.document.clone(),
                        score: Some(score),
                        sort: values,
                    },
                    keys,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            compare(&a.keys, &b.keys, &sort)
                .then_with(|| a.hit.document.uid.cmp(&b.hit.document.uid))
        });

        if let Some(after) = &request.search_after {
            let after: Vec<Option<SortKey>> = after.iter().map(row::sort_key).collect();
            ranked.retain(|r| compare(&r.keys, &after, &sort) == Ordering::Greater);
        }

        (ranked.into_iter().map(|r| r.hit).collect(), total, aggregations)
    }
}

struct Ranked {
    hit: SearchHit,
    keys: Vec<Option<SortKey>>,
}

fn compare(a: &[Option<SortKey>], b: &[Option<SortKey>], sort: &[SortField]) -> Ordering {
    sort.iter()
        .enumerate()
        .map(|(idx, field)| {
            row::compare_keys(
                a.get(idx).and_then(Option::as_ref),
                b.get(idx).and_then(Option::as_ref),
                field.direction == Direction::Desc,
            )
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, RegistryError> {
        eval::check_syntax(&request.query)?;
        self.purge_expired();

        let (hits, total, aggregations) = self.evaluate(request);
        let size = request.size as usize;

        if let Some(lifetime) = request.scroll {
            let mut remaining: VecDeque<SearchHit> = hits.into();
            let page: Vec<SearchHit> = remaining.drain(..size.min(remaining.len())).collect();
            let expires_at = self.lease_deadline(lifetime);

            let mut state = self.state.write();
            state.next_scroll += 1;
            let scroll_id = format!("scroll-{}", state.next_scroll);
            state.scrolls.insert(
                scroll_id.clone(),
                Snapshot {
                    remaining,
                    total,
                    size: request.size,
                    expires_at,
                },
            );

            return Ok(SearchResponse {
                total,
                hits: page,
                aggregations: AggregationResults::new(),
                scroll_id: Some(ScrollId::new(scroll_id)),
            });
        }

        let from = usize::try_from(request.from).unwrap_or(usize::MAX);
        let page = hits.into_iter().skip(from).take(size).collect();

        Ok(SearchResponse {
            total,
            hits: page,
            aggregations,
            scroll_id: None,
        })
    }

    async fn scroll(
        &self,
        scroll_id: &ScrollId,
        lifetime: ScrollLifetime,
    ) -> Result<SearchResponse, RegistryError> {
        self.purge_expired();
        let expires_at = self.lease_deadline(lifetime);

        let mut state = self.state.write();
        let Some(snapshot) = state.scrolls.get_mut(scroll_id.as_str()) else {
            return Err(RegistryError::scroll_not_found(scroll_id.as_str()));
        };
        let take = (snapshot.size as usize).min(snapshot.remaining.len());
        let hits = snapshot.remaining.drain(..take).collect();
        snapshot.expires_at = expires_at;

        Ok(SearchResponse {
            total: snapshot.total,
            hits,
            aggregations: AggregationResults::new(),
            scroll_id: Some(scroll_id.clone()),
        })
    }

    async fn index(&self, document: &IdentifierDocument) -> Result<(), RegistryError> {
        self.store(document)
    }

    async fn bulk_index(&self, documents: &[IdentifierDocument]) -> Result<BulkOutcome, RegistryError> {
        let mut outcome = BulkOutcome::default();
        for document in documents {
            match self.store(document) {
                Ok(()) => outcome.indexed += 1,
                Err(_) => outcome.failed.push(document.uid.clone()),
            }
        }
        Ok(outcome)
    }

    async fn delete(&self, uid: &str) -> Result<(), RegistryError> {
        self.state.write().documents.remove(uid);
        Ok(())
    }
}
