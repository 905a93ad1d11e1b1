//! Bucket computation over the full match set.

use super::{Stored, eval, row};
use crate::facet::{AggregationKind, AggregationRequest, AggregationResult, AggregationResults, Bucket, BucketKey};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

pub(super) fn aggregate(requests: &[AggregationRequest], docs: &[&Stored]) -> AggregationResults {
    requests
        .iter()
        .map(|request| (request.name.clone(), run(&request.kind, docs)))
        .collect()
}

fn run(kind: &AggregationKind, docs: &[&Stored]) -> AggregationResult {
    match kind {
        AggregationKind::Terms {
            field,
            size,
            top_hits,
            sub,
        } => {
            let mut groups: BTreeMap<BucketKey, Vec<&Stored>> = BTreeMap::new();
            for &doc in docs {
                let keys: BTreeSet<BucketKey> = row::values(&doc.row, field)
                    .into_iter()
                    .filter_map(bucket_key)
                    .collect();
                for key in keys {
                    groups.entry(key).or_default().push(doc);
                }
            }

            let mut groups: Vec<_> = groups.into_iter().collect();
            groups.sort_by(|(ka, da), (kb, db)| db.len().cmp(&da.len()).then_with(|| ka.cmp(kb)));
            groups.truncate(*size as usize);

            let buckets = groups
                .into_iter()
                .map(|(key, members)| {
                    let mut bucket = Bucket::new(key, members.len() as u64);
                    bucket.sub = aggregate(sub, &members);
                    if let Some(n) = top_hits {
                        bucket.hits = members
                            .iter()
                            .take(*n as usize)
                            .map(|doc| doc.document.clone())
                            .collect();
                    }
                    bucket
                })
                .collect();

            AggregationResult::Buckets(buckets)
        }
        AggregationKind::YearHistogram {
            field, metric_sum, ..
        } => {
            let mut years: BTreeMap<i32, (u64, f64)> = BTreeMap::new();
            for doc in docs {
                let Some(year) = row::values(&doc.row, field).into_iter().find_map(row::year_of) else {
                    continue;
                };
                let metric: f64 = metric_sum.as_deref().map_or(0.0, |metric| {
                    row::values(&doc.row, metric)
                        .into_iter()
                        .filter_map(Value::as_f64)
                        .sum()
                });
                let slot = years.entry(year).or_default();
                slot.0 += 1;
                slot.1 += metric;
            }

            let buckets = years
                .into_iter()
                .map(|(year, (count, metric))| {
                    let mut bucket = Bucket::new(BucketKey::Int(i64::from(year)), count);
                    if metric_sum.is_some() {
                        bucket.metric = Some(metric);
                    }
                    bucket
                })
                .collect();

            AggregationResult::Buckets(buckets)
        }
        AggregationKind::Filter { query, sub } => {
            let members: Vec<&Stored> = docs
                .iter()
                .copied()
                .filter(|doc| eval::matches(query, &doc.row))
                .collect();

            AggregationResult::Filter {
                doc_count: members.len() as u64,
                sub: aggregate(sub, &members),
            }
        }
    }
}

fn bucket_key(value: &Value) -> Option<BucketKey> {
    match value {
        Value::String(text) => Some(BucketKey::Text(text.clone())),
        Value::Number(number) => number.as_i64().map(BucketKey::Int),
        Value::Bool(flag) => Some(BucketKey::Text(flag.to_string())),
        _ => None,
    }
}
