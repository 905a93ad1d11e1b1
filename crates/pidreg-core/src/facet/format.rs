use crate::{
    casing,
    facet::{
        AggregationResults, Bucket, FacetRegistry, FacetSelection, Formatter,
        labels::{self, AGENCIES, LICENSES, SOURCES},
    },
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SCHEMA_VERSION_PREFIX: &str = "http://datacite.org/schema/kernel-";
const FOS_PREFIX: &str = "FOS: ";
const FIRST_PUBLISHED_YEAR: i32 = 2010;
const RECENT_YEARS: usize = 10;

///
/// FacetValue
///

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct FacetValue {
    pub id: String,
    pub title: String,
    pub count: u64,
}

impl FacetValue {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, count: u64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            count,
        }
    }
}

///
/// Facets
///
/// Formatted facets keyed by dimension name. Empty when the base total is
/// zero or faceting is disabled.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Facets(BTreeMap<String, Vec<FacetValue>>);

impl Facets {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[FacetValue]> {
        self.0.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

///
/// FacetContext
///

#[derive(Clone, Copy, Debug)]
pub struct FacetContext {
    pub today: NaiveDate,
}

/// Format raw aggregation results into facets.
///
/// Every bucket of a record-count dimension is at most `total`. Counts of a
/// single-valued dimension also sum to at most `total`; a multi-valued one
/// (subjects, affiliations, licenses and the like) counts a record once per
/// value and can sum past it. Metric dimensions carry summed counters and
/// have no bound. See [`crate::facet::FacetDimension::is_multi_valued`].
#[must_use]
pub fn format_facets(
    registry: &FacetRegistry,
    selection: &FacetSelection,
    total: u64,
    results: &AggregationResults,
    context: FacetContext,
) -> Facets {
    if total == 0 || selection.is_disabled() {
        return Facets::default();
    }

    let mut facets = BTreeMap::new();
    for dimension in registry.dimensions() {
        if !selection.includes(dimension.name) {
            continue;
        }
        let Some(result) = results.get(dimension.name) else {
            continue;
        };
        let values = format_buckets(dimension.formatter, result.buckets(), context);
        facets.insert(dimension.name.to_string(), values);
    }

    Facets(facets)
}

fn format_buckets(formatter: Formatter, buckets: &[Bucket], context: FacetContext) -> Vec<FacetValue> {
    match formatter {
        Formatter::RecentYears => {
            let mut values = by_year(buckets);
            values.truncate(RECENT_YEARS);
            values
        }
        Formatter::PublishedYears => {
            let current = context.today.year();
            let mut values: Vec<_> = buckets
                .iter()
                .filter_map(|b| b.key.as_year().map(|year| (year, b.doc_count)))
                .filter(|(year, _)| (FIRST_PUBLISHED_YEAR..=current).contains(year))
                .map(|(year, count)| FacetValue::new(year.to_string(), year.to_string(), count))
                .collect();
            values.sort_by(|a, b| b.id.cmp(&a.id));
            values
        }
        Formatter::MetricByYear => {
            let mut values: Vec<_> = buckets
                .iter()
                .filter_map(|b| {
                    let year = b.key.as_year()?;
                    let sum = metric_count(b.metric?);
                    (sum > 0).then(|| FacetValue::new(year.to_string(), year.to_string(), sum))
                })
                .collect();
            values.sort_by(|a, b| b.id.cmp(&a.id));
            values
        }
        keyed => buckets
            .iter()
            .map(|b| {
                let key = b.key.as_text();
                let (id, title) = format_key(keyed, &key);
                FacetValue::new(id, title, b.doc_count)
            })
            .collect(),
    }
}

fn format_key(formatter: Formatter, key: &str) -> (String, String) {
    match formatter {
        Formatter::ByKey => (key.to_string(), casing::titleize(key)),
        Formatter::CombinedKey => split_combined(key),
        Formatter::ResourceType => {
            let (id, title) = split_combined(key);
            (casing::dasherize(&id), title)
        }
        Formatter::Schema => {
            let version = key.strip_prefix(SCHEMA_VERSION_PREFIX).unwrap_or(key);
            (version.to_string(), format!("Schema {version}"))
        }
        Formatter::License => {
            let title = labels::lookup(LICENSES, key).map_or_else(|| key.to_uppercase(), str::to_string);
            (key.to_string(), title)
        }
        Formatter::Source => {
            let title = labels::lookup(SOURCES, key).map_or_else(|| casing::titleize(key), str::to_string);
            (key.to_string(), title)
        }
        Formatter::Agency => {
            let title = labels::lookup(AGENCIES, key).map_or_else(|| key.to_string(), str::to_string);
            (key.to_string(), title)
        }
        Formatter::FieldOfScience => {
            let title = key.strip_prefix(FOS_PREFIX).unwrap_or(key);
            (casing::parameterize(title), title.to_string())
        }
        Formatter::Plain
        | Formatter::RecentYears
        | Formatter::PublishedYears
        | Formatter::MetricByYear => (key.to_string(), key.to_string()),
    }
}

fn split_combined(key: &str) -> (String, String) {
    match key.split_once(':') {
        Some((id, title)) => (id.to_string(), title.to_string()),
        None => (key.to_string(), key.to_string()),
    }
}

fn by_year(buckets: &[Bucket]) -> Vec<FacetValue> {
    let mut values: Vec<_> = buckets
        .iter()
        .filter_map(|b| {
            let year = b.key.as_year()?;
            Some(FacetValue::new(year.to_string(), year.to_string(), b.doc_count))
        })
        .collect();
    values.sort_by(|a, b| b.id.cmp(&a.id));
    values
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn metric_count(sum: f64) -> u64 {
    if sum.is_finite() && sum > 0.0 {
        sum.round() as u64
    } else {
        0
    }
}
