use crate::{
    facet::{
        AggregationKind, AggregationRequest, AggregationResult, AggregationResults, FacetValue,
    },
    casing,
    query::{Query, RangeQuery},
};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Upper bound on grouped rollup buckets.
const TOTALS_GROUP_SIZE: u32 = 10_000;
const TOTALS_STATE_SIZE: u32 = 10;

///
/// TotalsScope
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TotalsScope {
    Provider,
    Client,
    ClientExport,
    Prefix,
}

impl TotalsScope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Client => "client",
            Self::ClientExport => "client-export",
            Self::Prefix => "prefix",
        }
    }

    /// Grouping field in the search document.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Provider => "provider_id",
            Self::Client | Self::ClientExport => "client_id",
            Self::Prefix => "prefix",
        }
    }

    #[must_use]
    pub fn aggregation_name(self) -> String {
        format!("{}_totals", casing::underscore(self.as_str()))
    }

    const fn has_states(self) -> bool {
        !matches!(self, Self::ClientExport)
    }

    const fn has_this_month(self) -> bool {
        !matches!(self, Self::ClientExport)
    }

    const fn has_two_years_ago(self) -> bool {
        !matches!(self, Self::Prefix)
    }
}

impl fmt::Display for TotalsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TotalsScope {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "provider" => Ok(Self::Provider),
            "client" => Ok(Self::Client),
            "client-export" | "client_export" => Ok(Self::ClientExport),
            "prefix" => Ok(Self::Prefix),
            other => Err(format!("unknown totals scope '{other}'")),
        }
    }
}

///
/// Window
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Window {
    ThisMonth,
    ThisYear,
    LastYear,
    TwoYearsAgo,
}

impl Window {
    const fn name(self) -> &'static str {
        match self {
            Self::ThisMonth => "this_month",
            Self::ThisYear => "this_year",
            Self::LastYear => "last_year",
            Self::TwoYearsAgo => "two_years_ago",
        }
    }

    // Half-open `[from, to)` window over `created`.
    fn bounds(self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let year = today.year();
        let jan1 = |y: i32| NaiveDate::from_ymd_opt(y, 1, 1);

        match self {
            Self::ThisMonth => {
                let from = today.with_day(1)?;
                Some((from, from.checked_add_months(Months::new(1))?))
            }
            Self::ThisYear => Some((jan1(year)?, jan1(year + 1)?)),
            Self::LastYear => Some((jan1(year - 1)?, jan1(year)?)),
            Self::TwoYearsAgo => Some((jan1(year - 2)?, jan1(year - 1)?)),
        }
    }

    fn for_scope(scope: TotalsScope) -> Vec<Self> {
        let mut windows = Vec::with_capacity(4);
        if scope.has_this_month() {
            windows.push(Self::ThisMonth);
        }
        windows.push(Self::ThisYear);
        windows.push(Self::LastYear);
        if scope.has_two_years_ago() {
            windows.push(Self::TwoYearsAgo);
        }
        windows
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Grouped rollup aggregation for `scope`, with windows relative to `today`.
#[must_use]
pub fn totals_aggregation(scope: TotalsScope, today: NaiveDate) -> AggregationRequest {
    let mut sub = Vec::new();
    if scope.has_states() {
        sub.push(AggregationRequest::terms("states", "state", TOTALS_STATE_SIZE));
    }
    for window in Window::for_scope(scope) {
        if let Some((from, to)) = window.bounds(today) {
            let range = RangeQuery::dates("created", midnight(from), midnight(to));
            sub.push(AggregationRequest::filter(window.name(), Query::Range(range)));
        }
    }

    AggregationRequest {
        name: scope.aggregation_name(),
        kind: AggregationKind::Terms {
            field: scope.field().to_string(),
            size: TOTALS_GROUP_SIZE,
            top_hits: None,
            sub,
        },
    }
}

///
/// NameLookup
///
/// Resolves display names for rollup keys.
///

pub trait NameLookup {
    fn display_name(&self, scope: TotalsScope, id: &str) -> Option<String>;
}

impl<F> NameLookup for F
where
    F: Fn(TotalsScope, &str) -> Option<String>,
{
    fn display_name(&self, scope: TotalsScope, id: &str) -> Option<String> {
        self(scope, id)
    }
}

///
/// Temporal
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct Temporal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub this_month: Option<u64>,
    pub this_year: u64,
    pub last_year: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_years_ago: Option<u64>,
}

///
/// TotalsEntry
///

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct TotalsEntry {
    pub id: String,
    pub title: String,
    pub count: u64,
    pub temporal: Temporal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<FacetValue>>,
}

/// Format the rollup produced by [`totals_aggregation`].
#[must_use]
pub fn format_totals(
    scope: TotalsScope,
    results: &AggregationResults,
    names: &dyn NameLookup,
) -> Vec<TotalsEntry> {
    let Some(result) = results.get(&scope.aggregation_name()) else {
        return Vec::new();
    };

    result
        .buckets()
        .iter()
        .filter_map(|bucket| {
            let id = bucket.key.as_text();
            let title = match (names.display_name(scope, &id), scope) {
                (Some(name), _) => name,
                (None, TotalsScope::Provider) => return None,
                (None, _) => id.clone(),
            };
            let window = |w: Window| {
                bucket
                    .sub
                    .get(w.name())
                    .map_or(0, AggregationResult::doc_count)
            };
            let temporal = Temporal {
                this_month: scope.has_this_month().then(|| window(Window::ThisMonth)),
                this_year: window(Window::ThisYear),
                last_year: window(Window::LastYear),
                two_years_ago: scope.has_two_years_ago().then(|| window(Window::TwoYearsAgo)),
            };
            let states = scope.has_states().then(|| {
                bucket.sub.get("states").map_or_else(Vec::new, |states| {
                    states
                        .buckets()
                        .iter()
                        .map(|s| {
                            let key = s.key.as_text();
                            FacetValue::new(key.clone(), casing::titleize(&key), s.doc_count)
                        })
                        .collect()
                })
            });

            Some(TotalsEntry {
                id,
                title,
                count: bucket.doc_count,
                temporal,
                states,
            })
        })
        .collect()
}
