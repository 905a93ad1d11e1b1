use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

/// Expansion cap for phrase-prefix queries.
pub const PHRASE_PREFIX_MAX_EXPANSIONS: u32 = 50;

///
/// Query
///
/// Backend-neutral boolean query tree. `to_json` renders the
/// Elasticsearch-compatible wire form; the in-memory backend evaluates the
/// tree directly.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    MatchAll,
    QueryString(QueryString),
    PhrasePrefix(PhrasePrefix),
    Term {
        field: String,
        value: TermValue,
        case_insensitive: bool,
    },
    Terms {
        field: String,
        values: Vec<TermValue>,
    },
    Range(RangeQuery),
    Exists {
        field: String,
    },
    Bool(BoolQuery),
    FunctionScore {
        query: Box<Self>,
        seed: String,
    },
}

impl Query {
    pub fn term(field: &str, value: impl Into<TermValue>) -> Self {
        Self::Term {
            field: field.to_string(),
            value: value.into(),
            case_insensitive: false,
        }
    }

    pub fn term_ci(field: &str, value: impl Into<TermValue>) -> Self {
        Self::Term {
            field: field.to_string(),
            value: value.into(),
            case_insensitive: true,
        }
    }

    pub fn terms<V: Into<TermValue>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self::Terms {
            field: field.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn exists(field: &str) -> Self {
        Self::Exists {
            field: field.to_string(),
        }
    }

    #[must_use]
    pub fn gte(field: &str, bound: RangeBound) -> Self {
        Self::Range(RangeQuery {
            field: field.to_string(),
            gte: Some(bound),
            lt: None,
            lte: None,
        })
    }

    /// OR of case-insensitive terms, one per value.
    pub fn any_ci<'a>(field: &str, values: impl IntoIterator<Item = &'a String>) -> Self {
        Self::Bool(BoolQuery {
            should: values.into_iter().map(|v| Self::term_ci(field, v.as_str())).collect(),
            minimum_should_match: Some(1),
            ..BoolQuery::default()
        })
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::MatchAll => json!({ "match_all": {} }),
            Self::QueryString(q) => json!({
                "query_string": {
                    "query": q.query,
                    "fields": q.fields,
                    "default_operator": "AND",
                    "phrase_slop": q.phrase_slop,
                }
            }),
            Self::PhrasePrefix(q) => json!({
                "multi_match": {
                    "query": q.query,
                    "fields": q.fields,
                    "type": "phrase_prefix",
                    "max_expansions": q.max_expansions,
                }
            }),
            Self::Term {
                field,
                value,
                case_insensitive,
            } => {
                if *case_insensitive {
                    json!({ "term": { field: { "value": value.to_json(), "case_insensitive": true } } })
                } else {
                    json!({ "term": { field: value.to_json() } })
                }
            }
            Self::Terms { field, values } => {
                let values: Vec<Value> = values.iter().map(TermValue::to_json).collect();
                json!({ "terms": { field: values } })
            }
            Self::Range(range) => range.to_json(),
            Self::Exists { field } => json!({ "exists": { "field": field } }),
            Self::Bool(bool_query) => bool_query.to_json(),
            Self::FunctionScore { query, seed } => json!({
                "function_score": {
                    "query": query.to_json(),
                    "random_score": { "seed": seed, "field": "_seq_no" },
                }
            }),
        }
    }
}

///
/// QueryString
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueryString {
    /// Rendered, escaped query in the backend dialect.
    pub query: String,
    /// Boosted field list, `field^boost`.
    pub fields: Vec<String>,
    pub phrase_slop: u32,
}

///
/// PhrasePrefix
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PhrasePrefix {
    pub query: String,
    pub fields: Vec<String>,
    pub max_expansions: u32,
}

///
/// TermValue
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TermValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl TermValue {
    fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Int(int) => json!(int),
            Self::Bool(flag) => Value::Bool(*flag),
        }
    }
}

impl From<&str> for TermValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TermValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for TermValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for TermValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for TermValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

///
/// RangeBound
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RangeBound {
    Int(i64),
    /// Compared at year granularity, rounded the way `yyyy||/y` rounds.
    Year(i32),
    Date(DateTime<Utc>),
}

impl RangeBound {
    fn to_json(self) -> Value {
        match self {
            Self::Int(int) => json!(int),
            Self::Year(year) => Value::String(format!("{year}||/y")),
            Self::Date(at) => Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

///
/// RangeQuery
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RangeQuery {
    pub field: String,
    pub gte: Option<RangeBound>,
    pub lt: Option<RangeBound>,
    pub lte: Option<RangeBound>,
}

impl RangeQuery {
    /// Inclusive year window.
    #[must_use]
    pub fn years(field: &str, min: i32, max: i32) -> Self {
        Self {
            field: field.to_string(),
            gte: Some(RangeBound::Year(min)),
            lt: None,
            lte: Some(RangeBound::Year(max)),
        }
    }

    /// Half-open date window `[from, to)`.
    #[must_use]
    pub fn dates(field: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            field: field.to_string(),
            gte: Some(RangeBound::Date(from)),
            lt: Some(RangeBound::Date(to)),
            lte: None,
        }
    }

    fn to_json(&self) -> Value {
        let mut body = Map::new();
        let mut year_format = false;
        for (key, bound) in [("gte", self.gte), ("lt", self.lt), ("lte", self.lte)] {
            if let Some(bound) = bound {
                year_format |= matches!(bound, RangeBound::Year(_));
                body.insert(key.to_string(), bound.to_json());
            }
        }
        if year_format {
            body.insert("format".to_string(), Value::String("yyyy".to_string()));
        }

        json!({ "range": { self.field.clone(): body } })
    }
}

///
/// BoolQuery
///
/// Empty clause lists are omitted from the wire form.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<Query>,
    pub filter: Vec<Query>,
    pub should: Vec<Query>,
    pub must_not: Vec<Query>,
    pub minimum_should_match: Option<u32>,
}

impl BoolQuery {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.filter.is_empty()
            && self.should.is_empty()
            && self.must_not.is_empty()
    }

    fn to_json(&self) -> Value {
        let mut body = Map::new();
        for (key, clauses) in [
            ("must", &self.must),
            ("filter", &self.filter),
            ("should", &self.should),
            ("must_not", &self.must_not),
        ] {
            if !clauses.is_empty() {
                body.insert(
                    key.to_string(),
                    Value::Array(clauses.iter().map(Query::to_json).collect()),
                );
            }
        }
        if let Some(minimum) = self.minimum_should_match {
            body.insert("minimum_should_match".to_string(), json!(minimum));
        }

        json!({ "bool": body })
    }
}
