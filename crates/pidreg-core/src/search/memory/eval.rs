//! Query evaluation and scoring against a stored row.

use super::row::{parse_date, text_of, values, year_of};
use crate::{
    error::RegistryError,
    query::{
        Query, RangeBound, RangeQuery, TermValue,
        text::{self, Comparison, RangeEnd, TextQuery},
    },
};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;

/// Reject free-text clauses the way a backend returns a parse failure.
pub(super) fn check_syntax(query: &Query) -> Result<(), RegistryError> {
    match query {
        Query::QueryString(q) => text::parse(&q.query)
            .map(|_| ())
            .map_err(|err| RegistryError::query_syntax(format!("failed to parse query: {err}"))),
        Query::Bool(b) => b
            .must
            .iter()
            .chain(&b.filter)
            .chain(&b.should)
            .chain(&b.must_not)
            .try_for_each(check_syntax),
        Query::FunctionScore { query, .. } => check_syntax(query),
        _ => Ok(()),
    }
}

pub(super) fn matches(query: &Query, row: &Value) -> bool {
    match query {
        Query::MatchAll => true,
        Query::QueryString(q) => match text::parse(&q.query) {
            Ok(Some(parsed)) => text_matches(&parsed, row, &field_names(&q.fields)),
            Ok(None) => true,
            Err(_) => false,
        },
        Query::PhrasePrefix(q) => {
            let phrase = q.query.to_lowercase();
            field_names(&q.fields)
                .iter()
                .any(|field| field_texts(row, field).any(|t| t.contains(&phrase)))
        }
        Query::Term {
            field,
            value,
            case_insensitive,
        } => values(row, field)
            .into_iter()
            .any(|v| term_eq(v, value, *case_insensitive)),
        Query::Terms { field, values: terms } => values(row, field)
            .into_iter()
            .any(|v| terms.iter().any(|t| term_eq(v, t, false))),
        Query::Range(range) => values(row, &range.field)
            .into_iter()
            .any(|v| within(v, range)),
        Query::Exists { field } => !values(row, field).is_empty(),
        Query::Bool(b) => {
            let minimum = b.minimum_should_match.map_or_else(
                || usize::from(b.must.is_empty() && b.filter.is_empty() && !b.should.is_empty()),
                |m| m as usize,
            );
            b.must.iter().all(|q| matches(q, row))
                && b.filter.iter().all(|q| matches(q, row))
                && !b.must_not.iter().any(|q| matches(q, row))
                && b.should.iter().filter(|q| matches(q, row)).count() >= minimum
        }
        Query::FunctionScore { query, .. } => matches(query, row),
    }
}

/// Relevance of a matching row. Filter-only queries score zero.
pub(super) fn score(query: &Query, row: &Value, uid: &str) -> f64 {
    match query {
        Query::MatchAll | Query::Term { .. } | Query::Terms { .. } | Query::Range(_) | Query::Exists { .. } => 1.0,
        Query::QueryString(q) => match text::parse(&q.query) {
            Ok(Some(parsed)) => boosted(&q.fields, |field| text_matches(&parsed, row, &[field])),
            _ => 1.0,
        },
        Query::PhrasePrefix(q) => {
            let phrase = q.query.to_lowercase();
            boosted(&q.fields, |field| field_texts(row, field).any(|t| t.contains(&phrase)))
        }
        Query::Bool(b) => b
            .must
            .iter()
            .chain(b.should.iter().filter(|q| matches(q, row)))
            .map(|q| score(q, row, uid))
            .sum(),
        Query::FunctionScore { seed, .. } => random_score(seed, uid),
    }
}

// Sum of boosts of fields that match on their own; at least 1 for a match.
fn boosted(fields: &[String], mut field_matches: impl FnMut(&str) -> bool) -> f64 {
    let sum: f64 = fields
        .iter()
        .map(|f| split_boost(f))
        .filter(|(field, _)| field_matches(field))
        .map(|(_, boost)| boost)
        .sum();
    sum.max(1.0)
}

#[allow(clippy::cast_precision_loss)]
fn random_score(seed: &str, uid: &str) -> f64 {
    let digest = Sha256::new()
        .chain_update(seed.as_bytes())
        .chain_update(b":")
        .chain_update(uid.as_bytes())
        .finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);

    u64::from_be_bytes(head) as f64 / u64::MAX as f64
}

fn split_boost(field: &str) -> (&str, f64) {
    match field.split_once('^') {
        Some((name, boost)) => (name, boost.parse().unwrap_or(1.0)),
        None => (field, 1.0),
    }
}

fn field_names(fields: &[String]) -> Vec<&str> {
    fields.iter().map(|f| split_boost(f).0).collect()
}

fn field_texts<'a>(row: &'a Value, field: &str) -> impl Iterator<Item = String> + 'a {
    values(row, field).into_iter().filter_map(text_of)
}

fn text_matches(query: &TextQuery, row: &Value, fields: &[&str]) -> bool {
    match query {
        TextQuery::Term(term) | TextQuery::Phrase(term) => {
            let needle = term.to_lowercase();
            fields
                .iter()
                .any(|field| field_texts(row, field).any(|t| t.contains(&needle)))
        }
        TextQuery::Prefix(stem) => {
            let stem = stem.to_lowercase();
            fields.iter().any(|field| {
                field_texts(row, field).any(|t| {
                    t.starts_with(&stem)
                        || t.split(|c: char| !c.is_alphanumeric())
                            .any(|word| word.starts_with(&stem))
                })
            })
        }
        TextQuery::Wildcard(pattern) => {
            let pattern = glob_parts(&pattern.to_lowercase());
            fields.iter().any(|field| {
                field_texts(row, field).any(|t| {
                    let whole: Vec<char> = t.chars().collect();
                    glob_matches(&pattern, &whole)
                        || words(&t).any(|word| glob_matches(&pattern, &word.chars().collect::<Vec<_>>()))
                })
            })
        }
        TextQuery::Fuzzy { term, edits } => {
            let term = term.to_lowercase();
            let limit = fuzzy_limit(&term, *edits);
            fields.iter().any(|field| {
                field_texts(row, field).any(|t| words(&t).any(|word| edit_distance(word, &term) <= limit))
            })
        }
        TextQuery::Proximity { phrase, .. } => {
            let phrase = phrase.to_lowercase();
            fields.iter().any(|field| {
                field_texts(row, field).any(|t| phrase.split_whitespace().all(|word| t.contains(word)))
            })
        }
        TextQuery::Range { lower, upper } => fields
            .iter()
            .any(|field| values(row, field).into_iter().any(|v| in_text_range(v, lower, upper))),
        TextQuery::Compare { op, value } => fields.iter().any(|field| {
            values(row, field)
                .into_iter()
                .any(|v| compare_text(v, value).is_some_and(|ord| holds(*op, ord)))
        }),
        TextQuery::Exists(field) => !values(row, field).is_empty(),
        TextQuery::Field { field, query } => text_matches(query, row, &[field.as_str()]),
        TextQuery::Boost { query, .. } => text_matches(query, row, fields),
        TextQuery::And(items) => items.iter().all(|q| text_matches(q, row, fields)),
        TextQuery::Or(items) => items.iter().any(|q| text_matches(q, row, fields)),
        TextQuery::Not(inner) => !text_matches(inner, row, fields),
    }
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|word| !word.is_empty())
}

///
/// GlobPart
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum GlobPart {
    Any,
    One,
    Literal(char),
}

// Unescaped `*` and `?` are wildcards; `\x` is a literal `x`.
fn glob_parts(pattern: &str) -> Vec<GlobPart> {
    let mut parts = Vec::new();
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        parts.push(match ch {
            '*' => GlobPart::Any,
            '?' => GlobPart::One,
            '\\' => GlobPart::Literal(chars.next().unwrap_or('\\')),
            other => GlobPart::Literal(other),
        });
    }
    parts
}

fn glob_matches(pattern: &[GlobPart], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut resume: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(GlobPart::Any) => {
                resume = Some((p, t));
                p += 1;
            }
            Some(GlobPart::One) => {
                p += 1;
                t += 1;
            }
            Some(GlobPart::Literal(ch)) if *ch == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match resume {
                Some((star, from)) => {
                    p = star + 1;
                    t = from + 1;
                    resume = Some((star, from + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|part| *part == GlobPart::Any)
}

// Unset edits follow the backend's length-based default.
fn fuzzy_limit(term: &str, edits: Option<u8>) -> usize {
    edits.map_or_else(
        || match term.chars().count() {
            0..=2 => 0,
            3..=5 => 1,
            _ => 2,
        },
        usize::from,
    )
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == *cb {
                diagonal
            } else {
                1 + diagonal.min(row[j]).min(above)
            };
            diagonal = above;
        }
    }

    row[b.len()]
}

// Numbers compare numerically, strings lexically (ISO dates order correctly).
fn compare_text(value: &Value, bound: &str) -> Option<Ordering> {
    match value {
        Value::Number(number) => number.as_f64()?.partial_cmp(&bound.parse::<f64>().ok()?),
        Value::String(text) => Some(text.as_str().cmp(bound)),
        _ => None,
    }
}

const fn holds(op: Comparison, ord: Ordering) -> bool {
    match op {
        Comparison::Gt => ord.is_gt(),
        Comparison::Gte => ord.is_ge(),
        Comparison::Lt => ord.is_lt(),
        Comparison::Lte => ord.is_le(),
    }
}

fn in_text_range(value: &Value, lower: &RangeEnd, upper: &RangeEnd) -> bool {
    let side = |end: &RangeEnd, inclusive: Comparison, exclusive: Comparison| {
        end.value.as_deref().is_none_or(|bound| {
            let op = if end.inclusive { inclusive } else { exclusive };
            compare_text(value, bound).is_some_and(|ord| holds(op, ord))
        })
    };

    side(lower, Comparison::Gte, Comparison::Gt) && side(upper, Comparison::Lte, Comparison::Lt)
}

fn term_eq(value: &Value, term: &TermValue, case_insensitive: bool) -> bool {
    match (value, term) {
        (Value::String(s), TermValue::Text(t)) if case_insensitive => s.eq_ignore_ascii_case(t),
        (Value::String(s), TermValue::Text(t)) => s == t,
        (Value::String(s), TermValue::Int(i)) => *s == i.to_string(),
        (Value::Number(n), TermValue::Int(i)) => n.as_i64() == Some(*i),
        (Value::Number(n), TermValue::Text(t)) => n.to_string() == *t,
        (Value::Bool(b), TermValue::Bool(t)) => b == t,
        (Value::Bool(b), TermValue::Text(t)) => b.to_string() == *t,
        _ => false,
    }
}

fn within(value: &Value, range: &RangeQuery) -> bool {
    let holds = |bound: Option<RangeBound>, accept: fn(Ordering) -> bool| {
        bound.is_none_or(|bound| compare_bound(value, bound).is_some_and(accept))
    };

    holds(range.gte, Ordering::is_ge) && holds(range.lt, Ordering::is_lt) && holds(range.lte, Ordering::is_le)
}

#[allow(clippy::cast_precision_loss)]
fn compare_bound(value: &Value, bound: RangeBound) -> Option<Ordering> {
    match bound {
        RangeBound::Int(int) => value.as_f64()?.partial_cmp(&(int as f64)),
        RangeBound::Year(year) => Some(year_of(value)?.cmp(&year)),
        RangeBound::Date(at) => Some(parse_date(value)?.cmp(&at)),
    }
}
