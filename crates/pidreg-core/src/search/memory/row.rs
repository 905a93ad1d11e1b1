//! Field access over the JSON form of a stored document.

use chrono::{DateTime, Datelike, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// Leaf values at a dotted path. Arrays flatten at every step and nulls
/// are dropped.
pub(super) fn values<'a>(row: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![row];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            if let Some(child) = value.get(segment) {
                flatten(child, &mut next);
            }
        }
        current = next;
    }
    current
}

fn flatten<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| flatten(item, out)),
        Value::Null => {}
        other => out.push(other),
    }
}

pub(super) fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    value.as_str()?.parse().ok()
}

/// Year of a timestamp string or an integer year.
pub(super) fn year_of(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => i32::try_from(number.as_i64()?).ok(),
        Value::String(text) => parse_date(value)
            .map(|at| at.year())
            .or_else(|| text.get(..4)?.parse().ok()),
        _ => None,
    }
}

/// Lowercased text form used by free-text matching.
pub(super) fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.to_lowercase()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

///
/// SortKey
///
/// Timestamps order as epoch millis.
///

#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub(super) enum SortKey {
    Num(f64),
    Text(String),
}

#[allow(clippy::cast_precision_loss)]
pub(super) fn sort_key(value: &Value) -> Option<SortKey> {
    match value {
        Value::Number(number) => number.as_f64().map(SortKey::Num),
        Value::String(text) => Some(
            parse_date(value)
                .map_or_else(|| SortKey::Text(text.clone()), |at| SortKey::Num(at.timestamp_millis() as f64)),
        ),
        Value::Bool(flag) => Some(SortKey::Num(f64::from(u8::from(*flag)))),
        _ => None,
    }
}

/// Wire form of a sort value: timestamps become epoch millis.
pub(super) fn sort_value(value: Option<&Value>) -> Value {
    match value {
        Some(value) => parse_date(value).map_or_else(|| value.clone(), |at| Value::from(at.timestamp_millis())),
        None => Value::Null,
    }
}

/// Missing keys sort last in either direction.
pub(super) fn compare_keys(a: Option<&SortKey>, b: Option<&SortKey>, descending: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = a.partial_cmp(b).unwrap_or(Ordering::Equal);
            if descending { ordering.reverse() } else { ordering }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_flatten_arrays_of_objects_along_the_path() {
        let row = json!({
            "subjects": [ { "subject": "ocean" }, { "subject": "FOS: Earth and related sciences" } ],
            "landing_page": { "status": 404 },
            "registered": null
        });

        assert_eq!(values(&row, "subjects.subject").len(), 2);
        assert_eq!(values(&row, "landing_page.status"), vec![&json!(404)]);
        assert!(values(&row, "registered").is_empty());
    }

    #[test]
    fn timestamps_sort_as_millis_and_missing_sorts_last() {
        let early = sort_key(&json!("2024-01-01T00:00:00Z"));
        let late = sort_key(&json!("2024-01-01T00:00:00.500Z"));

        assert_eq!(compare_keys(early.as_ref(), late.as_ref(), false), Ordering::Less);
        assert_eq!(compare_keys(None, early.as_ref(), true), Ordering::Greater);
        assert_eq!(sort_value(Some(&json!("1970-01-01T00:00:01Z"))), json!(1000));
    }
}
