use crate::{
    error::FieldError,
    model::{Client, Metadata},
    types::Doi,
    validate::MAX_RIGHTS_LEN,
};
use serde_json::Value;
use url::Url;

const URL_SCHEMES: [&str; 3] = ["http", "https", "ftp"];

/// Parse a caller-supplied identifier into a field error on failure.
pub fn parse_doi_field(raw: &str) -> Result<Doi, FieldError> {
    Doi::parse(raw).map_err(|err| FieldError::new("doi", format!("is invalid: {err}")))
}

/// Resolution URLs must be absolute http, https, or ftp URLs without spaces.
pub fn validate_url(raw: &str) -> Result<(), FieldError> {
    let invalid = || FieldError::new("url", "is invalid");

    if raw.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let parsed = Url::parse(raw).map_err(|_| invalid())?;
    if !URL_SCHEMES.contains(&parsed.scheme()) || parsed.host_str().is_none() {
        return Err(invalid());
    }

    Ok(())
}

/// BCP 47-shaped language tag.
pub fn validate_language(raw: &str) -> Result<(), FieldError> {
    let mut subtags = raw.split('-');
    let primary_ok = subtags
        .next()
        .is_some_and(|tag| (1..=8).contains(&tag.len()) && tag.chars().all(|c| c.is_ascii_alphabetic()));
    let rest_ok = subtags.all(|tag| {
        (1..=8).contains(&tag.len()) && tag.chars().all(|c| c.is_ascii_alphanumeric())
    });

    if primary_ok && rest_ok {
        Ok(())
    } else {
        Err(FieldError::new("language", "is not a valid language code"))
    }
}

pub(super) fn check_url_domain(raw: &str, client: &Client) -> Option<FieldError> {
    let host = Url::parse(raw).ok()?.host_str()?.to_string();

    if client.allows_host(&host) {
        None
    } else {
        Some(FieldError::new(
            "url",
            format!("URL {raw} is not allowed by repository {} domain settings", client.id),
        ))
    }
}

pub(super) fn check_blocks_are_objects(metadata: &Metadata) -> Vec<FieldError> {
    let mut errors = Vec::new();

    for (field, label, block) in metadata.blocks() {
        for entry in block {
            if entry.is_object() {
                continue;
            }
            let shown = entry
                .as_str()
                .map_or_else(|| entry.to_string(), str::to_string);
            errors.push(FieldError::new(
                field,
                format!("{label} '{shown}' should be an object instead of a string."),
            ));
        }
    }

    errors
}

pub(super) fn check_identifiers_exclude_doi(metadata: &Metadata) -> Vec<FieldError> {
    metadata
        .identifiers
        .iter()
        .filter_map(Value::as_object)
        .filter(|entry| {
            entry
                .get("identifierType")
                .and_then(Value::as_str)
                .is_some_and(|kind| kind.eq_ignore_ascii_case("doi"))
        })
        .map(|_| {
            FieldError::new(
                "identifiers",
                "Identifier type DOI can't be used as an alternate identifier.",
            )
        })
        .collect()
}

pub(super) fn check_rights_length(metadata: &Metadata) -> Vec<FieldError> {
    metadata
        .rights_list
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|entry| entry.get("rights").and_then(Value::as_str))
        .filter(|rights| rights.chars().count() > MAX_RIGHTS_LEN)
        .map(|_| {
            FieldError::new(
                "rights_list",
                format!("Rights should not exceed {MAX_RIGHTS_LEN} characters."),
            )
        })
        .collect()
}
