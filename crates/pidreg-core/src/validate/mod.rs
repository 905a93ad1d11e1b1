//! Module: validate
//! Responsibility: per-field validation of an identifier ahead of a save.
//! Does not own: uniqueness lookups (the service checks the repository and
//! passes the result in).

mod rules;


use crate::{
    error::{FieldError, RegistryError},
    model::{Client, Identifier},
};

pub use rules::{parse_doi_field, validate_language, validate_url};

/// Longest accepted rights statement.
pub const MAX_RIGHTS_LEN: usize = 2000;

///
/// ValidationContext
///
/// Facts validation needs that are not on the identifier itself.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct ValidationContext<'a> {
    pub client: Option<&'a Client>,
    /// Another record already holds this identifier.
    pub duplicate: bool,
}

/// Validate an identifier, collecting every failing field.
pub fn validate_identifier(
    identifier: &Identifier,
    context: ValidationContext<'_>,
) -> Result<(), RegistryError> {
    let errors = collect_errors(identifier, context);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(RegistryError::validation(errors))
    }
}

/// Run every rule and return the failures in a stable order.
#[must_use]
pub fn collect_errors(identifier: &Identifier, context: ValidationContext<'_>) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if context.duplicate {
        errors.push(FieldError::new("doi", "This DOI has already been taken"));
    }

    let resolvable = identifier.state.is_registered_or_findable();
    match identifier.url.as_deref() {
        None | Some("") if resolvable => errors.push(FieldError::new("url", "can't be blank")),
        None | Some("") => {}
        Some(url) => {
            if let Err(err) = validate_url(url) {
                errors.push(err);
            } else if resolvable
                && let Some(client) = context.client
                && let Some(err) = rules::check_url_domain(url, client)
            {
                errors.push(err);
            }
        }
    }

    errors.extend(rules::check_blocks_are_objects(&identifier.metadata));
    errors.extend(rules::check_identifiers_exclude_doi(&identifier.metadata));
    errors.extend(rules::check_rights_length(&identifier.metadata));

    if let Some(language) = identifier.language.as_deref()
        && let Err(err) = validate_language(language)
    {
        errors.push(err);
    }

    errors
}
