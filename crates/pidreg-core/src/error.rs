use std::fmt;
use thiserror::Error as ThisError;

///
/// RegistryError
///
/// Structured runtime error with a stable classification.
/// The class decides how a caller reacts; the origin names the component
/// that raised it.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct RegistryError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl RegistryError {
    /// Construct a RegistryError without detail.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Construct a validation error carrying the per-field list.
    #[must_use]
    pub fn validation(errors: Vec<FieldError>) -> Self {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            class: ErrorClass::Validation,
            origin: ErrorOrigin::Validate,
            message,
            detail: Some(ErrorDetail::Fields(errors)),
        }
    }

    /// Construct a validation error for a single search or page parameter.
    pub fn invalid_param(origin: ErrorOrigin, param: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Validation, origin, message).with_detail(ErrorDetail::Fields(vec![
            FieldError::new(param, "is invalid"),
        ]))
    }

    /// Construct a query-origin syntax error.
    pub fn query_syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::QuerySyntax, ErrorOrigin::Query, message)
    }

    /// Construct a store-origin not found error for one identifier.
    pub fn identifier_not_found(doi: impl Into<String>) -> Self {
        let key = doi.into();

        Self {
            class: ErrorClass::NotFound,
            origin: ErrorOrigin::Store,
            message: format!("identifier not found: {key}"),
            detail: Some(ErrorDetail::NotFound { key }),
        }
    }

    /// Construct a store-origin conflict for a create that lost to an
    /// existing record. Carries the same field error as validation.
    pub fn duplicate_identifier(doi: impl Into<String>) -> Self {
        let doi = doi.into();

        Self {
            class: ErrorClass::Conflict,
            origin: ErrorOrigin::Store,
            message: format!("doi {doi}: This DOI has already been taken"),
            detail: Some(ErrorDetail::Fields(vec![FieldError::new(
                "doi",
                "This DOI has already been taken",
            )])),
        }
    }

    /// Construct a page-origin not found error for a scroll handle.
    pub fn scroll_not_found(scroll_id: impl Into<String>) -> Self {
        let key = scroll_id.into();

        Self {
            class: ErrorClass::NotFound,
            origin: ErrorOrigin::Page,
            message: format!("scroll handle expired or unknown: {key}"),
            detail: Some(ErrorDetail::NotFound { key }),
        }
    }

    /// Construct a lifecycle-origin illegal transition error.
    pub fn illegal_transition(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::IllegalTransition,
            ErrorOrigin::Lifecycle,
            message,
        )
    }

    /// Construct a store-origin not-allowed error.
    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotAllowed, ErrorOrigin::Store, message)
    }

    /// Construct a backend-origin internal error.
    pub fn backend_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Backend, message)
    }

    /// Construct a backend-origin unavailable error.
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unavailable, ErrorOrigin::Backend, message)
    }

    /// Construct a store-origin internal error.
    pub fn store_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Store, message)
    }

    /// Construct a timeout error for one external call.
    pub fn timeout(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Timeout, origin, message)
    }

    /// Construct a registry-origin error carrying the HTTP exchange.
    pub fn registry_response(class: ErrorClass, status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = match class {
            ErrorClass::PermissionDenied => "registry rejected the client credentials".to_string(),
            ErrorClass::NotFound => "identifier is unknown to the registry".to_string(),
            ErrorClass::NotAuthoritative => "registry is not responsible for this identifier".to_string(),
            _ => format!("registry responded with status {status}"),
        };

        Self {
            class,
            origin: ErrorOrigin::Registry,
            message,
            detail: Some(ErrorDetail::Http { status, body }),
        }
    }

    /// Construct a config-origin error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Validation, ErrorOrigin::Config, message)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    /// Timeouts and unavailable upstreams may succeed on redelivery.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.class, ErrorClass::Timeout | ErrorClass::Unavailable)
    }

    /// Per-field validation errors, when present.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match &self.detail {
            Some(ErrorDetail::Fields(errors)) => errors,
            _ => &[],
        }
    }

    /// HTTP status returned by an upstream, when present.
    #[must_use]
    pub const fn upstream_status(&self) -> Option<u16> {
        match &self.detail {
            Some(ErrorDetail::Http { status, .. }) => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`RegistryError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{}", display_fields(.0))]
    Fields(Vec<FieldError>),

    #[error("key not found: {key}")]
    NotFound { key: String },

    #[error("upstream status {status}: {body}")]
    Http { status: u16, body: String },
}

fn display_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

///
/// FieldError
///
/// One entry of a per-field validation error list.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Validation,
    QuerySyntax,
    NotFound,
    Conflict,
    NotAllowed,
    PermissionDenied,
    NotAuthoritative,
    Timeout,
    Unavailable,
    IllegalTransition,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation",
            Self::QuerySyntax => "query_syntax",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::NotAllowed => "not_allowed",
            Self::PermissionDenied => "permission_denied",
            Self::NotAuthoritative => "not_authoritative",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::IllegalTransition => "illegal_transition",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Query,
    Page,
    Facet,
    Lifecycle,
    Validate,
    Backend,
    Registry,
    Store,
    Queue,
    Config,
    LinkCheck,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Query => "query",
            Self::Page => "page",
            Self::Facet => "facet",
            Self::Lifecycle => "lifecycle",
            Self::Validate => "validate",
            Self::Backend => "backend",
            Self::Registry => "registry",
            Self::Store => "store",
            Self::Queue => "queue",
            Self::Config => "config",
            Self::LinkCheck => "link_check",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_keeps_field_list_and_joins_message() {
        let err = RegistryError::validation(vec![
            FieldError::new("url", "can't be blank"),
            FieldError::new("doi", "is invalid"),
        ]);

        assert_eq!(err.class, ErrorClass::Validation);
        assert_eq!(err.field_errors().len(), 2);
        assert_eq!(err.to_string(), "url: can't be blank; doi: is invalid");
    }

    #[test]
    fn only_timeout_and_unavailable_are_retryable() {
        assert!(RegistryError::timeout(ErrorOrigin::Registry, "slow").is_retryable());
        assert!(RegistryError::backend_unavailable("down").is_retryable());
        assert!(!RegistryError::identifier_not_found("10.5072/X").is_retryable());
        assert!(
            !RegistryError::registry_response(ErrorClass::NotFound, 404, "").is_retryable()
        );
    }

    #[test]
    fn registry_response_exposes_status_and_body() {
        let err = RegistryError::registry_response(ErrorClass::NotAuthoritative, 400, "body");

        assert_eq!(err.upstream_status(), Some(400));
        assert_eq!(
            err.display_with_class(),
            "registry:not_authoritative: registry is not responsible for this identifier"
        );
    }
}
