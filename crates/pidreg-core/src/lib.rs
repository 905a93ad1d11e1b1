//! Core engine for the PID registry: identifier model, lifecycle state
//! machine, validation, query building, paging, faceting, and the search
//! backend seam with an in-memory backend.

pub(crate) mod casing;

pub mod error;
pub mod facet;
pub mod fingerprint;
pub mod lifecycle;
pub mod model;
pub mod page;
pub mod query;
pub mod search;
pub mod types;
pub mod validate;

///
/// CONSTANTS
///

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Page size used when none is requested.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Deepest result offset reachable in offset mode.
///
/// Beyond this window callers must switch to cursor or scroll paging.
pub const OFFSET_WINDOW_CAP: u64 = 10_000;

/// Terms buckets returned per facet when `facet-count` is absent.
pub const DEFAULT_FACET_SIZE: u32 = 10;

/// Records per bulk call when reindexing.
pub const REINDEX_BATCH_SIZE: usize = 500;

///
/// Prelude
///
/// Domain vocabulary only.
///

pub mod prelude {
    pub use crate::{
        error::{ErrorClass, ErrorOrigin, RegistryError},
        lifecycle::{IdentifierState, LifecycleEvent, UserEvent},
        model::{Client, Identifier, IdentifierDocument, Provider},
        page::{PageMeta, PageRequest},
        query::SearchParams,
        search::SearchBackend,
        types::{ClientId, Doi, ProviderId},
    };
}
