//! Module: search
//! Responsibility: the search-backend seam, its request/response shapes,
//! the executor that ties query building, paging and faceting to one backend
//! read, and an in-memory backend.
//! Does not own: wire adapters for external backends.

mod backend;
mod executor;
mod memory;
mod request;

#[cfg(test)]
mod tests;

pub use backend::SearchBackend;
pub use executor::{SearchOptions, SearchResults, execute};
pub use memory::MemoryBackend;
pub use request::{BulkOutcome, SearchHit, SearchRequest, SearchResponse};
