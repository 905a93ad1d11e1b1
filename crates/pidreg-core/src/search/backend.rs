use crate::{
    error::RegistryError,
    model::IdentifierDocument,
    page::{ScrollId, ScrollLifetime},
    search::{BulkOutcome, SearchRequest, SearchResponse},
};
use async_trait::async_trait;

///
/// SearchBackend
///
/// Document index holding one projected document per identifier, keyed by
/// uid. Implementations map backend faults onto `RegistryError` classes:
/// rejected queries are `QuerySyntax`, unknown scroll handles `NotFound`,
/// transport faults `Unavailable`, and deadlines `Timeout`.
///

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, RegistryError>;

    /// Resume a scroll snapshot and return its next page.
    async fn scroll(
        &self,
        scroll_id: &ScrollId,
        lifetime: ScrollLifetime,
    ) -> Result<SearchResponse, RegistryError>;

    async fn index(&self, document: &IdentifierDocument) -> Result<(), RegistryError>;

    async fn bulk_index(&self, documents: &[IdentifierDocument]) -> Result<BulkOutcome, RegistryError>;

    async fn delete(&self, uid: &str) -> Result<(), RegistryError>;
}
