use crate::actor::ClientCredentials;
use async_trait::async_trait;
use pidreg_core::{error::RegistryError, types::Doi};

///
/// ResolutionRegistry
///
/// External handle registry that binds identifiers to resolution URLs.
/// Binding the same pair twice must be safe.
///

#[async_trait]
pub trait ResolutionRegistry: Send + Sync {
    async fn bind(&self, doi: &Doi, url: &str, credentials: &ClientCredentials) -> Result<(), RegistryError>;

    /// URL currently bound at the registry.
    async fn fetch_url(&self, doi: &Doi, credentials: &ClientCredentials) -> Result<String, RegistryError>;
}
