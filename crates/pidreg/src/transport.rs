//! Module: transport
//! Responsibility: shared reqwest plumbing for every outbound HTTP seam.

use pidreg_core::error::{ErrorClass, ErrorOrigin, RegistryError};
use std::time::Duration;

/// Build a client with an explicit request timeout.
pub(crate) fn client(timeout: Duration) -> Result<reqwest::Client, RegistryError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|err| RegistryError::config(format!("http client: {err}")))
}

/// Classify a transport failure. Timeouts, connection failures and bodies
/// cut off mid-read may succeed on redelivery; anything else is internal.
pub(crate) fn classify(origin: ErrorOrigin, err: &reqwest::Error) -> RegistryError {
    if err.is_timeout() {
        RegistryError::timeout(origin, format!("request timed out: {err}"))
    } else if err.is_connect() || err.is_request() || err.is_body() {
        RegistryError::new(ErrorClass::Unavailable, origin, format!("transport failure: {err}"))
    } else {
        RegistryError::new(ErrorClass::Internal, origin, err.to_string())
    }
}
