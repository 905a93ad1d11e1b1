use crate::{actor::ClientCredentials, config::RegistryConfig, registration::ResolutionRegistry, transport};
use async_trait::async_trait;
use pidreg_core::{
    error::{ErrorClass, ErrorOrigin, RegistryError},
    types::Doi,
};
use reqwest::{StatusCode, header::CONTENT_TYPE};
use serde::Deserialize;

// Marker the registry embeds in 400 bodies for identifiers it does not own.
const NOT_AUTHORITATIVE_MARKER: &str = "responseCode=301";

///
/// HttpRegistry
///

#[derive(Clone, Debug)]
pub struct HttpRegistry {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client: transport::client(config.timeout())?,
        })
    }

    fn doi_url(&self, doi: &Doi) -> String {
        format!("{}/doi/{}", self.base_url, doi.as_str())
    }
}

#[async_trait]
impl ResolutionRegistry for HttpRegistry {
    async fn bind(&self, doi: &Doi, url: &str, credentials: &ClientCredentials) -> Result<(), RegistryError> {
        let response = self
            .client
            .put(self.doi_url(doi))
            .basic_auth(&credentials.username, Some(&credentials.password))
            .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(bind_body(doi, url))
            .send()
            .await
            .map_err(|err| transport::classify(ErrorOrigin::Registry, &err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| transport::classify(ErrorOrigin::Registry, &err))?;

        interpret_bind(status, &body)
    }

    async fn fetch_url(&self, doi: &Doi, credentials: &ClientCredentials) -> Result<String, RegistryError> {
        let response = self
            .client
            .get(self.doi_url(doi))
            .basic_auth(&credentials.username, Some(&credentials.password))
            .send()
            .await
            .map_err(|err| transport::classify(ErrorOrigin::Registry, &err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| transport::classify(ErrorOrigin::Registry, &err))?;

        interpret_fetch(status, &body)
    }
}

#[must_use]
pub fn bind_body(doi: &Doi, url: &str) -> String {
    format!("doi={}\nurl={url}", doi.as_str())
}

/// 201 is the only successful bind.
pub fn interpret_bind(status: StatusCode, body: &str) -> Result<(), RegistryError> {
    if status == StatusCode::CREATED {
        Ok(())
    } else {
        Err(failure(status, body))
    }
}

/// 200 carries a value list whose `URL` entry holds the bound URL.
pub fn interpret_fetch(status: StatusCode, body: &str) -> Result<String, RegistryError> {
    if status != StatusCode::OK {
        return Err(failure(status, body));
    }

    let handle: HandleValues = serde_json::from_str(body).map_err(|err| {
        RegistryError::new(
            ErrorClass::Internal,
            ErrorOrigin::Registry,
            format!("unreadable registry response: {err}"),
        )
    })?;

    handle
        .values
        .into_iter()
        .find(|value| value.kind == "URL")
        .and_then(|value| value.data.value.as_str().map(ToString::to_string))
        .ok_or_else(|| RegistryError::registry_response(ErrorClass::NotFound, status.as_u16(), body))
}

pub(crate) fn failure(status: StatusCode, body: &str) -> RegistryError {
    let class = match status {
        StatusCode::UNAUTHORIZED => ErrorClass::PermissionDenied,
        StatusCode::NOT_FOUND => ErrorClass::NotFound,
        StatusCode::BAD_REQUEST if body.contains(NOT_AUTHORITATIVE_MARKER) => ErrorClass::NotAuthoritative,
        status if status.is_server_error() => ErrorClass::Unavailable,
        _ => ErrorClass::Internal,
    };

    RegistryError::registry_response(class, status.as_u16(), body)
}

#[derive(Deserialize)]
struct HandleValues {
    #[serde(default)]
    values: Vec<HandleValue>,
}

#[derive(Deserialize)]
struct HandleValue {
    #[serde(rename = "type")]
    kind: String,
    data: HandleData,
}

#[derive(Deserialize)]
struct HandleData {
    value: serde_json::Value,
}
