use crate::{backend::parse, config::SearchConfig, transport};
use async_trait::async_trait;
use pidreg_core::{
    error::{ErrorOrigin, RegistryError},
    model::IdentifierDocument,
    page::{ScrollId, ScrollLifetime},
    search::{BulkOutcome, SearchBackend, SearchRequest, SearchResponse},
};
use reqwest::{RequestBuilder, header::CONTENT_TYPE};
use serde_json::{Value, json};
use url::Url;

///
/// ElasticBackend
///
/// Search backend speaking the Elasticsearch REST dialect over one index.
///

#[derive(Clone, Debug)]
pub struct ElasticBackend {
    base: Url,
    index: String,
    client: reqwest::Client,
}

impl ElasticBackend {
    pub fn new(config: &SearchConfig) -> Result<Self, RegistryError> {
        let base = Url::parse(&config.url)
            .map_err(|err| RegistryError::config(format!("invalid search url '{}': {err}", config.url)))?;
        if base.cannot_be_a_base() {
            return Err(RegistryError::config(format!("search url '{}' cannot carry a path", config.url)));
        }

        Ok(Self {
            base,
            index: config.index.clone(),
            client: transport::client(config.timeout())?,
        })
    }

    /// Base URL with `segments` appended, each percent-encoded.
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, builder: RequestBuilder, scroll: Option<&ScrollId>) -> Result<Value, RegistryError> {
        let response = builder
            .send()
            .await
            .map_err(|err| transport::classify(ErrorOrigin::Backend, &err))?;
        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|err| transport::classify(ErrorOrigin::Backend, &err))?;

        if !status.is_success() {
            tracing::debug!(target: "pidreg::backend", status = status.as_u16(), "search backend rejected request");
            return Err(parse::status_error(status.as_u16(), &raw, scroll));
        }

        serde_json::from_str(&raw)
            .map_err(|err| RegistryError::backend_internal(format!("unreadable backend response: {err}")))
    }
}

#[async_trait]
impl SearchBackend for ElasticBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, RegistryError> {
        let mut url = self.endpoint(&[&self.index, "_search"]);
        if let Some(lifetime) = request.scroll {
            url.query_pairs_mut().append_pair("scroll", &lifetime.as_param());
        }

        let body = self.send(self.client.post(url).json(&request.to_json()), None).await?;

        parse::search_response(&body, &request.aggregations)
    }

    async fn scroll(&self, scroll_id: &ScrollId, lifetime: ScrollLifetime) -> Result<SearchResponse, RegistryError> {
        let payload = json!({ "scroll": lifetime.as_param(), "scroll_id": scroll_id.as_str() });
        let request = self.client.post(self.endpoint(&["_search", "scroll"])).json(&payload);
        let body = self.send(request, Some(scroll_id)).await?;

        parse::search_response(&body, &[])
    }

    async fn index(&self, document: &IdentifierDocument) -> Result<(), RegistryError> {
        let url = self.endpoint(&[&self.index, "_doc", &document.uid]);
        self.send(self.client.put(url).json(document), None).await?;

        Ok(())
    }

    async fn bulk_index(&self, documents: &[IdentifierDocument]) -> Result<BulkOutcome, RegistryError> {
        if documents.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let mut payload = String::new();
        for document in documents {
            let action = json!({ "index": { "_index": self.index, "_id": document.uid } });
            let source = serde_json::to_string(document)
                .map_err(|err| RegistryError::backend_internal(format!("unencodable document: {err}")))?;
            payload.push_str(&action.to_string());
            payload.push('\n');
            payload.push_str(&source);
            payload.push('\n');
        }

        let request = self
            .client
            .post(self.endpoint(&["_bulk"]))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(payload);
        let body = self.send(request, None).await?;

        Ok(parse::bulk_response(&body))
    }

    async fn delete(&self, uid: &str) -> Result<(), RegistryError> {
        let url = self.endpoint(&[&self.index, "_doc", uid]);

        match self.send(self.client.delete(url), None).await {
            Err(err) if err.is_not_found() => Ok(()),
            other => other.map(|_| ()),
        }
    }
}
