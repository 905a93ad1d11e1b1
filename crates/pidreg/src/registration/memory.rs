use crate::{actor::ClientCredentials, registration::{ResolutionRegistry, http::failure}};
use async_trait::async_trait;
use parking_lot::Mutex;
use pidreg_core::{error::RegistryError, types::Doi};
use reqwest::StatusCode;
use std::collections::{HashMap, VecDeque};

///
/// RegistryCall
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RegistryCall {
    Bind { doi: Doi, url: String, username: String },
    Fetch { doi: Doi },
}

#[derive(Debug, Default)]
struct State {
    bindings: HashMap<Doi, String>,
    calls: Vec<RegistryCall>,
    scripted: VecDeque<(StatusCode, String)>,
}

///
/// MemoryRegistry
///
/// In-process registry. Binds are last-write-wins; scripted failures are
/// answered in order before any call succeeds again.
///

#[derive(Debug, Default)]
pub struct MemoryRegistry {
    state: Mutex<State>,
}

impl MemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next call with `status` and `body`.
    pub fn fail_next(&self, status: StatusCode, body: &str) {
        self.state.lock().scripted.push_back((status, body.to_string()));
    }

    /// Seed a binding without recording a call.
    pub fn preload(&self, doi: Doi, url: &str) {
        self.state.lock().bindings.insert(doi, url.to_string());
    }

    #[must_use]
    pub fn bound_url(&self, doi: &Doi) -> Option<String> {
        self.state.lock().bindings.get(doi).cloned()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.state.lock().calls.clone()
    }
}

#[async_trait]
impl ResolutionRegistry for MemoryRegistry {
    async fn bind(&self, doi: &Doi, url: &str, credentials: &ClientCredentials) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        state.calls.push(RegistryCall::Bind {
            doi: doi.clone(),
            url: url.to_string(),
            username: credentials.username.clone(),
        });
        if let Some((status, body)) = state.scripted.pop_front() {
            return Err(failure(status, &body));
        }
        state.bindings.insert(doi.clone(), url.to_string());

        Ok(())
    }

    async fn fetch_url(&self, doi: &Doi, _: &ClientCredentials) -> Result<String, RegistryError> {
        let mut state = self.state.lock();
        state.calls.push(RegistryCall::Fetch { doi: doi.clone() });
        if let Some((status, body)) = state.scripted.pop_front() {
            return Err(failure(status, &body));
        }

        state
            .bindings
            .get(doi)
            .cloned()
            .ok_or_else(|| failure(StatusCode::NOT_FOUND, ""))
    }
}
