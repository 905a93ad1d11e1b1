use crate::types::{ClientId, ConsortiumId, ProviderId};
use serde::{Deserialize, Serialize};

///
/// Client
///
/// Repository account owning identifiers.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Client {
    pub id: ClientId,
    pub provider_id: ProviderId,
    pub name: String,
    #[serde(default)]
    pub client_type: Option<String>,
    #[serde(default)]
    pub certificates: Vec<String>,

    /// Comma-separated host patterns resolution URLs must match.
    #[serde(default = "default_domains")]
    pub domains: String,
}

fn default_domains() -> String {
    "*".to_string()
}

impl Client {
    #[must_use]
    pub fn new(id: &str, provider_id: &str, name: &str) -> Self {
        Self {
            id: ClientId::new(id),
            provider_id: ProviderId::new(provider_id),
            name: name.to_string(),
            client_type: None,
            certificates: Vec::new(),
            domains: default_domains(),
        }
    }

    /// Check a URL host against the allowed domain patterns.
    ///
    /// `*` matches everything, `*.example.org` matches subdomains and the
    /// apex, anything else must match the host exactly.
    #[must_use]
    pub fn allows_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();

        self.domains
            .split(',')
            .map(|pattern| pattern.trim().to_lowercase())
            .filter(|pattern| !pattern.is_empty())
            .any(|pattern| {
                if pattern == "*" {
                    return true;
                }
                match pattern.strip_prefix("*.") {
                    Some(apex) => host == apex || host.ends_with(&format!(".{apex}")),
                    None => host == pattern,
                }
            })
    }
}

///
/// Provider
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    #[serde(default)]
    pub consortium_id: Option<ConsortiumId>,
}

impl Provider {
    #[must_use]
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: ProviderId::new(id),
            name: name.to_string(),
            consortium_id: None,
        }
    }
}
