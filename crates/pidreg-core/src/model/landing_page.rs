use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

///
/// LandingPage
///
/// Result of the most recent link-health check against an identifier's URL.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct LandingPage {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub checked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub has_schema_org: Option<bool>,
    #[serde(default)]
    pub body_has_pid: Option<bool>,
    #[serde(default)]
    pub schema_org_id: Option<String>,
    #[serde(default)]
    pub dc_identifier: Option<String>,
    #[serde(default)]
    pub citation_doi: Option<String>,
    #[serde(default)]
    pub redirect_count: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

impl LandingPage {
    /// Statuses at or above 400 count as a failed check.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error.is_some() || self.status.is_some_and(|status| status >= 400)
    }
}
