//! Module: link_check
//! Responsibility: probing an identifier's resolution URL and recording
//! the landing-page outcome.

use crate::{config::LinkCheckConfig, transport};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pidreg_core::{
    error::{ErrorClass, ErrorOrigin, RegistryError},
    model::LandingPage,
};
use reqwest::{header::CONTENT_TYPE, redirect};

///
/// LinkChecker
///
/// A definitive answer (any HTTP status, or an unreachable host) is `Ok`;
/// only a timeout is an error, and it is retryable.
///

#[async_trait]
pub trait LinkChecker: Send + Sync {
    async fn check(&self, url: &str) -> Result<LandingPage, RegistryError>;
}

/// Outcome recorded for identifiers that have no URL to check.
#[must_use]
pub fn missing_url(checked: DateTime<Utc>) -> LandingPage {
    LandingPage {
        status: Some(404),
        checked: Some(checked),
        ..LandingPage::default()
    }
}

///
/// HttpLinkChecker
///
/// Issues a `HEAD` request and follows a bounded number of redirects.
///

#[derive(Clone, Debug)]
pub struct HttpLinkChecker {
    client: reqwest::Client,
}

impl HttpLinkChecker {
    pub fn new(config: &LinkCheckConfig) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|err| RegistryError::config(format!("link checker client: {err}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl LinkChecker for HttpLinkChecker {
    async fn check(&self, url: &str) -> Result<LandingPage, RegistryError> {
        let checked = Utc::now();

        match self.client.head(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .and_then(media_type);
                tracing::debug!(target: "pidreg::link_check", url, status, "landing page checked");

                Ok(LandingPage {
                    status: Some(status),
                    content_type,
                    checked: Some(checked),
                    ..LandingPage::default()
                })
            }
            Err(err) => {
                let classified = transport::classify(ErrorOrigin::LinkCheck, &err);
                if classified.class == ErrorClass::Timeout {
                    return Err(classified);
                }
                tracing::debug!(target: "pidreg::link_check", url, error = %err, "landing page unreachable");

                Ok(LandingPage {
                    checked: Some(checked),
                    error: Some(classified.message),
                    ..LandingPage::default()
                })
            }
        }
    }
}

// `text/html; charset=utf-8` -> `text/html`
fn media_type(header: &str) -> Option<String> {
    header
        .split(';')
        .next()
        .map(str::trim)
        .filter(|media| !media.is_empty())
        .map(str::to_lowercase)
}
