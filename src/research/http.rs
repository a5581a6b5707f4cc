// src/research/http.rs
//! Thin wrapper around `reqwest::Client` shared by all adapters: builds the
//! client once, maps HTTP status codes onto `ProviderError` and applies the
//! retry policy.

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::HttpSettings;
use crate::research::error::ProviderError;
use crate::research::retry::RetryPolicy;

/// Body of a fetched page plus the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct Page {
    pub final_url: String,
    pub body: String,
}

#[derive(Clone)]
pub struct ProviderHttp {
    client: Client,
    retry: RetryPolicy,
}

impl ProviderHttp {
    pub fn new(settings: &HttpSettings, retry: RetryPolicy) -> anyhow::Result<Self> {
        Self::with_user_agent(settings, &settings.user_agent, retry)
    }

    /// Same timeouts, different agent string (the scraper poses as a browser).
    pub fn with_user_agent(
        settings: &HttpSettings,
        user_agent: &str,
        retry: RetryPolicy,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .context("building provider http client")?;
        Ok(Self { client, retry })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// GET decoding a JSON body. `build` is called once per attempt.
    pub async fn get_json<T, F>(&self, provider: &'static str, build: F) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let client = &self.client;
        let build = &build;
        self.retry
            .run(provider, move || async move {
                let resp = check_status(build(client).send().await?)?;
                resp.json::<T>()
                    .await
                    .map_err(|e| ProviderError::Payload(e.to_string()))
            })
            .await
    }

    /// GET returning the body as text (HTML pages).
    pub async fn get_page(&self, provider: &'static str, url: &str) -> Result<Page, ProviderError> {
        let client = &self.client;
        self.retry
            .run(provider, move || async move {
                let resp = check_status(client.get(url).send().await?)?;
                let final_url = resp.url().to_string();
                let body = resp.text().await?;
                Ok(Page { final_url, body })
            })
            .await
    }
}

fn check_status(resp: Response) -> Result<Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    Err(match status {
        StatusCode::NOT_FOUND => ProviderError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Unauthorized(status.as_u16())
        }
        other => ProviderError::Status {
            status: other.as_u16(),
            message: other
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        },
    })
}

/// Strip scheme and path: "https://acme.com/about" -> "acme.com".
pub fn clean_domain(raw: &str) -> String {
    let s = raw.trim();
    let s = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    s.split('/').next().unwrap_or_default().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_domain_strips_scheme_and_path() {
        assert_eq!(clean_domain("https://Acme.com/about"), "acme.com");
        assert_eq!(clean_domain("http://acme.io"), "acme.io");
        assert_eq!(clean_domain(" acme.co "), "acme.co");
    }
}
