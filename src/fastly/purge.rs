//! Purge client: one best-effort CDN invalidation per URL.
//!
//! A single `reqwest::Client` carrying the credential headers is built at
//! startup and shared by every purge.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::StatusCode;
use metrics::{counter, histogram};
use reqwest::{
    Client, Method,
    header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use super::keys;
use super::settings::{SettingsAccessor, parse_i64};

/// Non-standard verb the CDN treats as "invalidate this URL".
pub const PURGE_METHOD: &str = "PURGE";
/// Credential header (`Fastly-Key`), lower-cased as stored on the wire.
pub const FASTLY_KEY_HEADER: &str = "fastly-key";

#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("credential is not a valid header value")]
    Credential(#[from] InvalidHeaderValue),
    #[error("`{0}` is not a valid http method")]
    Method(&'static str),
    #[error("application id is not configured")]
    MissingApplicationId,
    #[error("purge all is not supported by this purger")]
    PurgeAllUnsupported,
    #[error("invalid api url: {0}")]
    Url(#[from] url::ParseError),
    #[error("request to `{url}` failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Body the CDN returns for accepted purges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReceipt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Raw outcome of one purge call.
#[derive(Debug, Clone)]
pub struct PurgeResponse {
    pub url: Url,
    pub status: StatusCode,
    pub receipt: Option<PurgeReceipt>,
}

/// Anything that can purge one URL. The publish pipeline only sees this seam.
#[async_trait]
pub trait Purger: Send + Sync {
    async fn purge(&self, url: &Url) -> Result<PurgeResponse, PurgeError>;

    /// Invalidate everything cached for the configured service.
    async fn purge_all(&self) -> Result<PurgeResponse, PurgeError> {
        Err(PurgeError::PurgeAllUnsupported)
    }
}

#[derive(Debug, Clone)]
pub struct PurgeClientOptions {
    /// Base for service-level API calls (`purge_all`); must end with `/`.
    pub api_base: Url,
    pub request_timeout: Duration,
}

pub struct PurgeClient {
    http: Client,
    settings: SettingsAccessor,
    api_base: Url,
    purge_method: Method,
}

impl PurgeClient {
    /// Build the shared channel. The credential is read once, here.
    pub fn new(settings: SettingsAccessor, options: PurgeClientOptions) -> Result<Self, PurgeError> {
        let credential = settings.get(keys::API_KEY, keys::DEFAULT_API_KEY);
        let mut credential = HeaderValue::from_str(&credential)?;
        credential.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static(FASTLY_KEY_HEADER), credential);

        let http = Client::builder()
            .user_agent(concat!("fastly-cms/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(options.request_timeout)
            .build()
            .map_err(PurgeError::Client)?;

        let purge_method = Method::from_bytes(PURGE_METHOD.as_bytes())
            .map_err(|_| PurgeError::Method(PURGE_METHOD))?;

        Ok(Self {
            http,
            settings,
            api_base: options.api_base,
            purge_method,
        })
    }

    /// Pre-send delay, re-read from settings on every purge.
    pub fn delay(&self) -> Duration {
        resolve_delay(self.settings.lookup(keys::API_DELAY_MS).as_deref())
    }

    async fn execute(
        &self,
        url: Url,
        request: reqwest::Request,
    ) -> Result<PurgeResponse, PurgeError> {
        counter!("fastly_purge_requests_total").increment(1);
        let started = Instant::now();

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(source) => {
                counter!("fastly_purge_failures_total").increment(1);
                error!(
                    target = "fastly_cms::purge",
                    url = %url,
                    error = %source,
                    "purge request failed"
                );
                return Err(transport(&url, source));
            }
        };

        let status = response.status();
        let summary = describe_response(status, response.headers());
        histogram!("fastly_purge_ms").record(started.elapsed().as_secs_f64() * 1000.0);

        let body = response.text().await.unwrap_or_default();
        let receipt = serde_json::from_str::<PurgeReceipt>(&body).ok();

        if status.is_success() {
            info!(
                target = "fastly_cms::purge",
                url = %url,
                status = status.as_u16(),
                response = %summary,
                "purge response"
            );
        } else {
            counter!("fastly_purge_failures_total").increment(1);
            warn!(
                target = "fastly_cms::purge",
                url = %url,
                status = status.as_u16(),
                response = %summary,
                "purge rejected"
            );
        }

        Ok(PurgeResponse {
            url,
            status,
            receipt,
        })
    }
}

#[async_trait]
impl Purger for PurgeClient {
    async fn purge(&self, url: &Url) -> Result<PurgeResponse, PurgeError> {
        let delay = self.delay();

        let request = self
            .http
            .request(self.purge_method.clone(), url.clone())
            .build()
            .map_err(|source| transport(url, source))?;
        info!(
            target = "fastly_cms::purge",
            request = %describe_request(&request),
            "purge request built; credential headers are added on send"
        );

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        debug!(
            target = "fastly_cms::purge",
            url = %url,
            delay_ms = delay.as_millis() as u64,
            "purge delay elapsed"
        );

        self.execute(url.clone(), request).await
    }

    async fn purge_all(&self) -> Result<PurgeResponse, PurgeError> {
        let service_id = self
            .settings
            .get_non_blank(keys::APPLICATION_ID)
            .ok_or(PurgeError::MissingApplicationId)?;
        let url = self
            .api_base
            .join(&format!("service/{service_id}/purge_all"))?;

        let request = self
            .http
            .post(url.clone())
            .body("")
            .build()
            .map_err(|source| transport(&url, source))?;
        info!(
            target = "fastly_cms::purge",
            request = %describe_request(&request),
            "purge all requested"
        );

        self.execute(url, request).await
    }
}

/// Configured delay when it parses as a non-negative integer, otherwise the fallback.
pub fn resolve_delay(raw: Option<&str>) -> Duration {
    let millis = raw
        .and_then(parse_i64)
        .and_then(|value| u64::try_from(value).ok())
        .unwrap_or(keys::API_DELAY_FALLBACK_MS);
    Duration::from_millis(millis)
}

/// Braces become parentheses so the text cannot act as a log template.
pub fn sanitize_for_log(text: &str) -> String {
    text.replace('{', "(").replace('}', ")")
}

/// Method and target only; the credential headers are client defaults and
/// join the request when it is sent.
fn describe_request(request: &reqwest::Request) -> String {
    sanitize_for_log(&format!(
        "Method: {}, RequestUri: '{}'",
        request.method(),
        request.url()
    ))
}

fn describe_response(status: StatusCode, headers: &HeaderMap) -> String {
    sanitize_for_log(&format!("StatusCode: {}, Headers: {:?}", status.as_u16(), headers))
}

fn transport(url: &Url, source: reqwest::Error) -> PurgeError {
    PurgeError::Transport {
        url: url.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fastly::settings::MemorySettings;

    #[test]
    fn delay_uses_configured_value() {
        assert_eq!(resolve_delay(Some("250")), Duration::from_millis(250));
    }

    #[test]
    fn zero_delay_is_allowed() {
        assert_eq!(resolve_delay(Some("0")), Duration::ZERO);
    }

    #[test]
    fn negative_or_malformed_delay_uses_fallback() {
        let fallback = Duration::from_millis(keys::API_DELAY_FALLBACK_MS);
        assert_eq!(resolve_delay(Some("-1")), fallback);
        assert_eq!(resolve_delay(Some("soon")), fallback);
        assert_eq!(resolve_delay(None), fallback);
    }

    #[test]
    fn sanitize_replaces_braces() {
        assert_eq!(
            sanitize_for_log("Headers: {\"accept\": \"application/json\"}"),
            "Headers: (\"accept\": \"application/json\")"
        );
    }

    #[test]
    fn describe_request_names_method_and_target_only() {
        let request = Client::new()
            .request(
                Method::from_bytes(PURGE_METHOD.as_bytes()).expect("method"),
                Url::parse("https://www.example.com/news/").expect("url"),
            )
            .build()
            .expect("request");
        assert_eq!(
            describe_request(&request),
            "Method: PURGE, RequestUri: 'https://www.example.com/news/'"
        );
    }

    #[test]
    fn describe_response_hides_credential_and_braces() {
        let mut headers = HeaderMap::new();
        let mut secret = HeaderValue::from_static("s3cret");
        secret.set_sensitive(true);
        headers.insert(HeaderName::from_static(FASTLY_KEY_HEADER), secret);
        let rendered = describe_response(StatusCode::OK, &headers);
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains('{'));
    }

    #[test]
    fn client_reads_delay_per_call() {
        let store = Arc::new(MemorySettings::new().with(keys::API_DELAY_MS, "10"));
        let client = PurgeClient::new(
            SettingsAccessor::new(store.clone()),
            PurgeClientOptions {
                api_base: Url::parse("https://api.fastly.com/").expect("url"),
                request_timeout: Duration::from_secs(5),
            },
        )
        .expect("client");
        assert_eq!(client.delay(), Duration::from_millis(10));
        store.set(keys::API_DELAY_MS, "0");
        assert_eq!(client.delay(), Duration::ZERO);
    }

    #[test]
    fn credential_with_control_characters_is_rejected() {
        let store = Arc::new(MemorySettings::new().with(keys::API_KEY, "bad\nkey"));
        let result = PurgeClient::new(
            SettingsAccessor::new(store),
            PurgeClientOptions {
                api_base: Url::parse("https://api.fastly.com/").expect("url"),
                request_timeout: Duration::from_secs(5),
            },
        );
        assert!(matches!(result, Err(PurgeError::Credential(_))));
    }
}
