//! Shared HTTP plumbing for provider adapters: authentication, throttling,
//! bounded retries with exponential backoff, and status classification.

use anyhow::{Context, Result};
use rand::Rng;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::throttle::Throttle;
use crate::error::{FetchResult, ProviderError};
use crate::models::ProviderTag;

/// How the API key travels with each request.
#[derive(Clone)]
pub enum Auth {
    Header { name: &'static str, key: String },
    Query { name: &'static str, key: String },
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Upper bound of random jitter added to each backoff delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_jitter: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (0-based): base, 2·base, 4·base …
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }

    fn delay_for(&self, retry: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        self.backoff(retry) + jitter
    }
}

/// Connection settings common to every adapter.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub request_timeout: Duration,
    pub min_request_interval: Duration,
    pub retry: RetryPolicy,
}

impl ClientSettings {
    pub fn new(base_url: &str) -> Self {
        ClientSettings {
            base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(30),
            min_request_interval: Duration::from_millis(100),
            retry: RetryPolicy::default(),
        }
    }
}

/// Provider-specific inspection of a decoded 200 body. Returns the body when
/// it is a usable envelope, or the failure it encodes.
pub type EnvelopeCheck = fn(ProviderTag, Value) -> FetchResult<Value>;

pub struct ApiClient {
    provider: ProviderTag,
    http: Client,
    base_url: String,
    auth: Auth,
    throttle: Throttle,
    retry: RetryPolicy,
    envelope: EnvelopeCheck,
}

impl ApiClient {
    pub fn new(
        provider: ProviderTag,
        settings: &ClientSettings,
        auth: Auth,
        envelope: EnvelopeCheck,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(concat!("fixture-aggregator/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Url::parse(&settings.base_url)
            .with_context(|| format!("Invalid base URL for {}: {}", provider, settings.base_url))?;
        Ok(ApiClient {
            provider,
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            auth,
            throttle: Throttle::new(settings.min_request_interval),
            retry: settings.retry.clone(),
            envelope,
        })
    }

    pub fn provider(&self) -> ProviderTag {
        self.provider
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> FetchResult<Url> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|e| ProviderError::Malformed {
            provider: self.provider,
            message: format!("bad request URL {}: {}", raw, e),
        })?;
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in params {
                query.append_pair(k, v);
            }
            if let Auth::Query { name, key } = &self.auth {
                query.append_pair(name, key);
            }
        }
        Ok(url)
    }

    /// GET `path` and return the decoded body, retrying rate limits and
    /// transport failures up to the configured attempt bound.
    pub async fn get_json(&self, path: &str, params: &[(&str, String)]) -> FetchResult<Value> {
        let url = self.url(path, params)?;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.throttle.wait().await;
            match self.send_once(&url).await {
                Ok(body) => {
                    debug!("{} GET {} ok (attempt {})", self.provider, path, attempt);
                    return Ok(body);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt - 1);
                    debug!(
                        "{} GET {} failed: {}; retrying in {:?} (attempt {}/{})",
                        self.provider, path, e, delay, attempt, self.retry.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!(
                            "{} GET {} gave up after {} attempts: {}",
                            self.provider, path, attempt, e
                        );
                    } else {
                        debug!("{} GET {} failed: {}", self.provider, path, e);
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn send_once(&self, url: &Url) -> FetchResult<Value> {
        let mut req = self.http.get(url.clone());
        if let Auth::Header { name, key } = &self.auth {
            req = req.header(*name, key.as_str());
        }

        let resp = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(self.provider, status.as_u16(), &body));
        }

        let body: Value = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout { provider: self.provider }
            } else {
                ProviderError::Malformed {
                    provider: self.provider,
                    message: e.to_string(),
                }
            }
        })?;
        (self.envelope)(self.provider, body)
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout { provider: self.provider }
        } else {
            // Strip the URL so API keys in the query string never reach the logs.
            ProviderError::Network {
                provider: self.provider,
                message: e.without_url().to_string(),
            }
        }
    }
}

/// Envelope check that accepts any decoded body.
pub fn accept_any(_provider: ProviderTag, body: Value) -> FetchResult<Value> {
    Ok(body)
}


#[cfg(test)]
mod tests {
    use super::test_server::serve;
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn fast_settings(base_url: &str) -> ClientSettings {
        ClientSettings {
            base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(5),
            min_request_interval: Duration::from_millis(1),
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(5),
                max_jitter: Duration::ZERO,
            },
        }
    }

    fn client(base_url: &str, auth: Auth) -> ApiClient {
        ApiClient::new(ProviderTag::ApiFootball, &fast_settings(base_url), auth, accept_any).unwrap()
    }

    fn no_auth() -> Auth {
        Auth::Query { name: "api_token", key: "k".into() }
    }

    #[test]
    fn test_default_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(250));
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_jitter: Duration::from_millis(20),
        };
        for _ in 0..50 {
            let d = policy.delay_for(0);
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(120));
        }
    }

    #[tokio::test]
    async fn rate_limit_is_retried_to_the_bound_then_fails() {
        let (url, script) = serve(vec![(429, json!({}))]).await;
        let err = client(&url, no_auth()).get_json("fixtures", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(script.hits(), 3);
    }

    #[tokio::test]
    async fn gateway_timeout_then_success_recovers() {
        let (url, script) = serve(vec![(504, json!({})), (200, json!({"ok": true}))]).await;
        let body = client(&url, no_auth()).get_json("fixtures", &[]).await.unwrap();
        assert_eq!(body["ok"], json!(true));
        assert_eq!(script.hits(), 2);
    }

    #[tokio::test]
    async fn server_error_is_terminal() {
        let (url, script) = serve(vec![(500, json!({})), (200, json!({}))]).await;
        let err = client(&url, no_auth()).get_json("fixtures", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status);
        assert_eq!(script.hits(), 1);
    }

    #[tokio::test]
    async fn forbidden_is_capability_denied_without_retry() {
        let (url, script) =
            serve(vec![(403, json!({"message": "You do not have access to this endpoint."}))]).await;
        let err = client(&url, no_auth()).get_json("odds", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapabilityDenied);
        assert_eq!(script.hits(), 1);
    }

    #[tokio::test]
    async fn connection_refused_is_transient() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = client(&format!("http://{}", addr), no_auth())
            .get_json("fixtures", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[tokio::test]
    async fn query_auth_and_params_are_sent() {
        let (url, script) = serve(vec![(200, json!({}))]).await;
        client(&url, Auth::Query { name: "api_token", key: "secret".into() })
            .get_json("fixtures", &[("date", "2024-08-17".to_string())])
            .await
            .unwrap();
        let q = script.queries.lock().unwrap()[0].clone();
        assert!(q.contains("date=2024-08-17"));
        assert!(q.contains("api_token=secret"));
    }

    #[tokio::test]
    async fn header_auth_is_sent() {
        let (url, script) = serve(vec![(200, json!({}))]).await;
        client(&url, Auth::Header { name: "x-apisports-key", key: "secret".into() })
            .get_json("fixtures", &[])
            .await
            .unwrap();
        let headers = script.headers.lock().unwrap()[0].clone();
        assert_eq!(headers.get("x-apisports-key").unwrap(), "secret");
        assert!(script.queries.lock().unwrap()[0].is_empty());
    }

    #[tokio::test]
    async fn decoded_body_is_handed_to_envelope_check() {
        let (url, _script) = serve(vec![(200, json!("not an object"))]).await;
        let body = client(&url, no_auth()).get_json("x", &[]).await.unwrap();
        assert!(body.is_string());
    }
}
