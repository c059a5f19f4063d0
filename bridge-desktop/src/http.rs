//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Opt-in retry with exponential backoff
/// - TLS via rustls
///
/// Transport failures surface as [`BridgeError::Network`]. Non-2xx responses
/// are returned to the caller untouched so 401s can be classified upstream.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("gymdesk-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    fn map_transport_error(e: &reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::Network("request timed out".to_string())
        } else if e.is_connect() {
            BridgeError::Network(format!("connection failed: {}", e))
        } else {
            BridgeError::Network(e.to_string())
        }
    }

    async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_transport_error(&e))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn backoff(policy: &RetryPolicy, attempt: u32) -> Duration {
        if policy.use_exponential_backoff {
            let exponential_delay = policy.base_delay * 2u32.saturating_pow(attempt - 1);
            exponential_delay.min(policy.max_delay)
        } else {
            policy.base_delay
        }
    }

    /// Execute request with retry logic
    async fn execute_with_retry_internal(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                attempt,
                max_attempts,
                url = %request.url,
                "Executing HTTP request"
            );

            let outcome = self.build_request(request.clone()).send().await;
            let retryable = match &outcome {
                Ok(response) => {
                    let status = response.status().as_u16();
                    status >= 500 || status == 429
                }
                Err(_) => true,
            };

            if !retryable || attempt >= max_attempts {
                return match outcome {
                    Ok(response) => Self::into_response(response).await,
                    Err(e) => {
                        warn!(error = %e, attempt, "HTTP request failed");
                        Err(Self::map_transport_error(&e))
                    }
                };
            }

            match &outcome {
                Ok(response) => warn!(
                    status = response.status().as_u16(),
                    attempt, "HTTP request failed with retryable status"
                ),
                Err(e) => warn!(error = %e, attempt, "HTTP request failed"),
            }

            let delay = Self::backoff(&policy, attempt);
            debug!(delay_ms = delay.as_millis() as u64, "Retrying after delay");
            sleep(delay).await;
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry_internal(request, RetryPolicy::none())
            .await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.execute_with_retry_internal(request, policy).await
    }
}
