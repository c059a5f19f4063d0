//! Session-aware HTTP client for the REST data layer.
//!
//! [`SessionHttpClient`] wraps any [`HttpClient`], attaches the current bearer
//! credential and reports HTTP 401 responses to the session owner, which
//! routes them through the Invalid-Session Signal.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::types::Credential;

/// Session hooks needed by [`SessionHttpClient`].
#[async_trait]
pub trait SessionAccess: Send + Sync {
    async fn bearer_token(&self) -> Option<Credential>;
    async fn report_unauthorized(&self);
}

pub struct SessionHttpClient {
    inner: Arc<dyn HttpClient>,
    session: Weak<dyn SessionAccess>,
}

impl SessionHttpClient {
    pub fn new(inner: Arc<dyn HttpClient>, session: Weak<dyn SessionAccess>) -> Self {
        Self { inner, session }
    }

    async fn authorize(&self, request: HttpRequest) -> HttpRequest {
        if request.has_authorization() {
            return request;
        }
        let Some(session) = self.session.upgrade() else {
            return request;
        };
        match session.bearer_token().await {
            Some(credential) => request.bearer_token(credential.as_str()),
            None => request,
        }
    }

    async fn inspect(&self, response: &HttpResponse, url: &str) {
        if !response.is_unauthorized() {
            return;
        }
        debug!(url, "Backend rejected credential");
        if let Some(session) = self.session.upgrade() {
            session.report_unauthorized().await;
        }
    }
}

#[async_trait]
impl HttpClient for SessionHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        let response = self.inner.execute(self.authorize(request).await).await?;
        self.inspect(&response, &url).await;
        Ok(response)
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let url = request.url.clone();
        let response = self
            .inner
            .execute_with_retry(self.authorize(request).await, policy)
            .await?;
        self.inspect(&response, &url).await;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::http::HttpMethod;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    #[derive(Default)]
    struct FakeSession {
        token: Option<&'static str>,
        reports: AtomicUsize,
    }

    #[async_trait]
    impl SessionAccess for FakeSession {
        async fn bearer_token(&self) -> Option<Credential> {
            self.token.map(Credential::new)
        }

        async fn report_unauthorized(&self) {
            self.reports.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn status(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    fn client(http: MockHttpClient, session: &Arc<FakeSession>) -> SessionHttpClient {
        let weak: Weak<FakeSession> = Arc::downgrade(session);
        SessionHttpClient::new(Arc::new(http), weak)
    }

    #[tokio::test]
    async fn test_attaches_bearer() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.headers.get("Authorization") == Some(&"Bearer tok".to_string()))
            .times(1)
            .returning(|_| Ok(status(200)));

        let session = Arc::new(FakeSession {
            token: Some("tok"),
            ..FakeSession::default()
        });
        let client = client(http, &session);

        let response = client
            .execute(HttpRequest::new(HttpMethod::Get, "https://api.gymdesk.example/members"))
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(session.reports.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_keeps_explicit_authorization() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.headers.get("Authorization") == Some(&"Basic abc".to_string()))
            .returning(|_| Ok(status(200)));

        let session = Arc::new(FakeSession {
            token: Some("tok"),
            ..FakeSession::default()
        });
        client(http, &session)
            .execute(
                HttpRequest::new(HttpMethod::Get, "https://api.gymdesk.example/x")
                    .header("Authorization", "Basic abc"),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reports_unauthorized() {
        let mut http = MockHttpClient::new();
        http.expect_execute().returning(|_| Ok(status(401)));

        let session = Arc::new(FakeSession::default());
        let client = client(http, &session);

        let response = client
            .execute(HttpRequest::new(HttpMethod::Get, "https://api.gymdesk.example/billing"))
            .await
            .unwrap();
        assert_eq!(response.status, 401);
        assert_eq!(session.reports.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_forbidden_is_not_reported() {
        let mut http = MockHttpClient::new();
        http.expect_execute().returning(|_| Ok(status(403)));

        let session = Arc::new(FakeSession::default());
        let client = client(http, &session);

        client
            .execute(HttpRequest::new(HttpMethod::Delete, "https://api.gymdesk.example/members/1"))
            .await
            .unwrap();
        assert_eq!(session.reports.load(Ordering::SeqCst), 0);
    }
}
