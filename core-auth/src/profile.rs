//! Backend profile fetch (`GET /auth/me`).

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{AuthError, Result};
use crate::types::{Credential, UserProfile};

#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileEnvelope {
    Wrapped { data: UserProfile },
    Bare(UserProfile),
}

pub struct ProfileClient {
    http: Arc<dyn HttpClient>,
    url: String,
    timeout: Duration,
}

impl ProfileClient {
    pub fn new(http: Arc<dyn HttpClient>, api_base_url: &str, profile_path: &str, timeout: Duration) -> Self {
        Self {
            http,
            url: format!("{}{}", api_base_url.trim_end_matches('/'), profile_path),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches the signed-in user's profile with `credential`.
    ///
    /// 401/403 map to [`AuthError::TokenInvalid`]; transport failures and 5xx
    /// to [`AuthError::NetworkError`].
    #[instrument(skip(self, credential), fields(url = %self.url))]
    pub async fn fetch(&self, credential: &Credential) -> Result<UserProfile> {
        let request = HttpRequest::new(HttpMethod::Get, self.url.as_str())
            .bearer_token(credential.as_str())
            .header("Accept", "application/json")
            .timeout(self.timeout);

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        match response.status {
            401 | 403 => return Err(AuthError::TokenInvalid),
            status if response.is_server_error() || status == 429 => {
                return Err(AuthError::NetworkError(format!("profile endpoint returned HTTP {}", status)))
            }
            status if !response.is_success() => {
                return Err(AuthError::Other(format!("profile endpoint returned HTTP {}", status)))
            }
            _ => {}
        }

        let envelope: ProfileEnvelope = serde_json::from_slice(&response.body)?;
        let profile = match envelope {
            ProfileEnvelope::Wrapped { data } => data,
            ProfileEnvelope::Bare(profile) => profile,
        };

        debug!(user_id = %profile.id, role = %profile.role, "Profile fetched");
        Ok(profile)
    }
}
