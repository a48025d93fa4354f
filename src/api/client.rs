//! HTTP client for the policy governance backend.
//!
//! All requests go through one `reqwest::Client` with a cookie store, so the
//! session credential issued by `/login` rides along implicitly on every
//! subsequent call.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Policy;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// Exceeding it surfaces as a transport error and flows into retry policy.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Fixed page size for collection fetches.
pub const POLICY_PAGE_SIZE: usize = 1000;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginAck {
    success: bool,
}

/// Server's view of the current session.
#[derive(Debug, Deserialize)]
pub struct SessionInfo {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<String>,
}

/// Client for the policy API.
/// Clone is cheap - reqwest::Client uses Arc internally, so clones share the
/// connection pool and the cookie store.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if a response is successful, mapping failures to `ApiError`
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Authenticate. On success the session cookie is captured by the
    /// cookie store; callers still need `session()` to learn the identity.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let response = Self::check(response).await?;
        let ack: LoginAck = response.json().await?;

        if ack.success {
            Ok(())
        } else {
            // A 200 with success=false is still a logical login failure
            Err(ApiError::Application {
                status: 200,
                message: "login failed".to_string(),
            })
        }
    }

    /// Ask the server whether the current session is valid and for whom.
    pub async fn session(&self) -> Result<SessionInfo, ApiError> {
        let response = self.client.get(self.url("/session")).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// Best-effort logout; the caller decides what a failure means.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let response = self.client.post(self.url("/logout")).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Fetch the full policy collection, page by page, optionally scoped by
    /// a server-side query. Pages accumulate until a short page arrives.
    pub async fn fetch_policies(&self, query: Option<&str>) -> Result<Vec<Policy>, ApiError> {
        let mut all = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut request = self.client.get(self.url("/policies")).query(&[
                ("page", page.to_string()),
                ("pageSize", POLICY_PAGE_SIZE.to_string()),
            ]);
            if let Some(q) = query {
                request = request.query(&[("q", q)]);
            }

            let response = Self::check(request.send().await?).await?;
            let batch: Vec<Policy> = response.json().await?;
            let batch_len = batch.len();
            all.extend(batch);

            debug!(page, count = batch_len, total = all.len(), "fetched policy page");

            if batch_len < POLICY_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(all)
    }
}
