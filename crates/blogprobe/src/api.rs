//! Backend API used by setup steps.
//!
//! The application under test exposes two testing endpoints:
//!
//! - `POST {api_url}/testing/reset` clears all users and posts
//! - `POST {api_url}/users` creates a user from `{name, username, password}`
//!
//! [`ApiClient`] calls them over HTTP. Tests substitute their own
//! [`BackendApi`] implementation.

use crate::result::{HarnessError, HarnessResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A user seeded before login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Display name shown in the "logged in" banner
    pub name: String,
    /// Login name
    pub username: String,
    /// Plain-text password
    pub password: String,
}

impl Credential {
    /// Create a credential
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Remote state management for the application under test.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Clear all remote state
    async fn reset(&self) -> HarnessResult<()>;

    /// Create a user
    async fn create_user(&self, credential: &Credential) -> HarnessResult<()>;

    /// Check that the application answers at all
    async fn probe(&self) -> HarnessResult<()>;
}

/// Per-request timeout for backend calls
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// HTTP implementation of [`BackendApi`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    api_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a client for the given UI and API roots
    ///
    /// # Errors
    ///
    /// Returns a config error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_url: impl Into<String>) -> HarnessResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| HarnessError::config(format!("http client: {e}")))?;
        Ok(Self::with_client(base_url, api_url, client))
    }

    /// Create a client with a custom reqwest client
    #[must_use]
    pub fn with_client(
        base_url: impl Into<String>,
        api_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// API root
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: Option<&T>) -> HarnessResult<()> {
        let url = self.endpoint(path);
        let request = self.client.post(&url);
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };

        let resp = request.send().await.map_err(|e| transport_error(&url, &e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HarnessError::Http {
                url,
                status: status.as_u16(),
            });
        }
        tracing::debug!(%url, status = status.as_u16(), "backend call");
        Ok(())
    }
}

fn transport_error(url: &str, err: &reqwest::Error) -> HarnessError {
    if err.is_builder() {
        HarnessError::config(format!("invalid backend URL {url}: {err}"))
    } else {
        HarnessError::Unreachable {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl BackendApi for ApiClient {
    #[tracing::instrument(skip(self), fields(api = %self.api_url))]
    async fn reset(&self) -> HarnessResult<()> {
        self.post::<()>("testing/reset", None).await
    }

    #[tracing::instrument(skip(self, credential), fields(username = %credential.username))]
    async fn create_user(&self, credential: &Credential) -> HarnessResult<()> {
        self.post("users", Some(credential)).await
    }

    async fn probe(&self) -> HarnessResult<()> {
        // Any HTTP answer means the application is up.
        self.client
            .get(&self.base_url)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| HarnessError::Unreachable {
                url: self.base_url.clone(),
                message: e.to_string(),
            })
    }
}

/// In-memory [`BackendApi`] that records calls, for harness unit tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingApi {
    pub(crate) calls: std::sync::Mutex<Vec<String>>,
    pub(crate) unreachable: bool,
}

#[cfg(test)]
impl RecordingApi {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) -> HarnessResult<()> {
        if self.unreachable {
            return Err(HarnessError::Unreachable {
                url: "http://test.invalid".to_string(),
                message: "connection refused".to_string(),
            });
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        Ok(())
    }
}

#[cfg(test)]
#[async_trait]
impl BackendApi for RecordingApi {
    async fn reset(&self) -> HarnessResult<()> {
        self.record("reset".to_string())
    }

    async fn create_user(&self, credential: &Credential) -> HarnessResult<()> {
        self.record(format!("user:{}", credential.username))
    }

    async fn probe(&self) -> HarnessResult<()> {
        self.record("probe".to_string())
    }
}
