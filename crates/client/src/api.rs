//! REST client for the telemetry service.
//!
//! Wraps the login and data endpoints using [`reqwest`]. Every request is
//! bounded by the configured timeout and logged with its outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Method;

use nanodc_core::snapshot::Snapshot;
use nanodc_core::usage::{NoopRecorder, UsageRecorder};

use crate::auth::{AuthToken, Credentials, LoginRequest, LoginResponse};
use crate::error::{AuthError, FetchError};
use crate::status::describe_status;

/// Default service location.
pub const DEFAULT_BASE_URL: &str = "http://211.176.180.172:8080";

pub const DEFAULT_LOGIN_PATH: &str = "/api/users/login";
pub const DEFAULT_DATA_PATH: &str = "/api/users/data";

/// Default bound on a single request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on the reachability check.
pub const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and how to reach the service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL without a trailing slash, e.g. `http://host:8080`.
    pub base_url: String,
    pub login_path: String,
    pub data_path: String,
    /// Bound on each individual request.
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            data_path: DEFAULT_DATA_PATH.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// HTTP client for one telemetry service.
pub struct TelemetryClient {
    http: reqwest::Client,
    config: ClientConfig,
    recorder: Arc<dyn UsageRecorder>,
}

impl TelemetryClient {
    /// Create a client that reports fetch outcomes to `recorder`.
    pub fn new(
        config: ClientConfig,
        recorder: Arc<dyn UsageRecorder>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(http, config, recorder))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        http: reqwest::Client,
        config: ClientConfig,
        recorder: Arc<dyn UsageRecorder>,
    ) -> Self {
        Self {
            http,
            config,
            recorder,
        }
    }

    /// Client that records nothing.
    pub fn unrecorded(config: ClientConfig) -> Result<Self, reqwest::Error> {
        Self::new(config, Arc::new(NoopRecorder))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Exchange credentials for a bearer token.
    ///
    /// Sends `POST {login_path}` with `{"user_id", "password"}` and expects
    /// `{"token"}` back. A 400, 401 or 403 means the credentials were
    /// rejected.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, AuthError> {
        let path = self.config.login_path.as_str();
        let body = LoginRequest {
            user_id: &credentials.user_id,
            password: credentials.secret(),
        };

        let started = Instant::now();
        let response = self
            .http
            .post(self.config.url(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let err = AuthError::from_transport(&e);
                tracing::warn!(path, error = %err, latency_ms = elapsed_ms(started), "Login request failed");
                err
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let err = AuthError::from_status(status);
            tracing::warn!(
                path,
                status,
                reason = %describe_status(status),
                user_id = %credentials.user_id,
                "Login rejected"
            );
            return Err(err);
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        let token = login
            .token
            .filter(|t| !t.trim().is_empty())
            .map(AuthToken::new)
            .ok_or_else(|| AuthError::MalformedResponse("missing token".into()))?;

        tracing::info!(
            user_id = %credentials.user_id,
            token = %token.redacted(),
            latency_ms = elapsed_ms(started),
            "Authenticated"
        );
        Ok(token)
    }

    /// Fetch one snapshot with no facility scope.
    pub async fn fetch_snapshot(&self, token: &AuthToken) -> Result<Snapshot, FetchError> {
        self.fetch_snapshot_scoped(token, None).await
    }

    /// Fetch one snapshot, optionally scoped to a facility's remote id.
    ///
    /// Tries `GET {data_path}` first. If that fails at the transport level
    /// or with a non-2xx status, one `POST {data_path}` follows and its
    /// outcome is returned. The outcome is reported to the usage recorder
    /// once, covering both attempts.
    pub async fn fetch_snapshot_scoped(
        &self,
        token: &AuthToken,
        nanodc_id: Option<&str>,
    ) -> Result<Snapshot, FetchError> {
        let started = Instant::now();

        let body = match self.attempt(Method::GET, token, nanodc_id).await {
            Ok(body) => Ok(body),
            Err(get_err) => {
                tracing::warn!(error = %get_err, "GET for snapshot failed, falling back to POST");
                self.attempt(Method::POST, token, nanodc_id).await
            }
        };

        let bytes = body.as_ref().map_or(0, |b| b.len() as u64);
        let result = body.and_then(|b| decode(&b));
        self.recorder
            .record_api_call(started.elapsed(), result.is_ok(), bytes);

        if let Ok(snapshot) = &result {
            tracing::debug!(
                nodes = snapshot.nodes.len(),
                usage = snapshot.node_usage.len(),
                bytes,
                latency_ms = elapsed_ms(started),
                "Snapshot fetched"
            );
        }
        result
    }

    /// Whether the service answers at all. 2xx and 4xx both count.
    pub async fn check_reachability(&self) -> bool {
        match self
            .http
            .head(self.config.url("/"))
            .timeout(REACHABILITY_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                let reachable = status.is_success() || status.is_client_error();
                tracing::debug!(status = status.as_u16(), reachable, "Reachability check");
                reachable
            }
            Err(e) => {
                tracing::debug!(error = %e, "Reachability check failed");
                false
            }
        }
    }

    // ---- private helpers ----

    /// One request against the data endpoint. Returns the raw body of a
    /// 2xx response.
    async fn attempt(
        &self,
        method: Method,
        token: &AuthToken,
        nanodc_id: Option<&str>,
    ) -> Result<String, FetchError> {
        let path = self.config.data_path.as_str();
        let mut request = self
            .http
            .request(method.clone(), self.config.url(path))
            .bearer_auth(token.as_str());
        request = match (&method, nanodc_id) {
            (&Method::GET, Some(id)) => request.query(&[("nanodc_id", id)]),
            (&Method::POST, Some(id)) => request.json(&serde_json::json!({ "nanodc_id": id })),
            (&Method::POST, None) => request.json(&serde_json::json!({})),
            _ => request,
        };

        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = FetchError::from_transport(&e);
                tracing::warn!(
                    %method,
                    path,
                    kind = err.kind(),
                    error = %e,
                    latency_ms = elapsed_ms(started),
                    "Snapshot request failed"
                );
                return Err(err);
            }
        };

        let status = response.status().as_u16();
        tracing::info!(
            %method,
            path,
            status,
            latency_ms = elapsed_ms(started),
            "Snapshot request completed"
        );
        if !response.status().is_success() {
            return Err(FetchError::from_status(status));
        }

        response.text().await.map_err(|e| FetchError::from_transport(&e))
    }
}

fn decode(body: &str) -> Result<Snapshot, FetchError> {
    Snapshot::from_json(body)
        .map_err(|e| FetchError::Decode(e.to_string()))?
        .ok_or(FetchError::EmptyBody)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
