// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Duet backend.
//!
//! Provides [`BackendClient`], which handles bearer authentication, the
//! `{success, message, data}` response envelope, and the mapping of HTTP
//! statuses onto [`DuetError`] variants.

use std::time::Duration;

use async_trait::async_trait;
use duet_config::model::BackendConfig;
use duet_core::types::{JoinOutcome, ModerationStatus, PollOutcome, UserProfile};
use duet_core::{AccountApi, DuetError, MatchmakingApi, ModerationApi, UserId};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{
    BanDetails, DecreaseStarsRequest, Envelope, JoinData, ReportRequest, StatusData,
};

/// HTTP client for the matchmaking, account and moderation endpoints.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    /// Builds a client from the `[backend]` config section.
    ///
    /// Fails with [`DuetError::Config`] when no access token is configured.
    pub fn from_config(config: &BackendConfig) -> Result<Self, DuetError> {
        let token = config
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                DuetError::Config(
                    "backend.access_token is not set (or DUET_BACKEND_ACCESS_TOKEN)".to_string(),
                )
            })?;
        Self::new(
            &config.base_url,
            SecretString::from(token),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Creates a client for `base_url` authenticating with `token`.
    pub fn new(base_url: &str, token: SecretString, timeout: Duration) -> Result<Self, DuetError> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| DuetError::Config(format!("invalid access token header value: {e}")))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DuetError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends a request and unwraps the envelope, returning its `data` if any.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &'static str,
    ) -> Result<Option<T>, DuetError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DuetError::Timeout {
                    duration: self.timeout,
                }
            } else {
                DuetError::Transport {
                    message: format!("{endpoint}: request failed: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| DuetError::Transport {
            message: format!("{endpoint}: failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(endpoint, status = %status, "backend response received");

        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(&body).unwrap_or(Envelope {
                success: false,
                message: None,
                data: None,
            });

        match status {
            StatusCode::FORBIDDEN => {
                let details = envelope
                    .data
                    .clone()
                    .and_then(|d| serde_json::from_value::<BanDetails>(d).ok())
                    .unwrap_or_default();
                return Err(DuetError::Banned {
                    message: envelope.failure_message("You are temporarily banned"),
                    ban_expires_at: details.ban_expires_at,
                });
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(DuetError::RateLimited {
                    message: envelope.failure_message("Too many requests"),
                });
            }
            s if !s.is_success() => {
                warn!(endpoint, status = %s, "backend returned error status");
                return Err(DuetError::Backend {
                    status: Some(s.as_u16()),
                    message: envelope.failure_message(&format!("{endpoint} returned {s}")),
                });
            }
            _ => {}
        }

        if !envelope.success {
            return Err(DuetError::Backend {
                status: Some(status.as_u16()),
                message: envelope.failure_message(&format!("{endpoint} failed")),
            });
        }

        envelope
            .data
            .map(|data| {
                serde_json::from_value(data).map_err(|e| DuetError::Backend {
                    status: Some(status.as_u16()),
                    message: format!("{endpoint}: failed to parse response data: {e}"),
                })
            })
            .transpose()
    }

    async fn send_expecting<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &'static str,
    ) -> Result<T, DuetError> {
        self.send(request, endpoint)
            .await?
            .ok_or_else(|| DuetError::Backend {
                status: None,
                message: format!("{endpoint}: response carried no data"),
            })
    }
}

#[async_trait]
impl MatchmakingApi for BackendClient {
    async fn join_queue(&self) -> Result<JoinOutcome, DuetError> {
        let request = self.client.post(self.url("/matchmaking/join"));
        let data: JoinData = self
            .send_expecting(request, "matchmaking/join")
            .await
            .map_err(|e| match e {
                DuetError::Transport { message, source } => {
                    DuetError::QueueUnavailable { message, source }
                }
                DuetError::Timeout { duration } => DuetError::QueueUnavailable {
                    message: format!("queue join timed out after {duration:?}"),
                    source: None,
                },
                other => other,
            })?;
        data.into_outcome()
    }

    async fn queue_status(&self) -> Result<PollOutcome, DuetError> {
        let request = self.client.get(self.url("/matchmaking/status"));
        let data: StatusData = self.send_expecting(request, "matchmaking/status").await?;
        data.into_outcome()
    }

    async fn leave_queue(&self) -> Result<(), DuetError> {
        let request = self.client.post(self.url("/matchmaking/leave"));
        self.send::<serde_json::Value>(request, "matchmaking/leave")
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl AccountApi for BackendClient {
    async fn current_user(&self) -> Result<UserProfile, DuetError> {
        let request = self.client.get(self.url("/users/me"));
        self.send_expecting(request, "users/me").await
    }

    async fn decrease_stars(&self, amount: u32) -> Result<(), DuetError> {
        let request = self
            .client
            .post(self.url("/users/stars/decrease"))
            .json(&DecreaseStarsRequest { amount });
        self.send::<serde_json::Value>(request, "users/stars/decrease")
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ModerationApi for BackendClient {
    async fn ban_status(&self) -> Result<ModerationStatus, DuetError> {
        let request = self.client.get(self.url("/reports/ban-status"));
        self.send_expecting(request, "reports/ban-status").await
    }

    async fn submit_report(
        &self,
        reported_user_id: &UserId,
        reason: &str,
    ) -> Result<(), DuetError> {
        let request = self
            .client
            .post(self.url("/reports/submit"))
            .json(&ReportRequest {
                reported_user_id: &reported_user_id.0,
                reason,
            });
        self.send::<serde_json::Value>(request, "reports/submit")
            .await
            .map(|_| ())
    }
}
