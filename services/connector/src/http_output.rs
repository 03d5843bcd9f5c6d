//! Decision sink client.
//!
//! POSTs one decision record per processed message to the configured
//! endpoint, optionally acquiring a bearer token first (password grant).

use crate::config::{AuthConfig, HttpOutputConfig};
use crate::decision::build_decision;
use crate::sae::VideoFrame;
use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info};

/// Decision POST failures, categorized for logging
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("decision request timed out")]
    Timeout,

    #[error("decision endpoint returned HTTP {status}")]
    Http { status: u16, body: String },

    #[error("decision request failed: {0}")]
    Transport(String),
}

fn categorize(e: reqwest::Error) -> SinkError {
    if e.is_timeout() {
        SinkError::Timeout
    } else {
        SinkError::Transport(e.to_string())
    }
}

/// HTTP output for decision records
pub struct HttpOutput {
    client: reqwest::Client,
    config: HttpOutputConfig,
}

impl HttpOutput {
    /// Create the output with a bounded request timeout
    pub fn new(config: HttpOutputConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to create decision sink HTTP client")?;

        Ok(Self { client, config })
    }

    /// Build and send the decision record for one processed message
    pub async fn send_decision(
        &self,
        frame: &VideoFrame,
        message_id: &str,
    ) -> Result<(), SinkError> {
        let payload = build_decision(
            frame,
            message_id,
            &self.config.s3.bucket,
            &self.config.module_name,
        );

        info!(endpoint = %self.config.target_endpoint, "Sending decision to cockpit");
        debug!(?payload, "Decision payload");

        let mut request = self.client.post(&self.config.target_endpoint).json(&payload);

        if let Some(ref auth) = self.config.auth {
            let token = self.fetch_token(auth).await?;
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(categorize)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }

    /// Acquire an access token via the password grant
    async fn fetch_token(&self, auth: &AuthConfig) -> Result<String, SinkError> {
        let response = self
            .client
            .post(&auth.token_endpoint_url)
            .form(&[
                ("client_id", auth.client_id.as_str()),
                ("username", auth.username.as_str()),
                ("password", auth.password.as_str()),
                ("grant_type", "password"),
            ])
            .send()
            .await
            .map_err(categorize)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: serde_json::Value = response.json().await.map_err(categorize)?;
        body.get("access_token")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| {
                SinkError::Transport("token response missing access_token".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_categorization_is_distinct() {
        let timeout = SinkError::Timeout;
        let transport = SinkError::Transport("dns failure".to_string());
        assert_ne!(timeout.to_string(), transport.to_string());
    }

    #[test]
    fn test_http_error_carries_status() {
        let err = SinkError::Http {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert!(err.to_string().contains("503"));
    }
}
