//! ---
//! meterlink_section: "05-networking-external-interfaces"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Remote collector connectivity."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use meterlink_common::config::CollectorConfig;
use meterlink_sim::Reading;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::credential::Credential;

/// Failures reported by a [`SubmissionClient`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The collector reported the credential as invalid or expired.
    #[error("collector rejected the session credential: {message}")]
    AuthRejected {
        /// Reason supplied by the collector, or the HTTP status text.
        message: String,
    },
    /// Network failure or any other non-success response.
    #[error("transport failure{}: {message}", status_suffix(.status))]
    Transport {
        /// HTTP status when a response was received at all.
        status: Option<u16>,
        /// Human readable description for the operator.
        message: String,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (status {code})"))
        .unwrap_or_default()
}

/// Wire envelope shared by request and response bodies: `{ "device": Reading }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEnvelope {
    /// The carried reading; absent in responses that do not echo it.
    #[serde(default)]
    pub device: Option<Reading>,
}

/// Sends one reading to the remote collector.
///
/// Implementations perform exactly one request per call and never retry; the
/// caller owns retry policy.
#[async_trait]
pub trait SubmissionClient: Send + Sync + 'static {
    /// Submit `reading` under `credential`, returning the reading the collector
    /// accepted (which may be the input echoed back).
    async fn submit(&self, credential: &Credential, reading: &Reading)
        -> Result<Reading, SubmitError>;

    /// Endpoint description used in log context.
    fn endpoint(&self) -> &str {
        ""
    }
}

/// [`SubmissionClient`] speaking JSON over HTTP(S) with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpCollectorClient {
    client: Client,
    submit_url: Url,
    verify_url: Url,
}

impl HttpCollectorClient {
    /// Build a client with an explicit per-request deadline.
    pub fn new(submit_url: Url, verify_url: Url, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build collector http client")?;
        Ok(Self {
            client,
            submit_url,
            verify_url,
        })
    }

    /// Build a client from the `[collector]` configuration section.
    pub fn from_config(config: &CollectorConfig) -> Result<Self> {
        let submit_url = Url::parse(&config.submit_url)
            .with_context(|| format!("invalid submit url {}", config.submit_url))?;
        let verify_url = Url::parse(&config.verify_url)
            .with_context(|| format!("invalid verify url {}", config.verify_url))?;
        Self::new(submit_url, verify_url, config.request_timeout)
    }

    /// Ask the collector whether `credential` is currently accepted. Used on
    /// the login path before a token is stored.
    pub async fn verify(&self, credential: &Credential) -> Result<(), SubmitError> {
        let response = self
            .client
            .get(self.verify_url.clone())
            .bearer_auth(credential.expose())
            .send()
            .await
            .map_err(transport_error)?;
        classify(response).await?;
        debug!(endpoint = %self.verify_url, "credential verified");
        Ok(())
    }
}

#[async_trait]
impl SubmissionClient for HttpCollectorClient {
    async fn submit(
        &self,
        credential: &Credential,
        reading: &Reading,
    ) -> Result<Reading, SubmitError> {
        let body = DeviceEnvelope {
            device: Some(*reading),
        };
        let response = self
            .client
            .post(self.submit_url.clone())
            .bearer_auth(credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = classify(response).await?;
        let text = response.text().await.map_err(transport_error)?;
        Ok(accepted_reading(&text, reading))
    }

    fn endpoint(&self) -> &str {
        self.submit_url.as_str()
    }
}

/// The collector's echoed reading wins; a body without one keeps the local reading.
fn accepted_reading(body: &str, local: &Reading) -> Reading {
    match serde_json::from_str::<DeviceEnvelope>(body) {
        Ok(DeviceEnvelope {
            device: Some(remote),
        }) => remote,
        Ok(DeviceEnvelope { device: None }) => *local,
        Err(err) => {
            debug!(error = %err, "collector response carried no reading; keeping local copy");
            *local
        }
    }
}

async fn classify(response: Response) -> Result<Response, SubmitError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected response status")
            .to_owned()
    });
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SubmitError::AuthRejected { message });
    }
    Err(SubmitError::Transport {
        status: Some(status.as_u16()),
        message,
    })
}

fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|message| message.as_str())
        .map(str::to_owned)
}

fn transport_error(err: reqwest::Error) -> SubmitError {
    let message = if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("collector unreachable: {err}")
    } else {
        err.to_string()
    };
    SubmitError::Transport {
        status: err.status().map(|status| status.as_u16()),
        message,
    }
}
