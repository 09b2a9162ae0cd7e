//! HTTP bridge to the provider SDK.
//!
//! Each request is POSTed as `{service, operation, params, stage, region}`.
//! A 2xx body is the operation result; anything else carries
//! `{code, message}` and is classified into a [`RemoteError`]. Transport
//! failures and 5xx responses are retried (max 3 attempts, exponential backoff).

use async_trait::async_trait;
use gwdoc_core::RemoteError;
use gwdoc_core::RemoteRequest;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{Duration, sleep};

const MAX_RETRY_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(250);

#[derive(Serialize)]
struct BridgeRequest<'a> {
    service: &'a str,
    operation: &'a str,
    params: &'a Value,
    stage: &'a str,
    region: &'a str,
}

#[derive(Deserialize, Default)]
struct BridgeFailure {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpBridge {
    client: Client,
    url: String,
    backoff: Duration,
}

impl HttpBridge {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            backoff: BACKOFF_BASE,
        }
    }

    /// Delay before the first retry; doubled for each further one.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl RemoteRequest for HttpBridge {
    async fn request(
        &self,
        service: &str,
        operation: &str,
        params: Value,
        stage: &str,
        region: &str,
    ) -> Result<Value, RemoteError> {
        let body = BridgeRequest {
            service,
            operation,
            params: &params,
            stage,
            region,
        };
        let mut last_error = None;

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            log::debug!("{service}.{operation} (attempt {})", attempt + 1);
            match self.client.post(&self.url).json(&body).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.json().await.map_err(|e| {
                            RemoteError::InvalidResponse(format!("{service}.{operation}: {e}"))
                        });
                    }

                    let text = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<no body>".to_string());
                    let failure: BridgeFailure = serde_json::from_str(&text).unwrap_or_default();
                    let message = failure.message.unwrap_or(text);
                    let error = RemoteError::classify(operation, failure.code.as_deref(), &message);
                    if !status.is_server_error() {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
                Err(e) => {
                    last_error = Some(RemoteError::Transport(format!(
                        "{service}.{operation} request failed: {e}"
                    )));
                }
            }

            if attempt + 1 < MAX_RETRY_ATTEMPTS {
                sleep(self.backoff * 2u32.pow(attempt)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            RemoteError::Transport(format!(
                "{service}.{operation} failed after {MAX_RETRY_ATTEMPTS} attempts"
            ))
        }))
    }
}
