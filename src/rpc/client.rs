//! Raw JSON-RPC submission over HTTP

use super::envelope::RpcPayload;
use crate::error::{HarnessError, HarnessResult};
use crate::metrics;

use std::time::{Duration, Instant};
use tracing::debug;

/// Posts payloads verbatim and returns the body verbatim
#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: &str, request_timeout: Duration) -> HarnessResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| HarnessError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    /// Send `payload` and return the raw reply body
    ///
    /// Non-2xx statuses still return the body; nodes commonly put JSON-RPC
    /// error objects behind them.
    pub async fn send(&self, payload: &RpcPayload) -> HarnessResult<String> {
        let method = payload.method().to_string();
        let started = Instant::now();

        let response = self
            .http
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| classify(&method, e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| classify(&method, e))?;

        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_submission(&method, payload.is_batch(), elapsed);
        debug!(
            method = %method,
            status = status.as_u16(),
            requests = payload.len(),
            elapsed_ms = (elapsed * 1000.0) as u64,
            "JSON-RPC exchange complete"
        );
        Ok(body)
    }
}

fn classify(method: &str, err: reqwest::Error) -> HarnessError {
    if err.is_timeout() {
        HarnessError::Timeout {
            operation: method.to_string(),
        }
    } else {
        HarnessError::Transport(err.to_string())
    }
}
