//! HTTP delivery with primary/fallback failover.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::telemetry::delivery::{record_send_outcome, start_send_span};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, warn};

use super::endpoint::{Endpoint, Endpoints, RetryPolicy, TargetRole};

/// How a send relates to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Background telemetry: bounded per-attempt timeout, errors logged and
    /// dropped.
    FireAndForget,
    /// User-initiated: errors go back to the caller.
    Awaited,
}

impl DeliveryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMode::FireAndForget => "fire_and_forget",
            DeliveryMode::Awaited => "awaited",
        }
    }
}

/// Classification of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    TransportError,
    ProtocolError,
    /// The peer answered with a success status but the body could not be
    /// read. Ends the send like a protocol error.
    BodyError,
}

impl AttemptOutcome {
    fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => AttemptOutcome::Success,
            Err(e) if e.is_transport() => AttemptOutcome::TransportError,
            Err(Error::Decode(_)) => AttemptOutcome::BodyError,
            Err(_) => AttemptOutcome::ProtocolError,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::TransportError => "transport_error",
            AttemptOutcome::ProtocolError => "protocol_error",
            AttemptOutcome::BodyError => "body_error",
        }
    }
}

/// Record of one attempt. Lives only as long as the send that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAttempt {
    pub target: TargetRole,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

/// A success response from the backend.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
    pub served_by: TargetRole,
    /// Every attempt made, including the successful one.
    pub attempts: Vec<DeliveryAttempt>,
}

impl Response {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| Error::Decode(e.to_string()))
    }
}

enum Request {
    Post {
        path: String,
        body: serde_json::Value,
    },
    Get {
        path: String,
        query: Vec<(String, String)>,
    },
}

impl Request {
    fn path(&self) -> &str {
        match self {
            Request::Post { path, .. } | Request::Get { path, .. } => path,
        }
    }
}

/// Sends payloads to the backend, primary first, falling back to the
/// secondary target when the primary is not listening.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct DeliveryClient {
    http: reqwest::Client,
    endpoints: Arc<Endpoints>,
    policy: RetryPolicy,
    background_timeout: Duration,
    interactive_timeout: Option<Duration>,
}

impl DeliveryClient {
    pub fn new(endpoints: Endpoints, background_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints: Arc::new(endpoints),
            policy: RetryPolicy,
            background_timeout,
            interactive_timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Endpoints::from_config(config), config.event_timeout())
            .with_interactive_timeout(config.interactive_timeout())
    }

    pub fn with_interactive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.interactive_timeout = timeout;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Awaited POST of a JSON body.
    pub async fn send<P: Serialize + ?Sized>(&self, path: &str, payload: &P) -> Result<Response> {
        let body = serde_json::to_value(payload)?;
        let request = Request::Post {
            path: path.to_string(),
            body,
        };
        self.deliver(&request, DeliveryMode::Awaited).await
    }

    /// Awaited GET with query parameters.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response> {
        let request = Request::Get {
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        };
        self.deliver(&request, DeliveryMode::Awaited).await
    }

    /// Fire-and-forget POST.
    ///
    /// Returns at once. The send runs on its own task; any failure is logged
    /// and dropped. The handle may be ignored.
    pub fn send_detached<P: Serialize + ?Sized>(&self, path: &str, payload: &P) -> JoinHandle<()> {
        let body = serde_json::to_value(payload);
        let client = self.clone();
        let path = path.to_string();
        tokio::spawn(async move {
            let body = match body {
                Ok(body) => body,
                Err(e) => {
                    warn!(%path, error = %e, "event payload not serializable, dropped");
                    return;
                }
            };
            let request = Request::Post { path, body };
            match client.deliver(&request, DeliveryMode::FireAndForget).await {
                Ok(response) => {
                    debug!(
                        path = request.path(),
                        served_by = %response.served_by,
                        attempts = response.attempts.len(),
                        "event delivered"
                    );
                }
                Err(e) => {
                    metrics::delivery_dropped()
                        .add(1, &[KeyValue::new("path", request.path().to_string())]);
                    warn!(path = request.path(), error = %e, "failed to send event");
                }
            }
        })
    }

    /// Try each candidate in order until one succeeds, the policy says stop,
    /// or all are exhausted.
    async fn deliver(&self, request: &Request, mode: DeliveryMode) -> Result<Response> {
        let span = start_send_span(request.path(), mode.as_str());
        let send_span = span.clone();

        async move {
            let started = Instant::now();
            let mut attempts = Vec::with_capacity(self.endpoints.len());
            let mut last_error = None;

            for endpoint in self.endpoints.iter() {
                let attempt_started = Instant::now();
                let result = self.attempt(endpoint, request, mode).await;
                let outcome = AttemptOutcome::of(&result);
                attempts.push(DeliveryAttempt {
                    target: endpoint.role,
                    outcome,
                    elapsed: attempt_started.elapsed(),
                });
                metrics::delivery_attempts().add(
                    1,
                    &[
                        KeyValue::new("target", endpoint.role.as_str()),
                        KeyValue::new("outcome", outcome.as_str()),
                    ],
                );

                match result {
                    Ok(mut response) => {
                        response.attempts = attempts;
                        finish(&send_span, request.path(), started, &response.attempts, "success");
                        return Ok(response);
                    }
                    Err(e) if self.policy.should_try_next(&e) => {
                        debug!(endpoint = %endpoint, error = %e, "target unreachable, trying next");
                        last_error = Some(e);
                    }
                    Err(e) => {
                        finish(&send_span, request.path(), started, &attempts, outcome.as_str());
                        return Err(e);
                    }
                }
            }

            finish(&send_span, request.path(), started, &attempts, "exhausted");
            Err(last_error
                .unwrap_or_else(|| Error::Other("no delivery targets configured".to_string())))
        }
        .instrument(span)
        .await
    }

    async fn attempt(
        &self,
        endpoint: &Endpoint,
        request: &Request,
        mode: DeliveryMode,
    ) -> Result<Response> {
        let url = endpoint.url(request.path());
        let mut builder = match request {
            Request::Post { body, .. } => self.http.post(&url).json(body),
            Request::Get { query, .. } => self.http.get(&url).query(query),
        };
        let timeout = match mode {
            DeliveryMode::FireAndForget => Some(self.background_timeout),
            DeliveryMode::Awaited => self.interactive_timeout,
        };
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| Error::Transport {
            target: endpoint.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Protocol {
                target: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        // The peer answered; a broken body is not a reason to try the other port.
        let body = response
            .text()
            .await
            .map_err(|e| Error::Decode(format!("reading body from {endpoint}: {e}")))?;

        Ok(Response {
            status: status.as_u16(),
            body,
            served_by: endpoint.role,
            attempts: Vec::new(),
        })
    }
}

fn finish(
    span: &tracing::Span,
    path: &str,
    started: Instant,
    attempts: &[DeliveryAttempt],
    outcome: &str,
) {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    record_send_outcome(span, attempts.len(), outcome);
    metrics::delivery_duration_ms().record(
        elapsed_ms,
        &[
            KeyValue::new("path", path.to_string()),
            KeyValue::new("outcome", outcome.to_string()),
        ],
    );
}
