// ── HTTP stream transport ──
//
// Pulls a camera's continuous stream body with reqwest until the
// connection is closed. Each connection is one tokio task with its own
// child CancellationToken; outcomes go back to the service loop.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

use super::ConnectionOutcome;
use super::registry::{ConnectionId, StreamHandle};
use super::transport::StreamTransport;
use crate::error::CoreError;

pub struct HttpTransport {
    client: reqwest::Client,
    outcomes: mpsc::UnboundedSender<ConnectionOutcome>,
    cancel: CancellationToken,
    tasks: HashMap<ConnectionId, CancellationToken>,
}

impl HttpTransport {
    /// Create a transport reporting outcomes on `outcomes`. Connections
    /// are spawned on the current tokio runtime.
    pub fn new(client: reqwest::Client, outcomes: mpsc::UnboundedSender<ConnectionOutcome>) -> Self {
        Self {
            client,
            outcomes,
            cancel: CancellationToken::new(),
            tasks: HashMap::new(),
        }
    }

    pub fn active(&self) -> usize {
        self.tasks.len()
    }
}

impl StreamTransport for HttpTransport {
    fn connect(&mut self, handle: &StreamHandle) -> Result<(), CoreError> {
        let token = self.cancel.child_token();
        let cancel = token.clone();
        let client = self.client.clone();
        let outcomes = self.outcomes.clone();
        let id = handle.id;
        let url = handle.url.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => debug!(connection = %id, "stream pull cancelled"),
                result = pull_stream(&client, &url, id, &outcomes) => {
                    if let Err(e) = result {
                        let _ = outcomes.send(ConnectionOutcome::Failed {
                            id,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        });

        self.tasks.insert(id, token);
        Ok(())
    }

    fn disconnect(&mut self, handle: &StreamHandle) {
        if let Some(token) = self.tasks.remove(&handle.id) {
            token.cancel();
        }
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Request the endpoint, report it live, then drain the body until it
/// ends. A stream that ends is reported as a failure; cameras do not
/// close healthy streams.
async fn pull_stream(
    client: &reqwest::Client,
    url: &Url,
    id: ConnectionId,
    outcomes: &mpsc::UnboundedSender<ConnectionOutcome>,
) -> Result<(), CoreError> {
    let mut response = client.get(url.clone()).send().await?.error_for_status()?;
    let _ = outcomes.send(ConnectionOutcome::Established(id));
    debug!(connection = %id, %url, "stream established");

    let mut received: usize = 0;
    while let Some(chunk) = response.chunk().await? {
        received += chunk.len();
        trace!(connection = %id, received, "stream chunk");
    }
    Err(CoreError::Transport {
        url: url.to_string(),
        reason: format!("stream ended after {received} bytes"),
    })
}

// ── Probe ────────────────────────────────────────────────────────

/// One-shot reachability check of a camera endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub url: Url,
    pub reachable: bool,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// Request the endpoint and read only the response head. The stream body
/// is dropped unread.
pub async fn probe_endpoint(client: &reqwest::Client, url: &Url, timeout: Duration) -> ProbeReport {
    let started = Instant::now();
    let result = client.get(url.clone()).timeout(timeout).send().await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(response) => {
            let status = response.status();
            ProbeReport {
                url: url.clone(),
                reachable: status.is_success(),
                status: Some(status.as_u16()),
                content_type: response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(ToOwned::to_owned),
                latency_ms,
                error: None,
            }
        }
        Err(e) => ProbeReport {
            url: url.clone(),
            reachable: false,
            status: None,
            content_type: None,
            latency_ms,
            error: Some(e.to_string()),
        },
    }
}
