// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Concurrent probe dispatch
//!
//! Each probe runs on its own tokio task. At most `concurrency` tasks are in
//! flight; collection of any one task is bounded by the request timeout plus
//! a grace period, so a stuck exchange becomes a timeout outcome instead of
//! stalling the run.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use super::config::{BodyEncoding, HttpMethod, ScanRequestConfig};
use super::Probe;
use crate::error::{Result, TransportError};
use crate::http::{headers, Request, Response, Transport, DEFAULT_USER_AGENT};

/// Extra time allowed for collecting a probe past its request timeout
pub const DEFAULT_COLLECTION_GRACE: Duration = Duration::from_secs(3);

/// What the network layer returned for one probe
#[derive(Debug)]
pub struct ProbeOutcome {
    pub probe: Probe,
    pub response: std::result::Result<Response, TransportError>,
}

/// Dispatch statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchStats {
    /// Probes handed to the dispatcher
    pub probes_submitted: u64,
    /// Probes that produced a response
    pub responses: u64,
    /// Probes that failed in transport
    pub transport_errors: u64,
    /// Probes that failed by timeout (subset of `transport_errors`)
    pub timeouts: u64,
    /// Probes currently in flight
    pub in_flight: u64,
    /// Peak concurrent probes
    pub peak_in_flight: u64,
    /// Total dispatch wall time (ms)
    pub elapsed_ms: u64,
}

/// Bounded worker pool that sends probes and collects their outcomes
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
    grace: Duration,
    stats: Arc<RwLock<DispatchStats>>,
}

/// Marks one probe in flight for as long as it lives
struct InFlight {
    stats: Arc<RwLock<DispatchStats>>,
}

impl InFlight {
    fn enter(stats: &Arc<RwLock<DispatchStats>>) -> Self {
        {
            let mut stats = stats.write();
            stats.in_flight += 1;
            if stats.in_flight > stats.peak_in_flight {
                stats.peak_in_flight = stats.in_flight;
            }
        }
        Self {
            stats: Arc::clone(stats),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut stats = self.stats.write();
        stats.in_flight = stats.in_flight.saturating_sub(1);
    }
}

impl RequestDispatcher {
    /// Create a dispatcher over the given transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            grace: DEFAULT_COLLECTION_GRACE,
            stats: Arc::new(RwLock::new(DispatchStats::default())),
        }
    }

    /// Set collection grace period
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Send every probe and return exactly one outcome per probe
    ///
    /// Outcomes come back in completion order. A failure of one probe never
    /// affects the others.
    pub async fn execute(
        &self,
        config: Arc<ScanRequestConfig>,
        probes: Vec<Probe>,
    ) -> Vec<ProbeOutcome> {
        let start = Instant::now();
        let submitted = probes.len();
        self.stats.write().probes_submitted += submitted as u64;

        debug!(
            probes = submitted,
            concurrency = config.concurrency(),
            "dispatching probes"
        );

        let outcomes: Vec<ProbeOutcome> = stream::iter(probes)
            .map(|probe| self.spawn_probe(Arc::clone(&config), probe))
            .buffer_unordered(config.concurrency().max(1))
            .collect()
            .await;

        {
            let mut stats = self.stats.write();
            stats.elapsed_ms += start.elapsed().as_millis() as u64;
        }

        debug_assert_eq!(outcomes.len(), submitted);
        outcomes
    }

    /// Spawn one probe task and return a future that collects its outcome
    fn spawn_probe(
        &self,
        config: Arc<ScanRequestConfig>,
        probe: Probe,
    ) -> impl Future<Output = ProbeOutcome> + Send + 'static {
        let transport = Arc::clone(&self.transport);
        let stats = Arc::clone(&self.stats);
        let deadline = config.timeout() + self.grace;
        let task_probe = probe.clone();

        let mut handle = tokio::spawn(async move {
            let _in_flight = InFlight::enter(&stats);
            send_probe(transport.as_ref(), &config, &task_probe).await
        });

        let stats = Arc::clone(&self.stats);
        async move {
            let response = match tokio::time::timeout(deadline, &mut handle).await {
                Ok(Ok(response)) => response,
                Ok(Err(join_error)) => {
                    warn!(
                        probe = probe.id,
                        parameter = %probe.parameter,
                        error = %join_error,
                        "probe task aborted"
                    );
                    Err(TransportError::Aborted(join_error.to_string()))
                }
                Err(_) => {
                    handle.abort();
                    warn!(
                        probe = probe.id,
                        parameter = %probe.parameter,
                        deadline_ms = deadline.as_millis() as u64,
                        "probe not collected before deadline"
                    );
                    Err(TransportError::Timeout {
                        duration_ms: deadline.as_millis() as u64,
                    })
                }
            };

            {
                let mut stats = stats.write();
                match &response {
                    Ok(_) => stats.responses += 1,
                    Err(error) => {
                        stats.transport_errors += 1;
                        if error.is_timeout() {
                            stats.timeouts += 1;
                        }
                    }
                }
            }

            ProbeOutcome { probe, response }
        }
    }

    /// Get dispatch statistics
    pub fn stats(&self) -> DispatchStats {
        self.stats.read().clone()
    }

    /// Reset statistics
    pub fn reset_stats(&self) {
        let mut stats = self.stats.write();
        *stats = DispatchStats::default();
    }

    /// Get collection grace period
    pub fn grace(&self) -> Duration {
        self.grace
    }
}

async fn send_probe(
    transport: &dyn Transport,
    config: &ScanRequestConfig,
    probe: &Probe,
) -> std::result::Result<Response, TransportError> {
    let timeout = config.timeout();
    let timeout_ms = timeout.as_millis() as u64;

    let request = build_probe_request(config, probe)
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

    match tokio::time::timeout(timeout, transport.send(request)).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(error)) => Err(TransportError::from_error(&error, timeout_ms)),
        Err(_) => Err(TransportError::Timeout {
            duration_ms: timeout_ms,
        }),
    }
}

/// Build the HTTP request for one probe
///
/// The probed parameter's value is replaced by the payload; every other base
/// parameter keeps its value. GET merges the set into the target URL's
/// query, POST sends it as the body.
pub fn build_probe_request(config: &ScanRequestConfig, probe: &Probe) -> Result<Request> {
    let params = probe_params(config.params(), &probe.parameter, &probe.payload.text);

    let mut request = match config.method() {
        HttpMethod::Get => Request::new(
            config.method().to_method(),
            merge_query(config.target_url(), &params),
        ),
        HttpMethod::Post => {
            let request = Request::new(config.method().to_method(), config.target_url().clone());
            match config.body_encoding() {
                BodyEncoding::Form => request.form(&params),
                BodyEncoding::Json => {
                    let body: Map<String, Value> = params
                        .into_iter()
                        .map(|(name, value)| (name, Value::String(value)))
                        .collect();
                    request.json(&body)?
                }
            }
        }
    };

    for (name, value) in config.headers() {
        request = request.header(name, value)?;
    }

    if let Some(cookie) = config.cookie_header() {
        request = request.header(headers::COOKIE, cookie)?;
    }

    if !request.has_header(headers::USER_AGENT) {
        let user_agent = config.user_agent().unwrap_or(DEFAULT_USER_AGENT);
        request = request.header(headers::USER_AGENT, user_agent)?;
    }

    Ok(request.timeout(config.timeout()))
}

fn probe_params(base: &[(String, String)], parameter: &str, value: &str) -> Vec<(String, String)> {
    let mut params = base.to_vec();
    match params.iter_mut().find(|(name, _)| name == parameter) {
        Some(slot) => slot.1 = value.to_string(),
        None => params.push((parameter.to_string(), value.to_string())),
    }
    params
}

/// Merge parameters into a URL's query string
///
/// A key already in the query has its first occurrence replaced and any
/// later duplicates dropped; new keys are appended. Unrelated pairs, the
/// path and the fragment are kept.
pub fn merge_query(url: &Url, params: &[(String, String)]) -> Url {
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    for (name, value) in params {
        let mut seen = false;
        pairs.retain(|(existing, _)| {
            if existing != name {
                return true;
            }
            let keep = !seen;
            seen = true;
            keep
        });

        match pairs.iter_mut().find(|(existing, _)| existing == name) {
            Some(slot) => slot.1 = value.clone(),
            None => pairs.push((name.clone(), value.clone())),
        }
    }

    let mut merged = url.clone();
    if pairs.is_empty() {
        merged.set_query(None);
    } else {
        merged.query_pairs_mut().clear().extend_pairs(&pairs);
    }
    merged
}
