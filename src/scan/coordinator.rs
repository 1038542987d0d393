// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Scan orchestration

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::config::ScanRequestConfig;
use super::dispatcher::{ProbeOutcome, RequestDispatcher, DEFAULT_COLLECTION_GRACE};
use super::{Probe, ProbeResult, ScanReport};
use crate::error::Result;
use crate::http::{HttpClient, HttpClientConfig, Transport};
use crate::xss::{classify, Payload};

/// Runs scans: payloads, probes, dispatch, classification
///
/// Holds no per-scan state; one coordinator may run any number of scans,
/// concurrently or in sequence.
pub struct ScanCoordinator {
    transport: Arc<dyn Transport>,
    seed: Option<u64>,
    grace: Duration,
}

impl ScanCoordinator {
    /// Create a coordinator over a scanning HTTP client
    pub fn new() -> Result<Self> {
        let client = HttpClient::with_config(HttpClientConfig::for_scanning())?;
        Ok(Self::with_transport(Arc::new(client)))
    }

    /// Create a coordinator over any transport
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            seed: None,
            grace: DEFAULT_COLLECTION_GRACE,
        }
    }

    /// Seed marker generation so runs are reproducible
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set collection grace period
    pub fn collection_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Run one scan
    ///
    /// Returns one result per (parameter, payload) pair. Transport failures
    /// are recorded on their results; the run itself does not fail.
    pub async fn run(&self, config: &ScanRequestConfig) -> ScanReport {
        let started_at = Utc::now();

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let payloads = config.catalog().generate(&mut rng);
        let marker = payloads
            .first()
            .map(|payload| payload.marker.clone())
            .unwrap_or_default();

        let probes = build_probes(config.params(), &payloads);
        let expected = probes.len();

        info!(
            url = %config.target_url(),
            method = %config.method(),
            parameters = config.params().len(),
            payloads = payloads.len(),
            probes = expected,
            concurrency = config.concurrency(),
            "starting reflected XSS scan"
        );

        let dispatcher =
            RequestDispatcher::new(Arc::clone(&self.transport)).with_grace(self.grace);
        let outcomes = dispatcher.execute(Arc::new(config.clone()), probes).await;

        let results: Vec<ProbeResult> = outcomes.into_iter().map(assess).collect();
        debug_assert_eq!(results.len(), expected);

        let report = ScanReport {
            target_url: config.target_url().to_string(),
            marker,
            started_at,
            finished_at: Utc::now(),
            results,
            stats: dispatcher.stats(),
        };

        info!(
            url = %report.target_url,
            probes = report.results.len(),
            unsafe_reflections = report.unsafe_results().len(),
            errors = report.failed_results().len(),
            duration_ms = report.duration_ms(),
            "scan finished"
        );

        report
    }
}

/// Cross every parameter with every payload
///
/// Probe ids follow submission order: parameters outer, payloads inner.
pub fn build_probes(params: &[(String, String)], payloads: &[Payload]) -> Vec<Probe> {
    params
        .iter()
        .flat_map(|(parameter, _)| {
            payloads.iter().map(move |payload| (parameter, payload))
        })
        .enumerate()
        .map(|(id, (parameter, payload))| Probe {
            id,
            parameter: parameter.clone(),
            payload: payload.clone(),
        })
        .collect()
}

/// Classify one outcome into a result
fn assess(outcome: ProbeOutcome) -> ProbeResult {
    let ProbeOutcome { probe, response } = outcome;

    match response {
        Ok(response) => {
            let body = response.text_lossy();
            let classification = classify(&probe.payload.text, &body);

            if classification.unsafe_reflection {
                info!(
                    parameter = %probe.parameter,
                    payload_context = probe.payload.context_label(),
                    reason = %classification.reason,
                    guessed = ?classification.context,
                    status = response.status_code(),
                    "unsafe reflection"
                );
            } else if classification.reason.is_fallback() {
                info!(
                    parameter = %probe.parameter,
                    payload_context = probe.payload.context_label(),
                    snippet = %classification.snippet,
                    "payload reflected but no rule matched"
                );
            } else {
                debug!(
                    parameter = %probe.parameter,
                    payload_context = probe.payload.context_label(),
                    reason = %classification.reason,
                    "reflection safe"
                );
            }

            ProbeResult::from_response(probe, &response, classification)
        }
        Err(error) => {
            warn!(
                parameter = %probe.parameter,
                payload_context = probe.payload.context_label(),
                error = %error,
                "probe failed"
            );
            ProbeResult::from_transport_error(probe, error)
        }
    }
}

/// Run one scan over a fresh scanning HTTP client
pub async fn scan(config: &ScanRequestConfig) -> Result<ScanReport> {
    Ok(ScanCoordinator::new()?.run(config).await)
}
