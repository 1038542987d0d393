// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Scan engine
//!
//! A scan run takes a validated [`ScanRequestConfig`], crosses its
//! parameters with one payload catalog, sends every probe through a bounded
//! worker pool and classifies each response. Every submitted probe yields
//! exactly one [`ProbeResult`], whether the exchange succeeded or not.

mod config;
mod coordinator;
mod dispatcher;

pub use config::{
    parse_kv_block, BodyEncoding, HttpMethod, ScanConfigBuilder, ScanRequestConfig,
    DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, MAX_CONCURRENCY,
};
pub use coordinator::{build_probes, scan, ScanCoordinator};
pub use dispatcher::{
    build_probe_request, merge_query, DispatchStats, ProbeOutcome, RequestDispatcher,
    DEFAULT_COLLECTION_GRACE,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::http::Response;
use crate::xss::{Classification, GuessedContext, Payload, ReasonCode};

/// One (parameter, payload) test unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Probe {
    /// Submission index; identifies the probe within its run
    pub id: usize,
    /// Parameter whose value is replaced by the payload
    pub parameter: String,
    /// Injected payload
    pub payload: Payload,
}

/// Outcome of one probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    /// The probe this result belongs to
    pub probe: Probe,
    /// Payload came back in an unsafe position
    pub reflected: bool,
    /// HTTP status, absent on transport failure
    pub status_code: Option<u16>,
    /// URL after redirects, absent on transport failure
    pub final_url: Option<String>,
    /// Body text around the deciding occurrence
    pub snippet: String,
    /// Classification reason, absent on transport failure
    pub reason: Option<ReasonCode>,
    /// Context guess for unsafe reflections
    pub guessed_context: Option<GuessedContext>,
    /// Transport failure, if the exchange did not complete
    pub error: Option<TransportError>,
    /// Response time in milliseconds
    pub response_time_ms: Option<u64>,
}

impl ProbeResult {
    /// Result for a completed exchange
    pub fn from_response(probe: Probe, response: &Response, classification: Classification) -> Self {
        Self {
            probe,
            reflected: classification.unsafe_reflection,
            status_code: Some(response.status_code()),
            final_url: Some(response.url_str().to_string()),
            snippet: classification.snippet,
            reason: Some(classification.reason),
            guessed_context: classification.context,
            error: None,
            response_time_ms: Some(response.response_time_ms),
        }
    }

    /// Result for a failed exchange
    pub fn from_transport_error(probe: Probe, error: TransportError) -> Self {
        Self {
            probe,
            reflected: false,
            status_code: None,
            final_url: None,
            snippet: String::new(),
            reason: None,
            guessed_context: None,
            error: Some(error),
            response_time_ms: None,
        }
    }

    /// Check if the exchange failed
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        let verdict = match (&self.error, self.reflected) {
            (Some(_), _) => "ERROR",
            (None, true) => "UNSAFE",
            (None, false) => "safe",
        };

        let mut line = format!(
            "[{}] param={} context={} payload={}",
            verdict,
            self.probe.parameter,
            self.probe.payload.context_label(),
            self.probe.payload.text
        );

        if let Some(status) = self.status_code {
            line.push_str(&format!(" status={}", status));
        }
        if let Some(reason) = self.reason {
            line.push_str(&format!(" reason={}", reason));
        }
        if let Some(context) = self.guessed_context {
            line.push_str(&format!(" guessed={}", context));
        }
        if let Some(ref error) = self.error {
            line.push_str(&format!(" error={}", error));
        }

        line
    }
}

/// Everything one scan run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Target URL as configured
    pub target_url: String,
    /// Marker shared by every payload of the run
    pub marker: String,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
    /// One result per probe, in completion order
    pub results: Vec<ProbeResult>,
    /// Dispatch statistics
    pub stats: DispatchStats,
}

impl ScanReport {
    /// Results classified unsafe
    pub fn unsafe_results(&self) -> Vec<&ProbeResult> {
        self.results.iter().filter(|r| r.reflected).collect()
    }

    /// Results whose exchange failed
    pub fn failed_results(&self) -> Vec<&ProbeResult> {
        self.results.iter().filter(|r| r.is_error()).collect()
    }

    /// Check if any reflection was classified unsafe
    pub fn is_vulnerable(&self) -> bool {
        self.results.iter().any(|r| r.reflected)
    }

    /// Wall-clock duration of the run
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
