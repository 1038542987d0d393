// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Heijastus - Reflected XSS Probe Engine
//!
//! Sends context-tagged XSS payloads through every parameter of a single
//! HTTP endpoint and classifies, from the raw response body alone, whether
//! each payload came back in an unsafe position.
//!
//! ## Features
//!
//! - Payload catalog: text, attribute-value, attribute-name and JS payloads
//!   sharing one random marker per run
//! - Static reflection classifier: JSON-safe, escaped, attribute-name,
//!   unquoted-attribute, script-block and text-node rules
//! - Bounded concurrent dispatch: every probe yields exactly one result,
//!   transport failures included
//! - GET query merging and POST form/JSON bodies, custom headers and cookies
//! - HTML and JSON report export
//!
//! ## Example
//!
//! ```rust,no_run
//! use heijastus::{ScanCoordinator, ScanRequestConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanRequestConfig::builder("https://example.com/search")
//!         .param("q", "test")
//!         .param("lang", "en")
//!         .build()?;
//!
//!     let report = ScanCoordinator::new()?.run(&config).await;
//!
//!     for result in report.unsafe_results() {
//!         println!("{}", result.summary());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod http;
pub mod report;
pub mod scan;
pub mod xss;

// Re-exports for convenience

// Errors
pub use error::{Error, ErrorContext, Result, TransportError};

// HTTP
pub use http::{HttpClient, HttpClientConfig, Request, Response, Transport};

// Payloads and classification
pub use xss::{classify, guess_context, Classification, ContextTag, GuessedContext, ReasonCode};
pub use xss::{Payload, PayloadCatalog};

// Scanning
pub use scan::{BodyEncoding, HttpMethod, ScanConfigBuilder, ScanRequestConfig};
pub use scan::{DispatchStats, ProbeOutcome, RequestDispatcher};
pub use scan::{scan, Probe, ProbeResult, ScanCoordinator, ScanReport};

// Reports
pub use report::{export, render_html, render_json, ReportFormat};

/// Heijastus version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
