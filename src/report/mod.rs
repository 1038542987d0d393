// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Report export
//!
//! Writes a [`ScanReport`] as a plain HTML listing or as JSON.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::error::{Error, ErrorContext, Result};
use crate::scan::ScanReport;

/// Export format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Html,
    Json,
}

impl ReportFormat {
    /// Pick a format from a file extension (`.json` or HTML otherwise)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ReportFormat::Json,
            _ => ReportFormat::Html,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            other => Err(Error::config(format!("Unknown report format: {}", other))),
        }
    }
}

/// Render the report as an HTML listing, one paragraph per result
///
/// Every interpolated value is entity-escaped, so reflected payloads stay inert.
pub fn render_html(report: &ScanReport) -> String {
    let mut out = String::with_capacity(256 + report.results.len() * 160);

    out.push_str("<html><head><meta charset=\"utf-8\"><title>XSS Report</title></head><body>");
    out.push_str("<h1>XSS Report</h1>");
    out.push_str(&format!(
        "<p>Target: {}</p><p>Marker: {}</p><p>Started: {} Finished: {}</p>",
        html_escape::encode_text(&report.target_url),
        html_escape::encode_text(&report.marker),
        report.started_at.to_rfc3339(),
        report.finished_at.to_rfc3339(),
    ));
    out.push_str(&format!(
        "<p>Probes: {} Unsafe: {} Errors: {}</p><hr>",
        report.results.len(),
        report.unsafe_results().len(),
        report.failed_results().len(),
    ));

    for result in &report.results {
        out.push_str("<p>");
        out.push_str(&html_escape::encode_text(&result.summary()));
        if !result.snippet.is_empty() {
            out.push_str("<br><code>");
            out.push_str(&html_escape::encode_text(&result.snippet));
            out.push_str("</code>");
        }
        out.push_str("</p>");
    }

    out.push_str("</body></html>");
    out
}

/// Render the report as pretty-printed JSON
pub fn render_json(report: &ScanReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write the report to `path`
pub fn export(report: &ScanReport, format: ReportFormat, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let contents = match format {
        ReportFormat::Html => render_html(report),
        ReportFormat::Json => render_json(report)?,
    };

    fs::write(path, contents).context(&format!("writing report to {}", path.display()))?;

    info!(path = %path.display(), format = %format, results = report.results.len(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::scan::{DispatchStats, Probe, ProbeResult};
    use crate::xss::{ContextTag, GuessedContext, Payload, ReasonCode};
    use chrono::Utc;

    fn report() -> ScanReport {
        let payload = Payload {
            text: "<script>/*m1*/alert(1)</script>".to_string(),
            context: Some(ContextTag::Text),
            marker: "m1".to_string(),
        };
        let reflected = ProbeResult {
            probe: Probe {
                id: 0,
                parameter: "q".to_string(),
                payload: payload.clone(),
            },
            reflected: true,
            status_code: Some(200),
            final_url: Some("http://localhost/?q=x".to_string()),
            snippet: "<p><script>/*m1*/alert(1)</script></p>".to_string(),
            reason: Some(ReasonCode::InTextNode),
            guessed_context: Some(GuessedContext::Js),
            error: None,
            response_time_ms: Some(3),
        };
        let failed = ProbeResult::from_transport_error(
            Probe {
                id: 1,
                parameter: "lang".to_string(),
                payload,
            },
            TransportError::Connect("refused".to_string()),
        );

        ScanReport {
            target_url: "http://localhost/?a=1&b=2".to_string(),
            marker: "m1".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            results: vec![reflected, failed],
            stats: DispatchStats::default(),
        }
    }

    #[test]
    fn test_render_html_escapes() {
        let html = render_html(&report());

        assert!(html.starts_with("<html>"));
        assert!(html.contains("<h1>XSS Report</h1>"));
        assert!(html.contains("http://localhost/?a=1&amp;b=2"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Probes: 2 Unsafe: 1 Errors: 1"));
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["marker"], "m1");
        assert_eq!(value["results"][0]["reason"], "in-text-node");
        assert_eq!(value["results"][1]["error"]["kind"], "connect");
    }

    #[test]
    fn test_format_selection() {
        assert_eq!(ReportFormat::from_path(Path::new("out.JSON")), ReportFormat::Json);
        assert_eq!(ReportFormat::from_path(Path::new("out.html")), ReportFormat::Html);
        assert_eq!(ReportFormat::from_path(Path::new("out")), ReportFormat::Html);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("pdf".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        export(&report(), ReportFormat::Json, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"target_url\""));
    }

    #[test]
    fn test_export_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.html");

        assert!(export(&report(), ReportFormat::Html, &path).is_err());
    }
}
