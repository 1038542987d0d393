// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Scan request configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::{Error, Result};
use crate::http::headers;
use crate::xss::{ContextTag, PayloadCatalog, DEFAULT_MARKER_LENGTH};

/// Upper bound on in-flight probes
pub const MAX_CONCURRENCY: usize = 10;

/// Default number of in-flight probes
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

const MIN_MARKER_LENGTH: usize = 4;
const MAX_MARKER_LENGTH: usize = 32;

/// Probe request method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }

    pub(crate) fn to_method(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(Error::config(format!(
                "Unsupported method: {} (expected GET or POST)",
                other
            ))),
        }
    }
}

/// POST body encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    /// application/x-www-form-urlencoded
    #[default]
    Form,
    /// application/json object of string values
    Json,
}

/// Validated, immutable description of one scan
///
/// Built through [`ScanConfigBuilder`]; shared read-only by every probe of
/// the run.
#[derive(Debug, Clone)]
pub struct ScanRequestConfig {
    target_url: Url,
    method: HttpMethod,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    contexts: Vec<ContextTag>,
    concurrency: usize,
    timeout: Duration,
    body_encoding: BodyEncoding,
    marker_length: usize,
    user_agent: Option<String>,
}

impl ScanRequestConfig {
    /// Start building a config for `target_url`
    pub fn builder(target_url: impl Into<String>) -> ScanConfigBuilder {
        ScanConfigBuilder::new(target_url)
    }

    pub fn target_url(&self) -> &Url {
        &self.target_url
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Base parameter set, unique keys in insertion order
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// Selected payload tags, canonical order
    pub fn contexts(&self) -> &[ContextTag] {
        &self.contexts
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn body_encoding(&self) -> BodyEncoding {
        self.body_encoding
    }

    pub fn marker_length(&self) -> usize {
        self.marker_length
    }

    /// User agent for probes that carry no `User-Agent` header
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Payload catalog for this config
    pub fn catalog(&self) -> PayloadCatalog {
        PayloadCatalog::new(&self.contexts).marker_length(self.marker_length)
    }

    /// Number of probes one run submits
    pub fn probe_count(&self) -> usize {
        self.params.len() * self.catalog().len()
    }

    /// Cookies joined into a single `Cookie` header value
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Builder for [`ScanRequestConfig`]
#[derive(Debug, Clone)]
pub struct ScanConfigBuilder {
    target_url: String,
    method: HttpMethod,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    contexts: Vec<ContextTag>,
    concurrency: usize,
    timeout: Duration,
    body_encoding: BodyEncoding,
    marker_length: usize,
    user_agent: Option<String>,
    inherit_query: bool,
}

impl ScanConfigBuilder {
    fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            method: HttpMethod::default(),
            params: Vec::new(),
            headers: Vec::new(),
            cookies: Vec::new(),
            contexts: ContextTag::ALL.to_vec(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            body_encoding: BodyEncoding::default(),
            marker_length: DEFAULT_MARKER_LENGTH,
            user_agent: None,
            inherit_query: false,
        }
    }

    /// Set request method
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Add or overwrite a base parameter; an overwrite keeps the original position
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.params, name.into(), value.into());
        self
    }

    /// Add base parameters from an `a=1&b=2` string
    ///
    /// Pairs are percent-decoded. A segment without `=` becomes a blank
    /// value; segments with an empty name are ignored.
    pub fn params_from_query(mut self, query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let name = name.trim();
            if !name.is_empty() {
                upsert(&mut self.params, name.to_string(), value.into_owned());
            }
        }
        self
    }

    /// Seed base parameters from the target URL's own query string
    ///
    /// Explicit parameters win over inherited ones.
    pub fn inherit_query_params(mut self) -> Self {
        self.inherit_query = true;
        self
    }

    /// Add a request header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add headers from a JSON object or `Name: value` lines
    pub fn headers_block(mut self, block: &str) -> Result<Self> {
        self.headers.extend(parse_kv_block(block)?);
        Ok(self)
    }

    /// Add a cookie
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.cookies, name.into(), value.into());
        self
    }

    /// Add cookies from a JSON object or `name: value` lines
    pub fn cookies_block(mut self, block: &str) -> Result<Self> {
        for (name, value) in parse_kv_block(block)? {
            upsert(&mut self.cookies, name, value);
        }
        Ok(self)
    }

    /// Restrict payloads to the given tags (all tags when empty)
    pub fn contexts(mut self, contexts: &[ContextTag]) -> Self {
        self.contexts = contexts.to_vec();
        self
    }

    /// Set the number of in-flight probes (clamped to `1..=MAX_CONCURRENCY`)
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send POST bodies as JSON instead of a form
    pub fn json_body(mut self, json: bool) -> Self {
        self.body_encoding = if json {
            BodyEncoding::Json
        } else {
            BodyEncoding::Form
        };
        self
    }

    /// Set marker length
    pub fn marker_length(mut self, length: usize) -> Self {
        self.marker_length = length;
        self
    }

    /// Set user agent; an explicit `User-Agent` header still wins
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Validate and build the config
    pub fn build(self) -> Result<ScanRequestConfig> {
        let target_url = Url::parse(self.target_url.trim())?;
        if !matches!(target_url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Unsupported URL scheme: {} (expected http or https)",
                target_url.scheme()
            )));
        }
        if target_url.host_str().is_none() {
            return Err(Error::config(format!("URL has no host: {}", target_url)));
        }

        let params = if self.inherit_query {
            let mut merged: Vec<(String, String)> = Vec::new();
            for (name, value) in target_url.query_pairs() {
                if !name.is_empty() {
                    upsert(&mut merged, name.into_owned(), value.into_owned());
                }
            }
            for (name, value) in self.params {
                upsert(&mut merged, name, value);
            }
            merged
        } else {
            self.params
        };

        for (name, value) in &self.headers {
            validate_header(name, value)?;
        }

        for (name, value) in &self.cookies {
            if name.is_empty()
                || name
                    .chars()
                    .any(|c| c.is_whitespace() || matches!(c, '=' | ';' | ','))
            {
                return Err(Error::invalid_header(
                    headers::COOKIE,
                    format!("invalid cookie name: {:?}", name),
                ));
            }
            if value.contains(';') {
                return Err(Error::invalid_header(
                    headers::COOKIE,
                    format!("cookie {} value contains ';'", name),
                ));
            }
            validate_header(headers::COOKIE, &format!("{}={}", name, value))?;
        }

        if let Some(ref user_agent) = self.user_agent {
            validate_header(headers::USER_AGENT, user_agent)?;
        }

        if self.timeout.is_zero() {
            return Err(Error::config("Timeout must be greater than zero"));
        }

        if !(MIN_MARKER_LENGTH..=MAX_MARKER_LENGTH).contains(&self.marker_length) {
            return Err(Error::config(format!(
                "Marker length {} out of range {}..={}",
                self.marker_length, MIN_MARKER_LENGTH, MAX_MARKER_LENGTH
            )));
        }

        let concurrency = self.concurrency.clamp(1, MAX_CONCURRENCY);
        if concurrency != self.concurrency {
            warn!(
                requested = self.concurrency,
                effective = concurrency,
                "concurrency clamped"
            );
        }

        let contexts = PayloadCatalog::new(&self.contexts).contexts().to_vec();

        Ok(ScanRequestConfig {
            target_url,
            method: self.method,
            params,
            headers: self.headers,
            cookies: self.cookies,
            contexts,
            concurrency,
            timeout: self.timeout,
            body_encoding: self.body_encoding,
            marker_length: self.marker_length,
            user_agent: self.user_agent,
        })
    }
}

/// Parse a key/value text block
///
/// Accepts a JSON object (non-string values are kept as their JSON text) or
/// `key: value` lines, split at the first colon. Lines without a colon are
/// skipped. A blank block yields no pairs.
pub fn parse_kv_block(block: &str) -> Result<Vec<(String, String)>> {
    let block = block.trim();
    if block.is_empty() {
        return Ok(Vec::new());
    }

    if block.starts_with('{') {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(block) {
            return Ok(map
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect());
        }
    }

    let pairs: Vec<(String, String)> = block
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect();

    if pairs.is_empty() {
        return Err(Error::config(
            "Unparsable key/value block: expected a JSON object or 'key: value' lines",
        ));
    }

    Ok(pairs)
}

fn upsert(pairs: &mut Vec<(String, String)>, name: String, value: String) {
    match pairs.iter_mut().find(|(existing, _)| *existing == name) {
        Some(slot) => slot.1 = value,
        None => pairs.push((name, value)),
    }
}

fn validate_header(name: &str, value: &str) -> Result<()> {
    HeaderName::try_from(name).map_err(|e| Error::invalid_header(name, e.to_string()))?;
    HeaderValue::try_from(value).map_err(|e| Error::invalid_header(name, e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanRequestConfig::builder("https://example.com/search")
            .param("q", "test")
            .build()
            .unwrap();

        assert_eq!(config.method(), HttpMethod::Get);
        assert_eq!(config.concurrency(), DEFAULT_CONCURRENCY);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.contexts(), &ContextTag::ALL);
        assert_eq!(config.body_encoding(), BodyEncoding::Form);
        assert_eq!(config.marker_length(), DEFAULT_MARKER_LENGTH);
        assert_eq!(config.probe_count(), 9);
        assert!(config.cookie_header().is_none());
        assert!(config.user_agent().is_none());
    }

    #[test]
    fn test_user_agent_validated() {
        let config = ScanRequestConfig::builder("http://localhost/")
            .user_agent("probe/2.0")
            .build()
            .unwrap();
        assert_eq!(config.user_agent(), Some("probe/2.0"));

        assert!(ScanRequestConfig::builder("http://localhost/")
            .user_agent("bad\r\nagent")
            .build()
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!(" POST ".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert!("PUT".parse::<HttpMethod>().unwrap_err().is_config());
        assert_eq!(HttpMethod::Post.to_string(), "POST");
    }

    #[test]
    fn test_concurrency_clamped() {
        let high = ScanRequestConfig::builder("http://localhost/")
            .concurrency(50)
            .build()
            .unwrap();
        assert_eq!(high.concurrency(), MAX_CONCURRENCY);

        let zero = ScanRequestConfig::builder("http://localhost/")
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(zero.concurrency(), 1);
    }

    #[test]
    fn test_param_overwrite_keeps_position() {
        let config = ScanRequestConfig::builder("http://localhost/")
            .param("a", "1")
            .param("b", "2")
            .params_from_query("a=9&c=x%20y&flag&=skip")
            .build()
            .unwrap();

        let params: Vec<(&str, &str)> = config
            .params()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            params,
            vec![("a", "9"), ("b", "2"), ("c", "x y"), ("flag", "")]
        );
    }

    #[test]
    fn test_inherit_query_params() {
        let config = ScanRequestConfig::builder("https://example.com/?page=2&q=old")
            .param("q", "new")
            .inherit_query_params()
            .build()
            .unwrap();

        assert_eq!(
            config.params(),
            &[
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "new".to_string())
            ]
        );
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(ScanRequestConfig::builder("not a url").build().is_err());

        let err = ScanRequestConfig::builder("ftp://example.com/")
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_rejects_bad_header() {
        let err = ScanRequestConfig::builder("http://localhost/")
            .header("X Bad", "1")
            .build()
            .unwrap_err();
        assert!(err.is_config());

        let err = ScanRequestConfig::builder("http://localhost/")
            .header("X-Ok", "line\nbreak")
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_rejects_bad_cookie() {
        let err = ScanRequestConfig::builder("http://localhost/")
            .cookie("a b", "1")
            .build()
            .unwrap_err();
        assert!(err.is_config());

        let err = ScanRequestConfig::builder("http://localhost/")
            .cookie("sid", "x;y")
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_rejects_zero_timeout_and_bad_marker() {
        assert!(ScanRequestConfig::builder("http://localhost/")
            .timeout(Duration::ZERO)
            .build()
            .unwrap_err()
            .is_config());
        assert!(ScanRequestConfig::builder("http://localhost/")
            .marker_length(2)
            .build()
            .unwrap_err()
            .is_config());
        assert!(ScanRequestConfig::builder("http://localhost/")
            .marker_length(64)
            .build()
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn test_contexts_normalized() {
        let config = ScanRequestConfig::builder("http://localhost/")
            .param("q", "1")
            .contexts(&[ContextTag::Js, ContextTag::AttrName, ContextTag::Js])
            .build()
            .unwrap();

        assert_eq!(config.contexts(), &[ContextTag::AttrName, ContextTag::Js]);
        assert_eq!(config.probe_count(), 5);
    }

    #[test]
    fn test_cookie_header() {
        let config = ScanRequestConfig::builder("http://localhost/")
            .cookies_block("sid: abc\ntheme: dark")
            .unwrap()
            .cookie("sid", "def")
            .build()
            .unwrap();

        assert_eq!(config.cookie_header().as_deref(), Some("sid=def; theme=dark"));
    }

    #[test]
    fn test_parse_kv_block_json() {
        let pairs = parse_kv_block(r#"{"X-Token": "abc", "X-Num": 5}"#).unwrap();
        assert!(pairs.contains(&("X-Token".to_string(), "abc".to_string())));
        assert!(pairs.contains(&("X-Num".to_string(), "5".to_string())));
    }

    #[test]
    fn test_parse_kv_block_lines() {
        let pairs = parse_kv_block("Authorization: Bearer a:b\n\n  X-Test :  1  \nnoise").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("Authorization".to_string(), "Bearer a:b".to_string()),
                ("X-Test".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_kv_block_errors() {
        assert!(parse_kv_block("   ").unwrap().is_empty());
        assert!(parse_kv_block("just noise").unwrap_err().is_config());
        assert!(parse_kv_block("[1, 2]").unwrap_err().is_config());
    }
}
