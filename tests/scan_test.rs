// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! End-to-end scan tests against mock HTTP targets

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use heijastus::http::DEFAULT_USER_AGENT;
use heijastus::{
    ContextTag, HttpClient, HttpMethod, ReasonCode, ReportFormat, ScanCoordinator,
    ScanRequestConfig, TransportError,
};
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, Request as MockRequest, ResponseTemplate,
};

/// Page that echoes each value raw into its own paragraph
fn echo_page(values: impl IntoIterator<Item = String>) -> ResponseTemplate {
    let mut body = String::from("<html><body>");
    for value in values {
        body.push_str(&format!("<p>{}</p>", value));
    }
    body.push_str("</body></html>");
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn query_values(req: &MockRequest) -> Vec<String> {
    req.url
        .query_pairs()
        .map(|(_, value)| value.into_owned())
        .collect()
}

fn form_values(req: &MockRequest) -> Vec<String> {
    url::form_urlencoded::parse(&req.body)
        .map(|(_, value)| value.into_owned())
        .collect()
}

fn json_values(req: &MockRequest) -> Vec<String> {
    let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap_or_default();
    body.as_object()
        .map(|map| {
            map.values()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn coordinator() -> ScanCoordinator {
    ScanCoordinator::new().unwrap().seed(1234)
}

#[tokio::test]
async fn test_echo_endpoint_every_probe_unsafe() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(|req: &MockRequest| echo_page(query_values(req)))
        .mount(&mock_server)
        .await;

    let config = ScanRequestConfig::builder(format!("{}/search", mock_server.uri()))
        .param("q", "test")
        .param("lang", "en")
        .build()
        .unwrap();

    let report = coordinator().run(&config).await;

    assert_eq!(report.results.len(), 18);
    assert_eq!(report.results.len(), config.probe_count());

    let ids: HashSet<usize> = report.results.iter().map(|r| r.probe.id).collect();
    assert_eq!(ids.len(), 18);

    for result in &report.results {
        assert!(result.reflected, "{}", result.summary());
        assert_eq!(result.reason, Some(ReasonCode::InTextNode));
        assert_eq!(result.status_code, Some(200));
        assert!(result.probe.payload.text.contains(&report.marker));
        assert!(!result.snippet.is_empty());
    }

    assert_eq!(report.stats.responses, 18);
    assert_eq!(report.stats.transport_errors, 0);
    assert!(report.stats.peak_in_flight <= config.concurrency() as u64);
}

#[tokio::test]
async fn test_existing_query_preserved() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(query_param("keep", "1"))
        .respond_with(|req: &MockRequest| echo_page(query_values(req)))
        .mount(&mock_server)
        .await;

    let config = ScanRequestConfig::builder(format!("{}/page?keep=1", mock_server.uri()))
        .param("q", "x")
        .build()
        .unwrap();

    let report = coordinator().run(&config).await;

    assert_eq!(report.results.len(), 9);
    assert!(report.results.iter().all(|r| r.reflected));
}

#[tokio::test]
async fn test_inherited_query_params_probed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(|req: &MockRequest| echo_page(query_values(req)))
        .mount(&mock_server)
        .await;

    let config = ScanRequestConfig::builder(format!("{}/page?id=7&sort=asc", mock_server.uri()))
        .inherit_query_params()
        .contexts(&[ContextTag::Text])
        .build()
        .unwrap();

    let report = coordinator().run(&config).await;

    assert_eq!(report.results.len(), 6);
    let probed: HashSet<&str> = report
        .results
        .iter()
        .map(|r| r.probe.parameter.as_str())
        .collect();
    assert_eq!(probed, HashSet::from(["id", "sort"]));
    assert!(report.is_vulnerable());
}

#[tokio::test]
async fn test_post_form_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/comment"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(|req: &MockRequest| echo_page(form_values(req)))
        .mount(&mock_server)
        .await;

    let config = ScanRequestConfig::builder(format!("{}/comment", mock_server.uri()))
        .method(HttpMethod::Post)
        .params_from_query("name=bob&body=hello")
        .contexts(&[ContextTag::AttrValue, ContextTag::Js])
        .build()
        .unwrap();

    let report = coordinator().run(&config).await;

    assert_eq!(report.results.len(), 10);
    for result in &report.results {
        assert!(result.reflected, "{}", result.summary());
        assert_eq!(result.reason, Some(ReasonCode::InTextNode));
    }
}

#[tokio::test]
async fn test_post_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .and(header("content-type", "application/json"))
        .respond_with(|req: &MockRequest| echo_page(json_values(req)))
        .mount(&mock_server)
        .await;

    let config = ScanRequestConfig::builder(format!("{}/api", mock_server.uri()))
        .method(HttpMethod::Post)
        .json_body(true)
        .param("q", "1")
        .build()
        .unwrap();

    let report = coordinator().run(&config).await;

    assert_eq!(report.results.len(), 9);
    assert!(report.results.iter().all(|r| r.reflected));
}

#[tokio::test]
async fn test_headers_cookies_and_user_agent_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth"))
        .and(header("x-token", "abc"))
        .and(header("cookie", "sid=s1; theme=dark"))
        .and(header("user-agent", DEFAULT_USER_AGENT))
        .respond_with(|req: &MockRequest| echo_page(query_values(req)))
        .mount(&mock_server)
        .await;

    let config = ScanRequestConfig::builder(format!("{}/auth", mock_server.uri()))
        .param("q", "1")
        .headers_block(r#"{"X-Token": "abc"}"#)
        .unwrap()
        .cookies_block("sid: s1\ntheme: dark")
        .unwrap()
        .contexts(&[ContextTag::Text])
        .build()
        .unwrap();

    let report = coordinator().run(&config).await;

    assert_eq!(report.results.len(), 3);
    assert!(report.results.iter().all(|r| r.reflected));
}

#[tokio::test]
async fn test_escaping_endpoint_safe() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/safe"))
        .respond_with(|req: &MockRequest| {
            echo_page(
                query_values(req)
                    .iter()
                    .map(|v| html_escape::encode_quoted_attribute(v).into_owned()),
            )
        })
        .mount(&mock_server)
        .await;

    let config = ScanRequestConfig::builder(format!("{}/safe", mock_server.uri()))
        .param("q", "1")
        .build()
        .unwrap();

    let report = coordinator().run(&config).await;

    assert_eq!(report.results.len(), 9);
    for result in &report.results {
        let text = &result.probe.payload.text;
        if text.contains(['&', '<', '>', '"', '\'']) {
            assert!(!result.reflected, "{}", result.summary());
            assert_eq!(result.reason, Some(ReasonCode::EscapedInHtml));
        } else {
            assert_eq!(result.reason, Some(ReasonCode::InTextNode));
        }
    }
}

#[tokio::test]
async fn test_json_api_endpoint_classification() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(|req: &MockRequest| {
            let value = query_values(req).into_iter().next().unwrap_or_default();
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "query": value }))
        })
        .mount(&mock_server)
        .await;

    let config = ScanRequestConfig::builder(format!("{}/api/search", mock_server.uri()))
        .param("q", "1")
        .build()
        .unwrap();

    let report = coordinator().run(&config).await;

    assert_eq!(report.results.len(), 9);

    for result in &report.results {
        let text = &result.probe.payload.text;
        if !text.contains('"') {
            // Stored verbatim as a JSON string value
            assert_eq!(result.reason, Some(ReasonCode::JsonSafeReflection), "{}", text);
            assert!(!result.reflected, "{}", text);
        } else if text.starts_with("\";alert(8)") {
            // `\"` escaping leaves the payload intact right after the backslash
            assert_eq!(result.reason, Some(ReasonCode::PlainBodyReflection), "{}", text);
            assert!(result.reflected, "{}", text);
        } else {
            // Escaping splits the raw form
            assert_eq!(result.reason, Some(ReasonCode::NotPresent), "{}", text);
            assert!(!result.reflected, "{}", text);
        }
    }

    assert!(report.is_vulnerable());
    assert_eq!(report.unsafe_results().len(), 1);
}

#[tokio::test]
async fn test_unreachable_target_one_error_per_probe() {
    let config = ScanRequestConfig::builder("http://127.0.0.1:1/")
        .param("a", "1")
        .param("b", "2")
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let report = coordinator()
        .collection_grace(Duration::from_millis(500))
        .run(&config)
        .await;

    assert_eq!(report.results.len(), 18);
    assert_eq!(report.failed_results().len(), 18);
    assert!(!report.is_vulnerable());
    for result in &report.results {
        assert!(result.status_code.is_none());
        assert!(result.reason.is_none());
    }
}

#[tokio::test]
async fn test_slow_target_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let config = ScanRequestConfig::builder(mock_server.uri())
        .param("q", "1")
        .contexts(&[ContextTag::Js])
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let report = coordinator()
        .collection_grace(Duration::from_millis(100))
        .run(&config)
        .await;

    assert_eq!(report.results.len(), 3);
    for result in &report.results {
        assert!(
            matches!(result.error, Some(TransportError::Timeout { .. })),
            "{}",
            result.summary()
        );
    }
    assert_eq!(report.stats.timeouts, 3);
}

#[tokio::test]
async fn test_custom_transport_shared_across_runs() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(|req: &MockRequest| echo_page(query_values(req)))
        .expect(6)
        .mount(&mock_server)
        .await;

    let coordinator = ScanCoordinator::with_transport(Arc::new(HttpClient::new().unwrap()));
    let config = ScanRequestConfig::builder(mock_server.uri())
        .param("q", "1")
        .contexts(&[ContextTag::AttrName])
        .build()
        .unwrap();

    let first = coordinator.run(&config).await;
    let second = coordinator.run(&config).await;

    assert_eq!(first.results.len(), 3);
    assert_eq!(second.results.len(), 3);
    assert_ne!(first.marker, second.marker);
}

#[tokio::test]
async fn test_report_export_after_scan() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(|req: &MockRequest| echo_page(query_values(req)))
        .mount(&mock_server)
        .await;

    let config = ScanRequestConfig::builder(mock_server.uri())
        .param("q", "1")
        .build()
        .unwrap();
    let report = coordinator().run(&config).await;

    let dir = tempfile::tempdir().unwrap();
    let html_path = dir.path().join("report.html");
    let json_path = dir.path().join("report.json");

    heijastus::export(&report, ReportFormat::Html, &html_path).unwrap();
    heijastus::export(&report, ReportFormat::from_path(&json_path), &json_path).unwrap();

    let html = std::fs::read_to_string(&html_path).unwrap();
    assert_eq!(html.matches("[UNSAFE]").count(), 9);
    assert!(!html.contains("<script>"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 9);
    assert_eq!(json["marker"], report.marker.as_str());
}
