// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP layer for Heijastus
//!
//! Thin wrapper over reqwest: probe requests are built as [`Request`]
//! values, sent through a [`Transport`], and come back as fully buffered
//! [`Response`] values ready for classification.

mod client;
mod request;
mod response;
mod transport;

pub use client::{HttpClient, HttpClientConfig};
pub use request::Request;
pub use response::Response;
pub use transport::Transport;

/// Default user agent string, sent when the scan config supplies none
pub const DEFAULT_USER_AGENT: &str =
    concat!("Heijastus/", env!("CARGO_PKG_VERSION"), " (reflected-xss-probe)");

/// Common HTTP headers
pub mod headers {
    pub const CONTENT_TYPE: &str = "content-type";
    pub const COOKIE: &str = "cookie";
    pub const USER_AGENT: &str = "user-agent";
}
