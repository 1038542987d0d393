// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Transport seam between the dispatcher and the network

use async_trait::async_trait;

use super::{Request, Response};
use crate::error::Result;

/// Sends one request and buffers the whole response
///
/// The dispatcher only ever talks to this trait, so a scan can run over the
/// real [`HttpClient`](super::HttpClient) or over any other implementation
/// (recording proxies, in-process fakes).
///
/// # Example
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use heijastus::error::Result;
/// use heijastus::http::{Request, Response, Transport};
///
/// struct Logged<T>(T);
///
/// #[async_trait]
/// impl<T: Transport> Transport for Logged<T> {
///     async fn send(&self, request: Request) -> Result<Response> {
///         println!("{} {}", request.method, request.url);
///         self.0.send(request).await
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the exchange
    async fn send(&self, request: Request) -> Result<Response>;
}

