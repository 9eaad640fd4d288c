// src/transport.rs

//! Transport capability: one HTTP request per call.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::error::Result;
use crate::models::CrawlConfig;

/// Request descriptor handed to the transport, also surfaced in `move`
/// events.
#[derive(Debug, Clone, Serialize)]
pub struct PageRequest {
    pub address: String,
    pub proxy: Option<String>,
    pub headers: BTreeMap<String, String>,
}

/// Response delivered by the transport. The status is reported as-is; the
/// engine decides what counts as success.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

/// Transport-level failure (DNS, connect, timeout, TLS, ...).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of one fetch.
pub type FetchOutcome = std::result::Result<PageResponse, TransportError>;

/// Performs one request for the engine.
///
/// Must deliver exactly one outcome per call. Per-call timeouts are the
/// transport's responsibility; the engine only bounds retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> FetchOutcome;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client from the crawl configuration.
    ///
    /// The proxy is applied at client construction; the `proxy` field on
    /// each [`PageRequest`] is carried for observers.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &PageRequest) -> FetchOutcome {
        let mut call = self.client.get(&request.address);
        for (name, value) in &request.headers {
            call = call.header(name, value);
        }

        let response = call
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        Ok(PageResponse { status, body })
    }
}
