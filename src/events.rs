// src/events.rs

//! Lifecycle event protocol and the fan-out channel behind it.
//!
//! The engine owns an [`EventBus`] and publishes one [`LifecycleEvent`] per
//! step. Sends are fire-and-forget: each subscriber gets an unbounded queue,
//! so a slow or absent observer never blocks the crawl, and a dropped
//! receiver simply unsubscribes itself.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::engine::CrawlHandle;
use crate::models::{CrawlCounts, CrawlParams};
use crate::transport::{FetchOutcome, PageRequest};

/// Normalized failure descriptor surfaced with `blocked` signals and failure
/// finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDescriptor {
    pub code: u16,
    pub message: String,
}

impl ErrorDescriptor {
    /// Collapse a failed fetch into `{code, message}`: the HTTP status for
    /// out-of-range responses, 500 for transport-level failures.
    pub(crate) fn from_outcome(outcome: FetchOutcome) -> Self {
        match outcome {
            Ok(response) => Self {
                code: response.status,
                message: format!("unexpected status {}", response.status),
            },
            Err(error) => Self {
                code: 500,
                message: error.message,
            },
        }
    }
}

/// Payload carried by the `finish` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinishPayload {
    pub code: u16,
    pub message: String,
}

impl Default for FinishPayload {
    fn default() -> Self {
        Self {
            code: 500,
            message: "stopping".into(),
        }
    }
}

impl FinishPayload {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Success payload summarizing the whole crawl.
    pub(crate) fn finished(counts: &CrawlCounts) -> Self {
        Self::new(
            200,
            format!(
                "crawl finished: {} pages, {} items, {} retries",
                counts.pages, counts.items, counts.retries
            ),
        )
    }
}

/// One lifecycle notification.
///
/// `Start` and `Blocked` carry a [`CrawlHandle`] clone so observers can drive
/// remediation (e.g. rotate egress, then call `advance`). `Blocked` and
/// `Finish` carry a snapshot of the counters.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// The crawl accepted its parameters and is about to fetch the first
    /// page.
    Start {
        params: CrawlParams,
        handle: CrawlHandle,
    },

    /// A request is about to go out.
    Move { request: PageRequest },

    /// A page was fetched and extracted. `page` is 1-based.
    Data {
        items: Vec<Value>,
        more: bool,
        page: u64,
    },

    /// A recoverable failure. The crawl is paused until an observer reacts.
    Blocked {
        params: CrawlParams,
        error: ErrorDescriptor,
        counts: CrawlCounts,
        handle: CrawlHandle,
    },

    /// Terminal notification, emitted exactly once per crawl.
    Finish {
        payload: FinishPayload,
        counts: CrawlCounts,
    },
}

/// Fan-out channel owned by the engine.
#[derive(Default)]
pub(crate) struct EventBus {
    subscribers: Vec<UnboundedSender<LifecycleEvent>>,
}

impl EventBus {
    pub fn subscribe(&mut self) -> UnboundedReceiver<LifecycleEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: LifecycleEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use crate::transport::{PageResponse, TransportError};

    use super::*;

    #[test]
    fn descriptor_uses_status_for_http_failures() {
        let descriptor = ErrorDescriptor::from_outcome(Ok(PageResponse {
            status: 403,
            body: String::new(),
        }));
        assert_eq!(descriptor.code, 403);
        assert!(descriptor.message.contains("403"));
    }

    #[test]
    fn descriptor_uses_500_for_transport_failures() {
        let descriptor =
            ErrorDescriptor::from_outcome(Err(TransportError::new("connection refused")));
        assert_eq!(descriptor.code, 500);
        assert_eq!(descriptor.message, "connection refused");
    }

    #[test]
    fn default_finish_payload_is_stopping() {
        let payload = FinishPayload::default();
        assert_eq!(payload.code, 500);
        assert_eq!(payload.message, "stopping");
    }

    #[test]
    fn bus_fans_out_to_every_subscriber() {
        let mut bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.emit(LifecycleEvent::Data {
            items: vec![],
            more: false,
            page: 1,
        });

        assert!(matches!(
            first.try_recv(),
            Ok(LifecycleEvent::Data { page: 1, .. })
        ));
        assert!(matches!(
            second.try_recv(),
            Ok(LifecycleEvent::Data { page: 1, .. })
        ));
    }

    #[test]
    fn bus_prunes_dropped_subscribers() {
        let mut bus = EventBus::default();
        let first = bus.subscribe();
        let mut second = bus.subscribe();
        drop(first);

        bus.emit(LifecycleEvent::Data {
            items: vec![],
            more: false,
            page: 1,
        });

        assert_eq!(bus.subscribers.len(), 1);
        assert!(second.try_recv().is_ok());
    }
}
