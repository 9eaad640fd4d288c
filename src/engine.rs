// src/engine.rs

//! Crawl engine: the fetch→extract→advance/terminate state machine.
//!
//! Each crawl instance runs as one tokio task that owns all mutable state;
//! a cloneable [`CrawlHandle`] feeds it commands. Because the task services
//! one command at a time and awaits the transport inline, at most one
//! request is ever in flight per instance.
//!
//! ```text
//! [constructed] --start()--> [running] --advance--> [awaiting-response]
//! [awaiting-response] --success, continuation--> [running] (deferred advance)
//! [awaiting-response] --success, no continuation--> [terminated]
//! [awaiting-response] --failure, retries remain--> [running] (paused, awaits
//!                                                  an external advance)
//! [awaiting-response] --failure, ceiling reached--> [terminated]
//! [any state] --terminate()--> [terminated]
//! ```
//!
//! A `blocked` signal is an invitation, not a retry: the engine never
//! re-issues a failed request on its own. Observers react (rotate egress,
//! wait out a ban) and call [`CrawlHandle::advance`] to resume.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::events::{ErrorDescriptor, EventBus, FinishPayload, LifecycleEvent};
use crate::extract::Extractor;
use crate::models::{CrawlConfig, CrawlCounts, CrawlParams, CrawlSeed};
use crate::template::AddressTemplate;
use crate::transport::{FetchOutcome, PageRequest, Transport};

/// Commands accepted by a running crawl task.
#[derive(Debug)]
enum Command {
    Advance,
    Terminate(FinishPayload),
}

/// Cloneable handle for driving a running crawl from outside.
#[derive(Debug, Clone)]
pub struct CrawlHandle {
    commands: UnboundedSender<Command>,
}

impl CrawlHandle {
    /// Request the next fetch. Ignored once the crawl has terminated.
    pub fn advance(&self) {
        let _ = self.commands.send(Command::Advance);
    }

    /// Stop the crawl with the given payload. Ignored once terminated.
    pub fn terminate(&self, payload: FinishPayload) {
        let _ = self.commands.send(Command::Terminate(payload));
    }
}

/// Paginated crawl engine bound to a transport and an extractor.
pub struct CrawlEngine<T, X> {
    config: CrawlConfig,
    template: AddressTemplate,
    transport: T,
    extractor: X,
    bus: EventBus,
    counts: CrawlCounts,
    alive: bool,
    pending: Option<JoinHandle<()>>,
}

impl<T, X> CrawlEngine<T, X>
where
    T: Transport + 'static,
    X: Extractor + 'static,
{
    /// Create an engine. Fails fast on an invalid configuration, before any
    /// crawling starts.
    pub fn new(
        config: CrawlConfig,
        template: AddressTemplate,
        transport: T,
        extractor: X,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            template,
            transport,
            extractor,
            bus: EventBus::default(),
            counts: CrawlCounts::default(),
            alive: false,
            pending: None,
        })
    }

    /// Register an observer. Subscribe before calling [`Self::start`] to see
    /// the full event sequence.
    pub fn subscribe(&mut self) -> UnboundedReceiver<LifecycleEvent> {
        self.bus.subscribe()
    }

    /// Resolve the seed over configured defaults and start crawling on a
    /// spawned task.
    pub fn start(mut self, seed: CrawlSeed) -> CrawlHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = CrawlHandle { commands: tx };
        let params = seed.resolve(&self.config.defaults);

        let task_handle = handle.clone();
        tokio::spawn(async move { self.run(params, rx, task_handle).await });

        handle
    }

    async fn run(
        mut self,
        mut params: CrawlParams,
        mut commands: UnboundedReceiver<Command>,
        handle: CrawlHandle,
    ) {
        self.alive = true;
        debug!("crawl starting at offset {}", params.offset);
        self.bus.emit(LifecycleEvent::Start {
            params: params.clone(),
            handle: handle.clone(),
        });

        self.advance(&mut params, &handle).await;

        while self.alive {
            match commands.recv().await {
                Some(Command::Advance) => self.advance(&mut params, &handle).await,
                Some(Command::Terminate(payload)) => self.terminate(payload),
                // Unreachable while this task holds `handle`.
                None => break,
            }
        }
    }

    /// One fetch cycle: render the address, emit `move`, await the
    /// transport, decide.
    async fn advance(&mut self, params: &mut CrawlParams, handle: &CrawlHandle) {
        // Guards against a stale timer racing a concurrent terminate.
        if !self.alive {
            return;
        }
        self.pending = None;

        let request = PageRequest {
            address: self.template.render(params),
            proxy: self.config.proxy.clone(),
            headers: self.config.headers.clone(),
        };
        debug!("moving to {}", request.address);
        self.bus.emit(LifecycleEvent::Move {
            request: request.clone(),
        });

        let outcome = self.transport.fetch(&request).await;
        self.on_result(outcome, params, handle);
    }

    /// Decision point, entered exactly once per transport completion.
    fn on_result(&mut self, outcome: FetchOutcome, params: &mut CrawlParams, handle: &CrawlHandle) {
        match outcome {
            Ok(response) if (200..400).contains(&response.status) => {
                let extraction = match self.extractor.extract(&response.body) {
                    Ok(extraction) => extraction,
                    // An extractor fault is a bug or misconfiguration, not a
                    // blocked crawl. Never retried.
                    Err(error) => {
                        self.terminate(FinishPayload::new(
                            500,
                            format!("extractor failed: {error}"),
                        ));
                        return;
                    }
                };

                self.counts.pages += 1;
                self.counts.items += extraction.items.len() as u64;
                let page = self.counts.pages;
                debug!("page {} yielded {} items", page, extraction.items.len());
                self.bus.emit(LifecycleEvent::Data {
                    items: extraction.items,
                    more: extraction.more,
                    page,
                });

                if extraction.more && !self.template.is_static() {
                    params.offset += params.window_size;
                    self.schedule_advance(handle);
                } else {
                    self.terminate(FinishPayload::finished(&self.counts));
                }
            }
            outcome => {
                let error = ErrorDescriptor::from_outcome(outcome);
                self.counts.retries += 1;

                if self.counts.retries < self.config.max_retries {
                    warn!(
                        "blocked at offset {} (retry {}): {} {}",
                        params.offset, self.counts.retries, error.code, error.message
                    );
                    self.bus.emit(LifecycleEvent::Blocked {
                        params: params.clone(),
                        error,
                        counts: self.counts,
                        handle: handle.clone(),
                    });
                } else {
                    self.terminate(FinishPayload::new(
                        error.code,
                        format!(
                            "max retries ({}) reached: {}",
                            self.config.max_retries, error.message
                        ),
                    ));
                }
            }
        }
    }

    /// Queue the next `advance` after the configured inter-page delay. The
    /// task handle is kept so terminate can cancel it.
    fn schedule_advance(&mut self, handle: &CrawlHandle) {
        let delay = Duration::from_millis(self.config.page_delay_ms);
        let handle = handle.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handle.advance();
        }));
    }

    /// Idempotent termination: cancels any deferred advance, flips `alive`,
    /// and emits `finish` exactly once.
    fn terminate(&mut self, payload: FinishPayload) {
        if !self.alive {
            return;
        }
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.alive = false;

        info!("{}: {}", payload.code, payload.message);
        self.bus.emit(LifecycleEvent::Finish {
            payload,
            counts: self.counts,
        });
    }
}
