//! Polling log stream
//!
//! Each poll fetches one page of logs (newest first), emits the entries not
//! seen in the previous page oldest first, then replaces the seen-set with
//! this page's sids. Memory stays bounded by one page however long the tail
//! runs.

use std::collections::{HashSet, VecDeque};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream, Stream, StreamExt};
use tokio::sync::watch;
use tokio::time::sleep;

use crate::api::{LogQuery, LogRecord, ServerlessApi, Sid};
use crate::error::{ApiError, DeployError, Result};

use super::types::LogTailConfig;

/// Cancels a `LogStream` from anywhere
#[derive(Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Nothing fetched yet
    Idle,
    /// Tail mode, next poll after the interval
    Waiting,
    /// Interval elapsed, fetch now
    Polling,
    /// One-shot done, cancelled or errored
    Closed,
}

struct TailState {
    api: Arc<dyn ServerlessApi>,
    config: LogTailConfig,
    window: HashSet<Sid>,
    pending: VecDeque<LogRecord>,
    phase: Phase,
    cancelled: watch::Receiver<bool>,
}

impl TailState {
    fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Queue unseen records oldest first and swap in this page's window
    fn absorb(&mut self, page: Vec<LogRecord>) {
        let window: HashSet<Sid> = page.iter().map(|record| record.sid.clone()).collect();
        let fresh = page
            .into_iter()
            .rev()
            .filter(|record| !self.window.contains(&record.sid));
        self.pending.extend(fresh);
        self.window = window;
    }

    async fn next_item(mut self) -> Option<(Result<String>, Self)> {
        loop {
            if self.is_cancelled() {
                self.phase = Phase::Closed;
                self.pending.clear();
                return None;
            }

            if let Some(record) = self.pending.pop_front() {
                let item = serde_json::to_string(&record).map_err(|e| DeployError::Stream {
                    source: ApiError::Decode(e.to_string()),
                });
                return Some((item, self));
            }

            match self.phase {
                Phase::Closed => return None,
                Phase::Idle => {}
                Phase::Waiting => {
                    tokio::select! {
                        _ = sleep(self.config.poll_interval) => {}
                        changed = self.cancelled.changed() => {
                            if changed.is_err() || *self.cancelled.borrow() {
                                self.phase = Phase::Closed;
                                return None;
                            }
                        }
                    }
                    if self.is_cancelled() {
                        self.phase = Phase::Closed;
                        return None;
                    }
                    self.phase = Phase::Polling;
                }
                Phase::Polling => {}
            }

            let query = LogQuery {
                page_size: self.config.page_size,
                function_sid: self.config.function_sid.clone(),
            };
            let page = self
                .api
                .list_log_page(&self.config.service_sid, &self.config.environment_sid, &query)
                .await;

            // A poll that was in flight when the stream got cancelled is dropped
            if self.is_cancelled() {
                self.phase = Phase::Closed;
                return None;
            }

            match page {
                Ok(records) => {
                    tracing::debug!(
                        fetched = records.len(),
                        window = self.window.len(),
                        "Polled logs"
                    );
                    self.absorb(records);
                    self.phase = if self.config.tail {
                        Phase::Waiting
                    } else {
                        Phase::Closed
                    };
                }
                Err(e) => {
                    tracing::error!("Log poll failed: {:?}", e);
                    self.phase = Phase::Closed;
                    self.pending.clear();
                    return Some((Err(DeployError::Stream { source: e }), self));
                }
            }
        }
    }
}

/// Lazy, cancellable stream of serialized log records
///
/// Nothing is fetched until the stream is first polled. In one-shot mode the
/// stream ends after a single page; in tail mode it polls every
/// `poll_interval` until cancelled. A failed poll yields one error and ends
/// the stream.
pub struct LogStream {
    inner: BoxStream<'static, Result<String>>,
    cancel: CancelHandle,
}

impl LogStream {
    pub fn new(api: Arc<dyn ServerlessApi>, config: LogTailConfig) -> Self {
        let (sender, receiver) = watch::channel(false);
        let state = TailState {
            api,
            config,
            window: HashSet::new(),
            pending: VecDeque::new(),
            phase: Phase::Idle,
            cancelled: receiver,
        };

        Self {
            inner: stream::unfold(state, TailState::next_item).fuse().boxed(),
            cancel: CancelHandle {
                sender: Arc::new(sender),
            },
        }
    }

    /// Stop the stream; pending polls are abandoned
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl Stream for LogStream {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}
