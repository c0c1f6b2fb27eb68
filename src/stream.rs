//! Long-lived streaming session.
//!
//! ```text
//! Connecting → Connected ⇄ chunk → buffer → classify → emit/skip
//!                  │
//!                  └→ Closed (transport error, server close or
//!                             disconnect notice, read timeout, cancel)
//! ```

use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::{Result, WarblerError};
use crate::cache::ImageCache;
use crate::fetcher::{ApiRequest, Transport};
use crate::normalizer::{classify, StreamBuffer, StreamMessage};
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Connected,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    Cancelled,
    /// The server ended the response body.
    ServerClosed,
    /// The server sent a `disconnect` notice, with its reason if given.
    ServerDisconnect(Option<String>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub statuses: usize,
    pub informational: usize,
    pub unknown: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub reason: CloseReason,
    pub stats: StreamStats,
}

pub struct StreamSession<'a> {
    transport: &'a dyn Transport,
    images: Option<&'a ImageCache>,
    read_timeout: Duration,
    state: StreamState,
    buffer: StreamBuffer,
    stats: StreamStats,
}

impl<'a> StreamSession<'a> {
    pub fn new(transport: &'a dyn Transport, read_timeout: Duration) -> Self {
        Self {
            transport,
            images: None,
            read_timeout,
            state: StreamState::Connecting,
            buffer: StreamBuffer::new(),
            stats: StreamStats::default(),
        }
    }

    /// Resolve avatars through `images` before each status is shown.
    pub fn with_images(mut self, images: &'a ImageCache) -> Self {
        self.images = Some(images);
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Run until the connection ends. Cancellation is observed while
    /// connecting and between chunk reads; waiting longer than the read
    /// timeout for the response head or for the next chunk closes the
    /// session with [`WarblerError::Timeout`].
    pub async fn run(
        &mut self,
        request: &ApiRequest,
        notifier: &dyn Notifier,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome> {
        self.state = StreamState::Connecting;
        let transport = self.transport;

        let opened = tokio::select! {
            _ = cancel.cancelled() => return Ok(self.close(CloseReason::Cancelled)),
            opened = tokio::time::timeout(self.read_timeout, transport.open_stream(request)) => opened,
        };
        let mut chunks = match opened {
            Ok(Ok(chunks)) => chunks,
            Ok(Err(e)) => {
                self.state = StreamState::Closed;
                return Err(e);
            }
            Err(_) => {
                self.state = StreamState::Closed;
                return Err(WarblerError::Timeout(self.read_timeout));
            }
        };

        self.state = StreamState::Connected;
        info!(url = %request.url, "stream connected");

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Ok(self.close(CloseReason::Cancelled)),
                next = tokio::time::timeout(self.read_timeout, chunks.next()) => next,
            };

            let chunk = match next {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => {
                    self.state = StreamState::Closed;
                    return Err(e);
                }
                Ok(None) => return Ok(self.close(CloseReason::ServerClosed)),
                Err(_) => {
                    self.state = StreamState::Closed;
                    return Err(WarblerError::Timeout(self.read_timeout));
                }
            };

            for value in self.buffer.push(&chunk) {
                if let Some(reason) = self.dispatch(value, notifier).await {
                    return Ok(self.close(reason));
                }
            }
        }
    }

    async fn dispatch(&mut self, value: Value, notifier: &dyn Notifier) -> Option<CloseReason> {
        let message = match classify(value) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "skipping unreadable stream object");
                self.stats.skipped += 1;
                return None;
            }
        };

        match message {
            StreamMessage::Status(status) => {
                self.stats.statuses += 1;
                let avatar = match self.images {
                    Some(images) => images.avatar_for(&status).await,
                    None => None,
                };
                notifier.popup(&status, avatar.as_deref());
                None
            }
            StreamMessage::Disconnect(reason) => {
                info!(reason = ?reason, "server sent disconnect");
                Some(CloseReason::ServerDisconnect(reason))
            }
            StreamMessage::Event(name) => {
                self.stats.informational += 1;
                info!(event = %name, "stream event");
                None
            }
            StreamMessage::Unknown => {
                self.stats.unknown += 1;
                debug!("unrecognized stream object");
                None
            }
            other => {
                self.stats.informational += 1;
                debug!(kind = other.kind(), "stream notice");
                None
            }
        }
    }

    fn close(&mut self, reason: CloseReason) -> StreamOutcome {
        self.state = StreamState::Closed;
        info!(reason = ?reason, statuses = self.stats.statuses, "stream closed");
        StreamOutcome {
            reason,
            stats: self.stats,
        }
    }
}
