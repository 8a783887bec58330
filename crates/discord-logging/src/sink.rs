// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Interval-throttled batching of formatted log entries.
//!
//! # Batching Strategy
//!
//! Every submitted entry either goes straight out or waits in the queue:
//! 1. **Within the emit interval** of the last flush attempt: queued, no network
//! 2. **Interval elapsed**: queued entries plus the new one are sent as one message
//! 3. **Forced flush**: whatever is queued is sent immediately
//!
//! # Failure Handling
//!
//! A flush attempt moves the emit clock forward whether or not it succeeds, so a
//! failing endpoint is tried at most once per interval. Entries leave the queue only
//! when they are delivered; nothing is evicted.
//!
//! # Concurrency
//!
//! All state lives behind one mutex that is held for the whole submit or flush,
//! retry sleeps included. Concurrent callers are serialized and may block for up to
//! the transport's retry budget.

use crate::config::SinkConfig;
use crate::error::SinkError;
use crate::webhook::{Transport, Webhook};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What a submit or flush did with the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    /// Held back because the emit interval has not elapsed.
    Queued,
    /// Queue and new entry were delivered; the queue is now empty.
    Delivered,
    /// Delivery failed transiently; everything stays queued for the next attempt.
    Retained,
    /// Nothing to flush.
    Skipped,
}

#[derive(Debug, Default)]
struct SinkState {
    /// `None` until the first flush attempt.
    last_emit: Option<Instant>,
    /// Entries not yet delivered, oldest first.
    queue: Vec<String>,
}

/// Batching sink in front of a [`Transport`].
///
/// # Example
///
/// ```rust,no_run
/// use discord_logging::{SinkConfig, WebhookSink};
///
/// let sink = WebhookSink::new(&SinkConfig::new("https://discord.com/api/webhooks/1/token"))?;
/// sink.submit("service started")?;
/// sink.force_flush()?;
/// # Ok::<(), discord_logging::SinkError>(())
/// ```
#[derive(Debug)]
pub struct WebhookSink<T = Webhook> {
    transport: T,
    emit_interval: Duration,
    state: Mutex<SinkState>,
}

impl WebhookSink<Webhook> {
    /// Validates the configuration and builds a sink posting to its webhook.
    pub fn new(config: &SinkConfig) -> Result<Self, SinkError> {
        config.validate()?;
        let webhook = Webhook::new(config)?;
        Ok(Self::with_transport(webhook, config.emit_interval))
    }
}

impl<T: Transport> WebhookSink<T> {
    #[must_use]
    pub fn with_transport(transport: T, emit_interval: Duration) -> Self {
        WebhookSink {
            transport,
            emit_interval,
            state: Mutex::new(SinkState::default()),
        }
    }

    /// Accepts one formatted entry.
    ///
    /// Inside the emit interval the entry is only queued. Otherwise the queue and the
    /// entry are sent together as `queue.join("\n") + "\n" + entry`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Fatal`] when the endpoint rejects the request for good. The
    /// entry is queued before the error is returned.
    pub fn submit(&self, entry: impl Into<String>) -> Result<Emission, SinkError> {
        let entry = entry.into();
        let mut state = self.lock();
        let now = Instant::now();

        if let Some(last_emit) = state.last_emit {
            if now.saturating_duration_since(last_emit) < self.emit_interval {
                state.queue.push(entry);
                return Ok(Emission::Queued);
            }
        }

        self.flush_locked(&mut state, now, Some(entry))
    }

    /// Sends everything queued without waiting for the interval. A no-op when the
    /// queue is empty.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Fatal`] when the endpoint rejects the request for good.
    pub fn force_flush(&self) -> Result<Emission, SinkError> {
        let mut state = self.lock();
        if state.queue.is_empty() {
            return Ok(Emission::Skipped);
        }

        let now = Instant::now();
        self.flush_locked(&mut state, now, None)
    }

    fn flush_locked(
        &self,
        state: &mut SinkState,
        now: Instant,
        entry: Option<String>,
    ) -> Result<Emission, SinkError> {
        let mut content = state.queue.join("\n");
        content.push('\n');
        if let Some(entry) = &entry {
            content.push_str(entry);
        }

        let result = self.transport.transmit(&content);
        state.last_emit = Some(now);

        match result {
            Ok(true) => {
                debug!(
                    "WEBHOOK | Flushed {} queued entries",
                    state.queue.len() + usize::from(entry.is_some())
                );
                state.queue.clear();
                Ok(Emission::Delivered)
            }
            Ok(false) => {
                state.queue.extend(entry);
                warn!(
                    "WEBHOOK | Flush failed, keeping {} entries queued",
                    state.queue.len()
                );
                Ok(Emission::Retained)
            }
            Err(e) => {
                state.queue.extend(entry);
                Err(e)
            }
        }
    }

    /// Snapshot of the entries waiting to be delivered, oldest first.
    #[must_use]
    pub fn queued(&self) -> Vec<String> {
        self.lock().queue.clone()
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.lock().queue.len()
    }

    #[must_use]
    pub fn emit_interval(&self) -> Duration {
        self.emit_interval
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    // A panic mid-flush leaves the queue consistent, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
