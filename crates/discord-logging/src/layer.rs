// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `tracing` integration.
//!
//! [`WebhookLayer`] plugs the sink into a `tracing_subscriber` registry. Each event is
//! formatted to one line of text and submitted; the returned [`FlushGuard`] delivers
//! whatever is still queued when it is dropped.
//!
//! # Format
//!
//! The default formatter produces:
//! ```text
//! LEVEL target: message key=value ...
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use discord_logging::{SinkConfig, WebhookLayer, WebhookSink};
//! use tracing_subscriber::prelude::*;
//!
//! let sink = WebhookSink::new(&SinkConfig::from_env()?)?;
//! let (layer, _guard) = WebhookLayer::new(sink);
//! tracing_subscriber::registry().with(layer).init();
//!
//! tracing::warn!(disk = "/var", "disk almost full");
//! # Ok::<(), discord_logging::SinkError>(())
//! ```
//!
//! # Self-logging
//!
//! The sink logs through `tracing` too, and the HTTP stack may emit events from its
//! own threads while a flush holds the sink lock. Events from those targets are never
//! submitted, and a thread-local guard drops events raised while this thread is
//! already inside the sink.

use crate::error::SinkError;
use crate::sink::WebhookSink;
use crate::webhook::{Transport, Webhook};
use std::cell::Cell;
use std::fmt::{self, Write};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Targets whose events are never forwarded to the webhook.
const IGNORED_TARGETS: [&str; 10] = [
    "discord_logging",
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
    "want",
    "mio",
    "tokio",
    "tower",
];

thread_local! {
    static IN_SINK: Cell<bool> = const { Cell::new(false) };
}

/// Formatter turning an event into the text submitted to the sink.
pub type EventFormatter = dyn Fn(&Event<'_>) -> String + Send + Sync;

/// What to do when the endpoint reports a non-retryable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FatalPolicy {
    /// Panic in the logging call, so a broken webhook can't go unnoticed.
    #[default]
    Panic,
    /// Print the error to stderr and keep going.
    Stderr,
}

/// `tracing_subscriber` layer forwarding events to a [`WebhookSink`].
pub struct WebhookLayer<T = Webhook> {
    sink: Arc<WebhookSink<T>>,
    formatter: Box<EventFormatter>,
    fatal_policy: FatalPolicy,
}

/// Force-flushes the sink when dropped.
#[must_use = "dropping the guard flushes immediately"]
pub struct FlushGuard<T: Transport = Webhook> {
    sink: Arc<WebhookSink<T>>,
}

impl<T: Transport> WebhookLayer<T> {
    /// Wraps the sink in a layer using the default formatter and [`FatalPolicy::Panic`].
    pub fn new(sink: WebhookSink<T>) -> (Self, FlushGuard<T>) {
        let sink = Arc::new(sink);
        let guard = FlushGuard {
            sink: Arc::clone(&sink),
        };
        let layer = WebhookLayer {
            sink,
            formatter: Box::new(format_event),
            fatal_policy: FatalPolicy::default(),
        };
        (layer, guard)
    }

    #[must_use]
    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&Event<'_>) -> String + Send + Sync + 'static,
    {
        self.formatter = Box::new(formatter);
        self
    }

    #[must_use]
    pub fn with_fatal_policy(mut self, fatal_policy: FatalPolicy) -> Self {
        self.fatal_policy = fatal_policy;
        self
    }

    #[must_use]
    pub fn sink(&self) -> &Arc<WebhookSink<T>> {
        &self.sink
    }

    #[allow(clippy::panic)]
    fn handle_fatal(&self, err: &SinkError) {
        match self.fatal_policy {
            FatalPolicy::Panic => panic!("discord webhook sink: {err}"),
            FatalPolicy::Stderr => eprintln!("discord webhook sink: {err}"),
        }
    }
}

impl<S, T> Layer<S> for WebhookLayer<T>
where
    S: Subscriber,
    T: Transport + Send + Sync + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if is_ignored_target(event.metadata().target()) {
            return;
        }
        let Some(_reentrancy) = ReentrancyGuard::enter() else {
            return;
        };

        let entry = (self.formatter)(event);
        if let Err(err) = self.sink.submit(entry) {
            self.handle_fatal(&err);
        }
    }
}

impl<T: Transport> FlushGuard<T> {
    #[must_use]
    pub fn sink(&self) -> &Arc<WebhookSink<T>> {
        &self.sink
    }
}

impl<T: Transport> Drop for FlushGuard<T> {
    fn drop(&mut self) {
        let _reentrancy = ReentrancyGuard::enter();
        if let Err(err) = self.sink.force_flush() {
            eprintln!("discord webhook sink: final flush failed: {err}");
        }
    }
}

fn is_ignored_target(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|ignored| {
        target
            .strip_prefix(ignored)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

struct ReentrancyGuard;

impl ReentrancyGuard {
    fn enter() -> Option<Self> {
        IN_SINK.with(|in_sink| (!in_sink.replace(true)).then_some(ReentrancyGuard))
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        IN_SINK.with(|in_sink| in_sink.set(false));
    }
}

/// Default formatter: `LEVEL target: message key=value ...`.
pub fn format_event(event: &Event<'_>) -> String {
    let metadata = event.metadata();
    let mut visitor = EventVisitor::default();
    event.record(&mut visitor);

    format!(
        "{} {}: {}{}",
        metadata.level(),
        metadata.target(),
        visitor.message,
        visitor.fields
    )
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: String,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignored_targets() {
        assert!(is_ignored_target("reqwest"));
        assert!(is_ignored_target("reqwest::connect"));
        assert!(is_ignored_target("discord_logging::webhook"));
        assert!(is_ignored_target("hyper_util::client::legacy"));
        assert!(!is_ignored_target("hyperion"));
        assert!(!is_ignored_target("my_app::tokio_helpers"));
        assert!(!is_ignored_target("my_app"));
    }

    #[test]
    fn test_reentrancy_guard() {
        let outer = ReentrancyGuard::enter();
        assert!(outer.is_some());
        assert!(ReentrancyGuard::enter().is_none());
        drop(outer);
        assert!(ReentrancyGuard::enter().is_some());
    }
}
