// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batching log sink for Discord-style webhooks.
//!
//! Log entries are held in an ordered queue and sent as one combined message at most
//! once per emit interval. Rate limited requests (`429`, `502`) are retried after the
//! server-advised delay within a fixed budget; anything that still fails stays queued
//! for the next attempt.
//!
//! # Modules
//!
//! - [`sink`]: queue and interval policy ([`WebhookSink`])
//! - [`webhook`]: transport with retry policy ([`Webhook`], [`Transport`])
//! - [`layer`]: `tracing_subscriber` integration ([`WebhookLayer`])
//! - [`config`]: settings and environment loading ([`SinkConfig`])

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod constants;
pub mod error;
pub mod http;
pub mod layer;
pub mod sink;
pub mod webhook;

pub use config::SinkConfig;
pub use error::SinkError;
pub use layer::{FatalPolicy, FlushGuard, WebhookLayer};
pub use sink::{Emission, WebhookSink};
pub use webhook::{Payload, Transport, Webhook};
