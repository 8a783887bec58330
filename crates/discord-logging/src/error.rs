// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors that can occur when configuring or flushing the webhook sink.
///
/// Only misconfiguration is an error. Rate limiting, gateway errors, network failures
/// and an exhausted retry budget are reported as an unsuccessful transmit instead.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// The endpoint answered with a status that retrying will not fix.
    #[error("{status} HTTP Error: {reason} for webhook {url}")]
    Fatal {
        status: u16,
        reason: String,
        /// Webhook URL with the token stripped.
        url: String,
    },
}

impl SinkError {
    /// Whether the error points at a broken endpoint rather than bad local settings.
    #[must_use]
    pub fn is_fatal_status(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}
