// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::constants::{DEFAULT_EMIT_INTERVAL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TIMEOUT};
use crate::error::SinkError;
use reqwest::Url;
use std::env;
use std::time::Duration;
use tracing::warn;

/// Configuration for the webhook sink
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Destination webhook URL
    pub webhook_url: String,
    /// Minimum spacing between flush attempts
    pub emit_interval: Duration,
    /// Overall budget for one flush, including rate limit sleeps
    pub timeout: Duration,
    /// Timeout for each individual HTTP request
    pub request_timeout: Duration,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            emit_interval: DEFAULT_EMIT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            https_proxy: None,
        }
    }
}

impl SinkConfig {
    /// Default settings for the given webhook URL
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, SinkError> {
        let webhook_url = env::var("DISCORD_WEBHOOK_URL").unwrap_or_default();
        let emit_interval = secs_from_env("DISCORD_LOG_EMIT_INTERVAL", DEFAULT_EMIT_INTERVAL);
        let timeout = secs_from_env("DISCORD_LOG_TIMEOUT", DEFAULT_TIMEOUT);
        let request_timeout =
            secs_from_env("DISCORD_LOG_REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT);
        let https_proxy = env::var("DISCORD_LOG_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok()
            .filter(|proxy| !proxy.trim().is_empty());

        let config = Self {
            webhook_url,
            emit_interval,
            timeout,
            request_timeout,
            https_proxy,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SinkError> {
        if self.webhook_url.trim().is_empty() {
            return Err(SinkError::InvalidConfig(
                "DISCORD_WEBHOOK_URL cannot be empty".to_string(),
            ));
        }

        let url = Url::parse(&self.webhook_url).map_err(|e| {
            SinkError::InvalidConfig(format!("Invalid webhook URL: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SinkError::InvalidConfig(format!(
                "Webhook URL scheme must be http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.timeout.is_zero() {
            return Err(SinkError::InvalidConfig(
                "Retry timeout must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(SinkError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Reads a duration given in (possibly fractional) seconds.
fn secs_from_env(name: &str, default: Duration) -> Duration {
    match env::var(name) {
        Ok(raw) => parse_secs(&raw).unwrap_or_else(|| {
            warn!("{name} must be a non-negative number of seconds, got '{raw}'. Using default.");
            default
        }),
        Err(_) => default,
    }
}

pub(crate) fn parse_secs(raw: &str) -> Option<Duration> {
    let secs = raw.trim().parse::<f64>().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}
