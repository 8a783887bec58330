// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Webhook delivery with rate limit aware retries.
//!
//! # Flow
//!
//! ```text
//!   content
//!      │
//!      v
//!   ┌──────────────┐
//!   │ Inline/File? │ (1994 characters)
//!   └──────┬───────┘
//!          │
//!          v
//!   ┌──────────────┐
//!   │  HTTP POST   │<────────────┐
//!   └──────┬───────┘             │
//!          │                     │
//!          v                     │
//!   ┌──────────────┐  429/502  ┌─┴──────────────────┐
//!   │   Status?    ├──────────>│ sleep reset-after  │ (within budget)
//!   └──────────────┘           └────────────────────┘
//! ```
//!
//! # Outcomes
//!
//! - **2xx**: delivered
//! - **429 / 502**: retried after `x-ratelimit-reset-after` seconds until the budget runs out
//! - **Network failure**: not delivered, no retry
//! - **Any other status**: [`SinkError::Fatal`], never retried

use crate::config::{parse_secs, SinkConfig};
use crate::constants::{
    ATTACHMENT_FIELD, ATTACHMENT_FILE_NAME, DEFAULT_RETRY_AFTER, FENCE,
    MAX_INLINE_CONTENT_CHARS, RATE_LIMIT_RESET_AFTER_HEADER, RETRYABLE_STATUSES,
};
use crate::error::SinkError;
use crate::http::build_client;
use reqwest::blocking::{multipart, Client, Response};
use reqwest::header::HeaderMap;
use reqwest::Url;
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Delivers text content somewhere.
///
/// `Ok(true)` means delivered, `Ok(false)` means a transient failure the caller should
/// retry later, and `Err` means the destination is misconfigured.
pub trait Transport {
    fn transmit(&self, content: &str) -> Result<bool, SinkError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transmit(&self, content: &str) -> Result<bool, SinkError> {
        (**self).transmit(content)
    }
}

/// Request body shape chosen from the content length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Fenced message text, sent as a url-encoded `content` field.
    Inline(String),
    /// Raw bytes sent as a multipart file named [`ATTACHMENT_FILE_NAME`].
    Attachment(Vec<u8>),
}

impl Payload {
    /// Content up to [`MAX_INLINE_CONTENT_CHARS`] characters goes inline, longer content
    /// becomes an attachment so nothing is truncated.
    #[must_use]
    pub fn for_content(content: &str) -> Self {
        if content.chars().count() <= MAX_INLINE_CONTENT_CHARS {
            Payload::Inline(format!("{FENCE}{content}{FENCE}"))
        } else {
            Payload::Attachment(content.as_bytes().to_vec())
        }
    }
}

#[derive(Serialize)]
struct MessageForm<'a> {
    content: &'a str,
}

/// Reqwest-backed [`Transport`] posting to a Discord-style webhook.
#[derive(Debug, Clone)]
pub struct Webhook {
    client: Client,
    url: String,
    /// Overall budget for one transmit, sleeps included.
    timeout: Duration,
}

impl Webhook {
    pub fn new(config: &SinkConfig) -> Result<Self, SinkError> {
        let client = build_client(config)?;
        Ok(Self::with_client(client, config.webhook_url.clone(), config.timeout))
    }

    #[must_use]
    pub fn with_client(client: Client, url: String, timeout: Duration) -> Self {
        Webhook {
            client,
            url,
            timeout,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // Multipart bodies can't be cloned, so every attempt builds a fresh request.
    fn post(&self, payload: &Payload) -> reqwest::Result<Response> {
        let request = self.client.post(&self.url);
        let request = match payload {
            Payload::Inline(text) => request.form(&MessageForm { content: text }),
            Payload::Attachment(bytes) => {
                let part = multipart::Part::bytes(bytes.clone()).file_name(ATTACHMENT_FILE_NAME);
                request.multipart(multipart::Form::new().part(ATTACHMENT_FIELD, part))
            }
        };
        request.send()
    }
}

impl Transport for Webhook {
    fn transmit(&self, content: &str) -> Result<bool, SinkError> {
        if content.is_empty() {
            return Ok(true);
        }

        let payload = Payload::for_content(content);
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let resp = match self.post(&payload) {
                Ok(resp) => resp,
                Err(e) => {
                    error!(
                        "WEBHOOK | Failed to send request after {} ms: {}",
                        start.elapsed().as_millis(),
                        e
                    );
                    return Ok(false);
                }
            };

            let status = resp.status();
            if status.is_success() {
                debug!("WEBHOOK | Delivered {} bytes in {attempts} attempts", content.len());
                return Ok(true);
            }

            if !RETRYABLE_STATUSES.contains(&status.as_u16()) {
                let err = SinkError::Fatal {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                    url: redact_url(&self.url),
                };
                error!("WEBHOOK | {err}");
                return Err(err);
            }

            let delay = retry_after(resp.headers());
            if exceeds_budget(start.elapsed(), delay, self.timeout) {
                error!(
                    "WEBHOOK | Giving up after {attempts} attempts: waiting {} ms would exceed the {} ms budget",
                    delay.as_millis(),
                    self.timeout.as_millis()
                );
                return Ok(false);
            }

            warn!(
                "WEBHOOK | {}: retrying in {} ms (attempt {attempts})",
                status,
                delay.as_millis()
            );
            thread::sleep(delay);
        }
    }
}

/// Server-advised delay before the next attempt, [`DEFAULT_RETRY_AFTER`] when the
/// header is missing or unusable.
#[must_use]
pub fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RATE_LIMIT_RESET_AFTER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

/// Whether waiting `delay` on top of `elapsed` would overrun `budget`. Sums too large
/// to represent count as overruns.
fn exceeds_budget(elapsed: Duration, delay: Duration, budget: Duration) -> bool {
    !matches!(elapsed.checked_add(delay), Some(total) if total <= budget)
}

/// Strips the token (last path segment) and query so the URL is safe to log.
pub(crate) fn redact_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return "<invalid url>".to_string();
    };
    parsed.set_query(None);
    parsed.set_fragment(None);
    let _ = parsed.set_password(None);

    let mut segments: Vec<String> = parsed
        .path_segments()
        .map(|s| s.filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();
    if segments.len() > 1 {
        if let Some(last) = segments.last_mut() {
            *last = "***".to_string();
        }
    }
    parsed.set_path(&segments.join("/"));
    parsed.to_string()
}
