// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Constants for the Discord webhook API limits and the sink defaults.
//!
//! # API Constraints
//!
//! Discord webhooks enforce a few limits the sink has to respect:
//! - **Message length**: 2000 characters per message body
//! - **Rate limiting**: `429 Too Many Requests` with a server-advised delay
//! - **Gateway hiccups**: `502 Bad Gateway`, safe to retry after a delay

use std::time::Duration;

/// Code fence wrapped around inline content so whitespace renders verbatim.
pub const FENCE: &str = "```";

/// Maximum number of characters sent as an inline message.
///
/// Discord rejects messages longer than 2000 characters. The content is wrapped in
/// an opening and a closing [`FENCE`], which costs six characters.
///
/// # Value: 1994 characters
///
/// Content of exactly this length is still sent inline. Anything longer is sent
/// as a file attachment instead.
pub const MAX_INLINE_CONTENT_CHARS: usize = 2000 - 2 * FENCE.len();

/// Multipart field carrying the attachment.
pub(crate) const ATTACHMENT_FIELD: &str = "file";

/// File name given to content that is too long to send inline.
pub const ATTACHMENT_FILE_NAME: &str = "content.log";

/// Response header carrying the number of seconds to wait before retrying.
pub(crate) const RATE_LIMIT_RESET_AFTER_HEADER: &str = "x-ratelimit-reset-after";

/// Delay used when a retryable response has no usable reset header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(2);

/// Statuses worth retrying: `429 Too Many Requests` and `502 Bad Gateway`.
pub(crate) const RETRYABLE_STATUSES: [u16; 2] = [429, 502];

/// Minimum spacing between flush attempts.
pub const DEFAULT_EMIT_INTERVAL: Duration = Duration::from_secs(1);

/// Overall budget for one flush, retries and sleeps included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout applied to each individual HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
