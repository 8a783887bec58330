// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Blocking HTTP client construction.
//!
//! The sink runs on whatever thread emits the log record, so the client is the
//! blocking flavour of `reqwest`. It must not be built or dropped from inside an
//! async runtime.
//!
//! The client carries:
//! - **Timeouts**: the per-request timeout from [`SinkConfig::request_timeout`]
//! - **Connection pooling**: idle timeout and TCP keep-alive
//! - **Proxy support**: optional HTTPS proxy

use crate::config::SinkConfig;
use crate::error::SinkError;
use core::time::Duration;
use reqwest::blocking::{Client, ClientBuilder};
use tracing::error;

/// Creates a configured blocking HTTP client.
///
/// If the proxy configuration is invalid, logs an error and falls back to a direct
/// connection so the sink keeps working.
pub fn build_client(config: &SinkConfig) -> Result<Client, SinkError> {
    match build_client_inner(config, true) {
        Ok(client) => Ok(client),
        Err(e) if config.https_proxy.is_some() => {
            error!(
                "WEBHOOK | Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            build_client_inner(config, false).map_err(|e| SinkError::Client(e.to_string()))
        }
        Err(e) => Err(SinkError::Client(e.to_string())),
    }
}

fn client_builder(config: &SinkConfig) -> ClientBuilder {
    Client::builder()
        .use_rustls_tls()
        .timeout(config.request_timeout)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(60)))
}

fn build_client_inner(config: &SinkConfig, allow_proxy: bool) -> reqwest::Result<Client> {
    let mut builder = client_builder(config);

    if allow_proxy {
        if let Some(https_uri) = &config.https_proxy {
            builder = builder.proxy(reqwest::Proxy::https(https_uri.as_str())?);
        }
    }

    builder.build()
}
