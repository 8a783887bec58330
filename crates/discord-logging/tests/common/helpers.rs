// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use discord_logging::{SinkConfig, Webhook};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const WEBHOOK_PATH: &str = "/api/webhooks/42/token";

/// Sink configuration pointing at the mock server's webhook path
pub fn config_for(server_url: &str, emit_interval: Duration, timeout: Duration) -> SinkConfig {
    SinkConfig {
        emit_interval,
        timeout,
        request_timeout: Duration::from_secs(2),
        ..SinkConfig::new(format!("{server_url}{WEBHOOK_PATH}"))
    }
}

/// Webhook transport for the mock server with the given retry budget
pub fn webhook_for(server_url: &str, timeout: Duration) -> Webhook {
    Webhook::new(&config_for(server_url, Duration::ZERO, timeout))
        .expect("failed to build webhook")
}

/// URL of a local port nothing is listening on
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let port = listener.local_addr().expect("no local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}{WEBHOOK_PATH}")
}

/// Starts a server that accepts connections but never answers. Returns its webhook URL
/// and a counter of accepted connections.
pub fn silent_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let port = listener.local_addr().expect("no local addr").port();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&accepted);
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(stream);
        }
    });

    (format!("http://127.0.0.1:{port}{WEBHOOK_PATH}"), accepted)
}
