// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use anyhow::Context;
use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use std::{env, thread};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use discord_logging::{Emission, SinkConfig, Transport, WebhookSink};

const MIN_FLUSH_TICK: Duration = Duration::from_millis(100);

pub fn main() -> anyhow::Result<()> {
    let log_level = env::var("DISCORD_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,reqwest=off,{}", log_level);

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).context("could not parse log level in configuration")?,
        )
        .with_writer(io::stderr)
        .with_level(true)
        .with_target(true)
        .without_time()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    debug!("Logging subsystem enabled");

    let config = SinkConfig::from_env().context("invalid relay configuration")?;
    let sink = WebhookSink::new(&config).context("failed to create webhook sink")?;
    info!(
        "Relaying stdin to webhook every {} ms",
        config.emit_interval.as_millis()
    );

    let lines = spawn_stdin_reader();
    let tick = config.emit_interval.max(MIN_FLUSH_TICK);
    let count = relay(&lines, &sink, tick)?;

    match sink.force_flush()? {
        Emission::Retained => error!(
            "Exiting with {} entries that could not be delivered",
            sink.queue_len()
        ),
        _ => debug!("Relayed {count} lines"),
    }

    Ok(())
}

fn spawn_stdin_reader() -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                return;
            }
        }
    });
    rx
}

/// Submits each non-empty line and drains the queue whenever input stays quiet for `tick`.
/// Returns the number of relayed lines once the input is closed; a fatal flush error ends
/// the relay immediately.
fn relay<T: Transport>(
    lines: &Receiver<io::Result<String>>,
    sink: &WebhookSink<T>,
    tick: Duration,
) -> anyhow::Result<usize> {
    let mut count = 0;
    loop {
        match lines.recv_timeout(tick) {
            Ok(line) => {
                let line = line.context("failed to read stdin")?;
                if line.is_empty() {
                    continue;
                }
                sink.submit(line)?;
                count += 1;
            }
            Err(RecvTimeoutError::Timeout) => {
                sink.force_flush().context("periodic flush failed")?;
            }
            Err(RecvTimeoutError::Disconnected) => return Ok(count),
        }
    }
}
