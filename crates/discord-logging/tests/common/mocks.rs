// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory transports for exercising the sink without a server

use discord_logging::{SinkError, Transport};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted result of one transmit call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Delivered,
    Failed,
    Fatal(u16),
}

/// Transport that replays outcomes in order (delivering once the script runs out)
/// and records every payload it receives
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Outcome>>,
    sent: Mutex<Vec<String>>,
    delivered: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        ScriptedTransport {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            sent: Mutex::default(),
            delivered: Mutex::default(),
        }
    }

    pub fn delivering() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("lock poisoned").clone()
    }

    /// Payloads whose transmit call reported delivery
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().expect("lock poisoned").clone()
    }
}

impl Transport for ScriptedTransport {
    fn transmit(&self, content: &str) -> Result<bool, SinkError> {
        self.sent
            .lock()
            .expect("lock poisoned")
            .push(content.to_string());
        let outcome = self
            .outcomes
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or(Outcome::Delivered);
        match outcome {
            Outcome::Delivered => {
                self.delivered
                    .lock()
                    .expect("lock poisoned")
                    .push(content.to_string());
                Ok(true)
            }
            Outcome::Failed => Ok(false),
            Outcome::Fatal(status) => Err(SinkError::Fatal {
                status,
                reason: "Scripted".to_string(),
                url: "http://localhost/***".to_string(),
            }),
        }
    }
}
