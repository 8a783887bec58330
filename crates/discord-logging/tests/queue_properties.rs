// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod common;

use common::mocks::{Outcome, ScriptedTransport};
use discord_logging::{Emission, WebhookSink};
use proptest::prelude::*;
use std::time::Duration;

fn entry() -> impl Strategy<Value = String> {
    "[a-z0-9 ]{0,12}"
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![Just(Outcome::Delivered), Just(Outcome::Failed)]
}

proptest! {
    #[test]
    fn submits_within_interval_only_queue(entries in prop::collection::vec(entry(), 1..40)) {
        let sink = WebhookSink::with_transport(ScriptedTransport::delivering(), Duration::from_secs(3600));
        sink.submit("first").unwrap();

        for (i, e) in entries.iter().enumerate() {
            prop_assert_eq!(sink.submit(e.clone()).unwrap(), Emission::Queued);
            prop_assert_eq!(sink.queue_len(), i + 1);
        }
        prop_assert_eq!(sink.transport().sent().len(), 1);
        prop_assert_eq!(sink.queued(), entries);
    }

    #[test]
    fn flushes_match_queue_model(steps in prop::collection::vec((entry(), outcome()), 1..40)) {
        let outcomes: Vec<Outcome> = steps.iter().map(|(_, o)| *o).collect();
        let sink = WebhookSink::with_transport(ScriptedTransport::new(outcomes), Duration::ZERO);

        let mut model: Vec<String> = Vec::new();
        let mut expected_payloads = Vec::new();
        for (e, o) in &steps {
            expected_payloads.push(format!("{}\n{}", model.join("\n"), e));
            let emission = sink.submit(e.clone()).unwrap();
            match o {
                Outcome::Delivered => {
                    prop_assert_eq!(emission, Emission::Delivered);
                    model.clear();
                }
                _ => {
                    prop_assert_eq!(emission, Emission::Retained);
                    model.push(e.clone());
                }
            }
            prop_assert_eq!(sink.queued(), model.clone());
        }
        prop_assert_eq!(sink.transport().sent(), expected_payloads);
    }

    #[test]
    fn force_flush_never_adds_entries(entries in prop::collection::vec(entry(), 0..20), fail in any::<bool>()) {
        let outcomes = [Outcome::Delivered, if fail { Outcome::Failed } else { Outcome::Delivered }];
        let sink = WebhookSink::with_transport(ScriptedTransport::new(outcomes), Duration::from_secs(3600));
        sink.submit("first").unwrap();
        for e in &entries {
            sink.submit(e.clone()).unwrap();
        }

        let emission = sink.force_flush().unwrap();
        if entries.is_empty() {
            prop_assert_eq!(emission, Emission::Skipped);
            prop_assert_eq!(sink.transport().sent().len(), 1);
        } else if fail {
            prop_assert_eq!(emission, Emission::Retained);
            prop_assert_eq!(sink.queued(), entries);
        } else {
            prop_assert_eq!(emission, Emission::Delivered);
            prop_assert_eq!(sink.queue_len(), 0);
        }
    }
}
