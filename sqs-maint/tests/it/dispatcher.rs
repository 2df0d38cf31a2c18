use std::{
    io,
    sync::{Arc, Mutex, PoisonError},
};

use sqs_maint::{
    backends::{InMemoryBackend, Operation},
    dispatcher, Error, Parameters,
};
use tracing_subscriber::fmt::MakeWriter;

use crate::common::{envelope, seed_backlog};

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn params(pairs: &[(&str, &str)]) -> Parameters {
    Parameters::from_pairs(pairs.iter().copied())
}

#[tokio::test]
async fn missing_or_unknown_command_is_answered_without_calls() {
    let backend = InMemoryBackend::new();

    for pairs in [&[][..], &[("command", "explode")][..]] {
        let summary = dispatcher::dispatch(&backend, &params(pairs)).await.unwrap();
        assert_eq!(summary, "Please specify command to execute.");
    }
    assert_eq!(backend.calls().total(), 0);
}

#[tokio::test]
async fn configuration_errors_are_returned_as_summaries() {
    let backend = InMemoryBackend::new();

    let summary = dispatcher::dispatch(
        &backend,
        &params(&[
            ("command", "REDRIVE"),
            ("fromQueue", "OrdersDLQ"),
            ("toQueue", "Orders"),
            ("rate", "lots"),
        ]),
    )
    .await
    .unwrap();

    assert!(summary.contains("Invalid rate"), "{summary}");
    assert_eq!(backend.calls().total(), 0);
}

#[tokio::test]
async fn rates_too_small_to_schedule_are_configuration_errors() {
    let backend = InMemoryBackend::new();
    let source = backend.create_queue("OrdersDLQ");
    backend.create_queue("Orders");
    seed_backlog(&backend, &source, &["a"]);

    let summary = dispatcher::dispatch(
        &backend,
        &params(&[
            ("command", "redrive"),
            ("fromQueue", "OrdersDLQ"),
            ("toQueue", "Orders"),
            ("filter", "always"),
            ("rate", "1e-30"),
        ]),
    )
    .await
    .unwrap();

    assert!(summary.contains("Invalid rate"), "{summary}");
    assert_eq!(backend.calls().total(), 0);
    assert_eq!(backend.bodies(&source).unwrap(), ["a"]);
}

#[tokio::test]
async fn same_queue_is_caught_before_resolving_names() {
    let backend = InMemoryBackend::new();

    let summary = dispatcher::dispatch(
        &backend,
        &params(&[
            ("command", "redrive"),
            ("fromQueue", "Orders"),
            ("toQueue", "Orders"),
        ]),
    )
    .await
    .unwrap();

    assert_eq!(summary, "Source and destination queues are the same.");
    assert_eq!(backend.calls().total(), 0);
}

#[tokio::test(start_paused = true)]
async fn redrive_by_queue_name() {
    let backend = InMemoryBackend::new();
    let source = backend.create_queue("OrdersDLQ");
    let target = backend.create_queue("Orders");
    seed_backlog(&backend, &source, &["a", "b"]);

    let summary = dispatcher::dispatch(
        &backend,
        &params(&[
            ("command", "redrive"),
            ("fromQueue", "OrdersDLQ"),
            ("toQueue", "Orders"),
            ("filter", "always"),
            ("rate", "50"),
        ]),
    )
    .await
    .unwrap();

    assert!(summary.contains("Created: 2"), "{summary}");
    assert!(summary.contains(&source), "{summary}");
    assert_eq!(backend.bodies(&target).unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn default_filter_expects_webhook_envelopes() {
    let backend = InMemoryBackend::new();
    let source = backend.create_queue("OrdersDLQ");
    backend.create_queue("Orders");
    seed_backlog(&backend, &source, &["plain text"]);

    let err = dispatcher::dispatch(
        &backend,
        &params(&[
            ("command", "redrive"),
            ("fromQueue", "OrdersDLQ"),
            ("toQueue", "Orders"),
        ]),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Rejected { .. }));
}

#[tokio::test]
async fn redrive_to_an_unknown_queue_fails() {
    let backend = InMemoryBackend::new();
    backend.create_queue("OrdersDLQ");

    let err = dispatcher::dispatch(
        &backend,
        &params(&[
            ("command", "redrive"),
            ("fromQueue", "OrdersDLQ"),
            ("toQueue", "Nope"),
        ]),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::QueueNotFound(ref name) if name == "Nope"));
}

#[tokio::test]
async fn read_by_queue_name() {
    let backend = InMemoryBackend::new();
    let queue = backend.create_queue("WebhooksOutboxDLQ");
    let body = envelope("https://x/h1", serde_json::json!({ "text": "t1" }));
    seed_backlog(&backend, &queue, &[body.as_str()]);

    let summary = dispatcher::dispatch(
        &backend,
        &params(&[("command", "read"), ("queue", "WebhooksOutboxDLQ")]),
    )
    .await
    .unwrap();

    assert_eq!(summary, "ReadQueueTask completed.");
    assert_eq!(backend.bodies(&queue).unwrap(), [body]);
}

#[tokio::test]
async fn purge_of_an_unknown_name_is_reported() {
    let backend = InMemoryBackend::new();

    let summary = dispatcher::dispatch(&backend, &params(&[("command", "purge"), ("queue", "Nope")]))
        .await
        .unwrap();

    assert_eq!(summary, "Purge failed. Queue does not exist. Nope");
    assert_eq!(backend.calls().purge, 0);
}

#[tokio::test]
async fn purge_by_queue_name() {
    let backend = InMemoryBackend::new();
    let queue = backend.create_queue("Orders");
    seed_backlog(&backend, &queue, &["a"]);

    let summary = dispatcher::dispatch(&backend, &params(&[("command", "PURGE"), ("queue", "Orders")]))
        .await
        .unwrap();

    assert_eq!(summary, format!("Purge completed successfully. {queue}"));
    assert!(backend.bodies(&queue).unwrap().is_empty());
}

#[tokio::test]
async fn task_failures_are_logged_at_error_level() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let backend = InMemoryBackend::new();
    let source = backend.create_queue("OrdersDLQ");
    backend.create_queue("Orders");
    seed_backlog(&backend, &source, &["a"]);
    backend.fail_on(Operation::Send, "throttled by the service");

    let err = dispatcher::dispatch(
        &backend,
        &params(&[
            ("command", "redrive"),
            ("fromQueue", "OrdersDLQ"),
            ("toQueue", "Orders"),
            ("filter", "always"),
            ("rate", "50"),
        ]),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Generic(_)));
    let output = logs.contents();
    assert!(
        output
            .lines()
            .any(|line| line.contains("ERROR") && line.contains("throttled by the service")),
        "{output}"
    );
}
