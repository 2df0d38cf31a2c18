use sqs_maint::{
    backends::{InMemoryBackend, Operation},
    tasks::{PurgeReport, PurgeTask},
    Error,
};

use crate::common::seed_backlog;

#[tokio::test]
async fn purge_empties_the_queue() {
    let backend = InMemoryBackend::new();
    let queue = backend.create_queue("Orders");
    seed_backlog(&backend, &queue, &["a", "b"]);

    let report = PurgeTask::new(&backend, &queue).run().await.unwrap();

    assert_eq!(
        report,
        PurgeReport::Purged {
            queue: queue.clone()
        }
    );
    assert!(report
        .to_string()
        .starts_with("Purge completed successfully."));
    assert!(backend.bodies(&queue).unwrap().is_empty());
    assert_eq!(backend.calls().purge, 1);
}

#[tokio::test]
async fn missing_queue_is_reported_not_raised() {
    let backend = InMemoryBackend::new();
    let queue = "http://in-memory/queue/Nope";

    let report = PurgeTask::new(&backend, queue).run().await.unwrap();

    let summary = report.to_string();
    assert!(summary.contains("Purge failed. Queue does not exist."), "{summary}");
    assert!(summary.contains(queue), "{summary}");
}

#[tokio::test]
async fn service_failures_propagate() {
    let backend = InMemoryBackend::new();
    let queue = backend.create_queue("Orders");
    seed_backlog(&backend, &queue, &["a"]);
    backend.fail_on(Operation::Purge, "purge already in progress");

    let err = PurgeTask::new(&backend, &queue).run().await.unwrap_err();

    assert!(matches!(err, Error::Generic(_)));
    assert_eq!(backend.bodies(&queue).unwrap(), ["a"]);
}
