//! Runs against the ElasticMQ instance from `testing-docker-compose.yaml`; ignored by default.
//!
//! `cargo test -- --ignored` once the container is up.

use aws_sdk_sqs::Client;
use sqs_maint::{
    backends::{SqsBackend, SqsConfig},
    tasks::{PurgeReport, PurgeTask, RedriveReport, RedriveTask},
    AlwaysForward, Error, QueueClient,
};

const ROOT_URL: &str = "http://localhost:9324";
const DEFAULT_CFG: [(&str, &str); 2] = [("AWS_ACCESS_KEY_ID", "x"), ("AWS_SECRET_ACCESS_KEY", "x")];

async fn backend() -> SqsBackend {
    for (var, val) in &DEFAULT_CFG {
        if std::env::var(var).is_err() {
            std::env::set_var(var, val);
        }
    }

    SqsBackend::new(SqsConfig {
        region: "localhost".to_owned(),
        endpoint: Some(ROOT_URL.to_owned()),
    })
    .await
}

/// Creates a uniquely named queue so concurrent tests cannot steal each other's messages.
async fn make_test_queue(client: &Client) -> String {
    let queue_name: String = std::iter::repeat_with(fastrand::alphanumeric)
        .take(8)
        .collect();
    client
        .create_queue()
        .queue_name(&queue_name)
        .send()
        .await
        .unwrap()
        .queue_url
        .unwrap()
}

/// Sends and immediately receives each body once with a zero visibility timeout, so that their
/// first receive predates any run started afterwards.
async fn seed_backlog(client: &Client, queue_url: &str, bodies: &[&str]) {
    for body in bodies {
        client
            .send_message()
            .queue_url(queue_url)
            .message_body(*body)
            .send()
            .await
            .unwrap();
    }

    let mut seen = 0;
    while seen < bodies.len() {
        let out = client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(10)
            .visibility_timeout(0)
            .send()
            .await
            .unwrap();
        seen += out.messages.unwrap_or_default().len();
    }
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
}

#[tokio::test]
#[ignore]
async fn resolves_names_and_passes_urls_through() {
    let backend = backend().await;
    let url = make_test_queue(backend.client()).await;
    let name = url.rsplit('/').next().unwrap();

    assert_eq!(backend.resolve_queue_url(name).await.unwrap(), url);
    assert_eq!(backend.resolve_queue_url(&url).await.unwrap(), url);

    let err = backend.resolve_queue_url("definitely-missing").await.unwrap_err();
    assert!(matches!(err, Error::QueueNotFound(_)));
}

#[tokio::test]
#[ignore]
async fn received_messages_carry_first_receive_timestamp() {
    let backend = backend().await;
    let url = make_test_queue(backend.client()).await;
    backend.send_body(&url, "hello").await.unwrap();

    let batch = backend.receive_batch(&url).await.unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].body, "hello");
    assert!(batch[0].first_received().unwrap() > 0);
    backend
        .delete_by_receipt(&url, &batch[0].receipt_handle)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore]
async fn redrive_moves_the_backlog() {
    let backend = backend().await;
    let source = make_test_queue(backend.client()).await;
    let target = make_test_queue(backend.client()).await;
    seed_backlog(backend.client(), &source, &["a", "b", "c"]).await;

    let report = RedriveTask::new(&backend, &source, &target, &AlwaysForward)
        .with_rate(50.0)
        .run()
        .await
        .unwrap();

    let RedriveReport::Completed { stats, .. } = report else {
        panic!("unexpected report: {report}");
    };
    assert_eq!(stats.created, 3);
    assert_eq!(stats.deleted, 3);
    assert_eq!(stats.skipped, 0);
}

#[tokio::test]
#[ignore]
async fn purge_reports_missing_queue() {
    let backend = backend().await;
    let missing = format!("{ROOT_URL}/000000000000/definitely-missing");

    let report = PurgeTask::new(&backend, &missing).run().await.unwrap();

    assert_eq!(report, PurgeReport::QueueNotFound { queue: missing });
}
