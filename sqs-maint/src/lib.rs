//! # sqs-maint
//!
//! Bulk, message-level maintenance for hosted queues:
//!
//!   * **Redrive**: move messages from a source queue to a target queue, optionally dropping the
//!     ones a [`MessageFilter`] rejects. Typically used to replay a dead-letter queue back into
//!     its primary queue.
//!
//!   * **Read**: look at a handful of messages without deleting them, handing each one to a
//!     [`MessageConsumer`] (for instance to group them by webhook URL).
//!
//!   * **Purge**: delete every message in a queue.
//!
//! ## Cargo Features
//!
//! Each queue service adapter is enabled with its associated cargo feature. Both are enabled by
//! default.
//!
//! * `sqs`: Amazon SQS through `aws-sdk-sqs`
//! * `in_memory`: an in-process queue service with visibility timeouts, used by the test suite
//!
//! ## How to Use
//!
//! Every task runs against something implementing [`QueueClient`]. The simplest way to drive
//! the tasks is through the [`dispatcher`], which takes the same parameters as the binary:
//!
//! ```no_run
//! # async {
//! use sqs_maint::{backends::{SqsBackend, SqsConfig}, dispatcher, Parameters};
//!
//! let client = SqsBackend::new(SqsConfig::default()).await;
//! let params = Parameters {
//!     command: Some("redrive".to_owned()),
//!     from_queue: Some("OrdersDLQ".to_owned()),
//!     to_queue: Some("Orders".to_owned()),
//!     filter: Some("always".to_owned()),
//!     ..Default::default()
//! };
//!
//! let summary = dispatcher::dispatch(&client, &params).await?;
//! println!("{summary}");
//! # anyhow::Ok(())
//! # };
//! ```
//!
//! The tasks can also be used directly. Any closure with the right signature may be used as a
//! filter:
//!
//! ```no_run
//! # async {
//! # let client: sqs_maint::backends::InMemoryBackend = todo!();
//! use sqs_maint::{tasks::RedriveTask, Result};
//!
//! let skip_pings = |body: &str| -> Result<bool> { Ok(!body.contains("\"ping\"")) };
//! let report = RedriveTask::new(&client, "OrdersDLQ", "Orders", &skip_pings)
//!     .with_rate(5.0)
//!     .run()
//!     .await?;
//! println!("{report}");
//! # anyhow::Ok(())
//! # };
//! ```
#![warn(unreachable_pub)]

use thiserror::Error;

pub mod backends;
pub mod config;
pub mod consumer;
pub mod dispatcher;
mod envelope;
pub mod filter;
mod queue;
pub mod rate_limiter;
pub mod tasks;

pub use self::{
    config::{ConfigError, FilterKind, Parameters, Plan},
    consumer::{GroupByWebhookUrl, MessageConsumer},
    filter::{AlwaysForward, FreshnessFilter, MessageFilter},
    queue::{now_millis, Message, QueueClient, QueueCounts, FIRST_RECEIVE_TIMESTAMP},
    rate_limiter::RateLimiter,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("queue does not exist: {0}")]
    QueueNotFound(String),

    #[error("message {message_id} has no `{name}` attribute")]
    MissingAttribute { message_id: String, name: &'static str },
    #[error("message {message_id} has an invalid `{name}` attribute: {value:?}")]
    InvalidAttribute {
        message_id: String,
        name: &'static str,
        value: String,
    },

    #[error("(de)serialization error")]
    Payload(#[from] serde_json::Error),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("unable to process message. messageId={message_id}, messageBody={body}")]
    Rejected {
        message_id: String,
        body: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Generic(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn generic<E: 'static + std::error::Error + Send + Sync>(e: E) -> Self {
        Self::Generic(Box::new(e))
    }

    /// Wraps a filter or consumer failure with the message it failed on.
    pub(crate) fn rejected(message: &Message, source: Error) -> Self {
        Self::Rejected {
            message_id: message.message_id.clone(),
            body: message.body.clone(),
            source: Box::new(source),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
