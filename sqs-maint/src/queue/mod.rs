use std::future::Future;

use time::OffsetDateTime;

use crate::Result;

mod message;

pub use self::message::{Message, FIRST_RECEIVE_TIMESTAMP};

/// Largest batch the queue service hands out for a single receive.
pub(crate) const MAX_BATCH_SIZE: i32 = 10;

/// The narrow slice of a queue service the maintenance tasks need.
///
/// Implementations are shared by reference between the dispatcher and a single running task.
/// Every call is a round trip to the service; failures are returned as-is and the tasks never
/// retry them, so any retry policy belongs to the underlying SDK.
pub trait QueueClient: Send + Sync {
    /// Receives up to ten messages, including their `ApproximateFirstReceiveTimestamp`
    /// attribute.
    ///
    /// An empty batch means nothing was available within the service's short-poll window.
    fn receive_batch(&self, queue_url: &str) -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// Publishes `body` verbatim. Returns once the service acknowledged the message.
    fn send_body(&self, queue_url: &str, body: &str) -> impl Future<Output = Result<()>> + Send;

    /// Deletes the delivery identified by `receipt_handle`.
    fn delete_by_receipt(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Deletes every message in the queue. Fails with
    /// [`QueueNotFound`](crate::Error::QueueNotFound) for an unknown queue.
    fn purge(&self, queue_url: &str) -> impl Future<Output = Result<()>> + Send;

    fn count_approximate(&self, queue_url: &str)
        -> impl Future<Output = Result<QueueCounts>> + Send;

    /// Turns a queue name into its URL. Values that already look like URLs are returned
    /// unchanged.
    fn resolve_queue_url(&self, name_or_url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// The service's approximate counters for one queue.
///
/// These are eventually consistent estimates. The sum is never treated as a bound on how many
/// messages a task will see.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct QueueCounts {
    pub visible: u64,
    pub delayed: u64,
    pub not_visible: u64,
}

impl QueueCounts {
    pub fn total(&self) -> u64 {
        self.visible + self.delayed + self.not_visible
    }
}

/// Wall-clock milliseconds since the Unix epoch, the unit of `ApproximateFirstReceiveTimestamp`.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn looks_like_url(name_or_url: &str) -> bool {
    name_or_url.starts_with("https://") || name_or_url.starts_with("http://")
}
