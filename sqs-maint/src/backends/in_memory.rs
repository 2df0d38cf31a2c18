//! An in-process stand-in for the queue service.
//!
//! Messages follow the same visibility model as SQS: a receive hides the delivered messages for
//! the visibility timeout and hands out a fresh receipt handle, and a message that is not
//! deleted in time is delivered again. `ApproximateFirstReceiveTimestamp` is assigned on the
//! first delivery unless it was seeded with [`InMemoryBackend::push_received`], which is how a
//! dead-letter queue looks after messages were moved into it.
use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::time::Instant;

use crate::{
    queue::{looks_like_url, now_millis, QueueClient, MAX_BATCH_SIZE},
    Error, Message, QueueCounts, Result, FIRST_RECEIVE_TIMESTAMP,
};

const BASE_URL: &str = "http://in-memory/queue";
const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// The calls a [`QueueClient`] can make.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    Receive,
    Send,
    Delete,
    Purge,
    Count,
}

/// Number of service calls made so far, per operation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OperationCounts {
    pub receive: usize,
    pub send: usize,
    pub delete: usize,
    pub purge: usize,
    pub count: usize,
}

impl OperationCounts {
    pub fn total(&self) -> usize {
        self.receive + self.send + self.delete + self.purge + self.count
    }

    fn record(&mut self, op: Operation) {
        match op {
            Operation::Receive => self.receive += 1,
            Operation::Send => self.send += 1,
            Operation::Delete => self.delete += 1,
            Operation::Purge => self.purge += 1,
            Operation::Count => self.count += 1,
        }
    }
}

struct StoredMessage {
    id: String,
    body: String,
    first_received: Option<i64>,
    receive_count: u32,
    receipt_handle: Option<String>,
    invisible_until: Option<Instant>,
    delayed_until: Option<Instant>,
}

impl StoredMessage {
    fn is_delayed(&self, now: Instant) -> bool {
        self.delayed_until.is_some_and(|t| t > now)
    }

    fn is_in_flight(&self, now: Instant) -> bool {
        self.invisible_until.is_some_and(|t| t > now)
    }
}

#[derive(Default)]
struct State {
    queues: HashMap<String, VecDeque<StoredMessage>>,
    next_id: u64,
    calls: OperationCounts,
    failures: HashMap<Operation, String>,
}

impl State {
    fn queue_mut(&mut self, queue_url: &str) -> Result<&mut VecDeque<StoredMessage>> {
        self.queues
            .get_mut(queue_url)
            .ok_or_else(|| Error::QueueNotFound(queue_url.to_owned()))
    }

    /// Records a service call and fails it if a failure was injected for `op`.
    fn call(&mut self, op: Operation) -> Result<()> {
        self.calls.record(op);
        match self.failures.get(&op) {
            Some(reason) => Err(Error::generic(std::io::Error::other(reason.clone()))),
            None => Ok(()),
        }
    }

    fn enqueue(
        &mut self,
        queue_url: &str,
        body: &str,
        first_received: Option<i64>,
        delayed_until: Option<Instant>,
    ) -> Result<()> {
        self.next_id += 1;
        let id = format!("msg-{}", self.next_id);
        self.queue_mut(queue_url)?.push_back(StoredMessage {
            id,
            body: body.to_owned(),
            first_received,
            receive_count: 0,
            receipt_handle: None,
            invisible_until: None,
            delayed_until,
        });
        Ok(())
    }
}

/// [`QueueClient`] over queues held in memory.
///
/// The `push*` helpers seed queues without counting as service calls, so tests can assert on
/// exactly the calls a task made through [`InMemoryBackend::calls`].
pub struct InMemoryBackend {
    state: Mutex<State>,
    visibility_timeout: Duration,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }

    /// A zero timeout makes every received message visible again immediately, as if the
    /// consumer were very slow.
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates an empty queue (or keeps an existing one) and returns its URL.
    pub fn create_queue(&self, name: &str) -> String {
        let url = format!("{BASE_URL}/{name}");
        self.lock().queues.entry(url.clone()).or_default();
        url
    }

    /// Seeds a message that has never been delivered.
    pub fn push(&self, queue_url: &str, body: &str) -> Result<()> {
        self.lock().enqueue(queue_url, body, None, None)
    }

    /// Seeds a message that was first delivered at `first_received` (epoch millis).
    pub fn push_received(&self, queue_url: &str, body: &str, first_received: i64) -> Result<()> {
        self.lock()
            .enqueue(queue_url, body, Some(first_received), None)
    }

    /// Seeds a message that only becomes visible after `delay`.
    pub fn push_delayed(&self, queue_url: &str, body: &str, delay: Duration) -> Result<()> {
        self.lock()
            .enqueue(queue_url, body, None, Some(Instant::now() + delay))
    }

    /// Bodies of every message in the queue, in flight or not, oldest first.
    pub fn bodies(&self, queue_url: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .queue_mut(queue_url)?
            .iter()
            .map(|m| m.body.clone())
            .collect())
    }

    pub fn calls(&self) -> OperationCounts {
        self.lock().calls
    }

    /// Makes every subsequent call of `op` fail with `reason`.
    pub fn fail_on(&self, op: Operation, reason: &str) {
        self.lock().failures.insert(op, reason.to_owned());
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }
}

impl QueueClient for InMemoryBackend {
    async fn receive_batch(&self, queue_url: &str) -> Result<Vec<Message>> {
        let mut state = self.lock();
        state.call(Operation::Receive)?;

        let now = Instant::now();
        let visibility_timeout = self.visibility_timeout;
        let queue = state.queue_mut(queue_url)?;

        let mut out = Vec::new();
        for stored in queue
            .iter_mut()
            .filter(|m| !m.is_delayed(now) && !m.is_in_flight(now))
            .take(MAX_BATCH_SIZE as usize)
        {
            let first_received = *stored.first_received.get_or_insert_with(now_millis);
            stored.receive_count += 1;
            let receipt_handle = format!("{}#{}", stored.id, stored.receive_count);
            stored.receipt_handle = Some(receipt_handle.clone());
            stored.invisible_until = Some(now + visibility_timeout);

            out.push(Message {
                message_id: stored.id.clone(),
                receipt_handle,
                body: stored.body.clone(),
                attributes: [
                    (FIRST_RECEIVE_TIMESTAMP.to_owned(), first_received.to_string()),
                    (
                        "ApproximateReceiveCount".to_owned(),
                        stored.receive_count.to_string(),
                    ),
                ]
                .into(),
            });
        }

        tracing::trace!("InMemory: received {} message(s) from {queue_url}", out.len());
        Ok(out)
    }

    async fn send_body(&self, queue_url: &str, body: &str) -> Result<()> {
        let mut state = self.lock();
        state.call(Operation::Send)?;
        state.enqueue(queue_url, body, None, None)
    }

    async fn delete_by_receipt(&self, queue_url: &str, receipt_handle: &str) -> Result<()> {
        let mut state = self.lock();
        state.call(Operation::Delete)?;

        let queue = state.queue_mut(queue_url)?;
        // Stale handles are accepted and ignored, the way the service treats deletes of
        // messages that are already gone.
        if let Some(idx) = queue
            .iter()
            .position(|m| m.receipt_handle.as_deref() == Some(receipt_handle))
        {
            queue.remove(idx);
        }
        Ok(())
    }

    async fn purge(&self, queue_url: &str) -> Result<()> {
        let mut state = self.lock();
        state.call(Operation::Purge)?;
        state.queue_mut(queue_url)?.clear();
        Ok(())
    }

    async fn count_approximate(&self, queue_url: &str) -> Result<QueueCounts> {
        let mut state = self.lock();
        state.call(Operation::Count)?;

        let now = Instant::now();
        let mut counts = QueueCounts::default();
        for m in state.queue_mut(queue_url)?.iter() {
            if m.is_delayed(now) {
                counts.delayed += 1;
            } else if m.is_in_flight(now) {
                counts.not_visible += 1;
            } else {
                counts.visible += 1;
            }
        }
        Ok(counts)
    }

    async fn resolve_queue_url(&self, name_or_url: &str) -> Result<String> {
        if looks_like_url(name_or_url) {
            return Ok(name_or_url.to_owned());
        }

        let url = format!("{BASE_URL}/{name_or_url}");
        if self.lock().queues.contains_key(&url) {
            Ok(url)
        } else {
            Err(Error::QueueNotFound(name_or_url.to_owned()))
        }
    }
}
