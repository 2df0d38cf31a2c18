//! Looks at the first few messages of a queue without consuming them.
//!
//! Nothing is deleted: received messages simply become visible again once their visibility
//! timeout expires. Unlike a redrive, a batch is abandoned at the first message that was
//! produced after the run started, since a read is only a quick look.

use std::fmt;

use tracing::{debug, info};

use super::rejected;
use crate::{now_millis, MessageConsumer, QueueClient, Result};

/// Soft cap on the number of messages a read goes through.
pub const READ_LIMIT: u64 = 10;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReadReport {
    /// Messages received, whether or not they reached the consumer.
    pub received: u64,
    /// Messages handed to the consumer.
    pub consumed: u64,
}

impl fmt::Display for ReadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReadQueueTask completed.")
    }
}

pub struct ReadTask<'a, C> {
    client: &'a C,
    queue: &'a str,
    consumer: &'a mut dyn MessageConsumer,
    limit: u64,
}

impl<'a, C: QueueClient> ReadTask<'a, C> {
    pub fn new(client: &'a C, queue: &'a str, consumer: &'a mut dyn MessageConsumer) -> Self {
        Self {
            client,
            queue,
            consumer,
            limit: READ_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub async fn run(self) -> Result<ReadReport> {
        let expected = self
            .client
            .count_approximate(self.queue)
            .await?
            .total()
            .min(self.limit);
        let run_start = now_millis();
        let mut report = ReadReport::default();

        let mut batch = self.client.receive_batch(self.queue).await?;
        while !batch.is_empty() && report.received <= expected {
            for message in &batch {
                if message.first_received()? > run_start {
                    debug!(
                        "Message {} was produced after the read started, abandoning batch",
                        message.message_id
                    );
                    break;
                }

                let extracted = self
                    .consumer
                    .consume(message, &message.body)
                    .map_err(|e| rejected(message, e))?;
                report.consumed += 1;
                debug!("Read({}): {extracted}", message.message_id);
            }

            report.received += batch.len() as u64;
            batch = self.client.receive_batch(self.queue).await?;
        }

        info!("{report}");
        Ok(report)
    }
}
