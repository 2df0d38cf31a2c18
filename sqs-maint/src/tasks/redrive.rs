//! Moves messages from a source queue to a target queue.
//!
//! Every message is received, passed through the filter, sent to the target if the filter
//! accepts it and then deleted from the source. The delete only happens after the send was
//! acknowledged, so a run that dies in between leaves a duplicate behind, never a gap.
//!
//! Messages whose `ApproximateFirstReceiveTimestamp` lies after the start of the run were
//! produced while the run was going. They are left alone and counted as skipped, and once more
//! than half of the initially counted messages have been skipped the run stops instead of
//! chasing a live tail.

use std::{fmt, time::Duration};

use tracing::{error, info, warn};

use super::rejected;
use crate::{now_millis, MessageFilter, QueueClient, RateLimiter, Result};

/// Default requests per second.
///
/// Slack disables a webhook that receives more than 3200 requests in 5 minutes (10.6 rps). At
/// 8 rps, 10k messages are redriven in about 21 minutes.
pub const DEFAULT_REDRIVE_RATE: f64 = 8.0;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RedriveStats {
    /// Messages received, including skipped ones.
    pub messages: u64,
    /// Messages sent to the target queue.
    pub created: u64,
    /// Messages deleted from the source queue.
    pub deleted: u64,
    /// Messages the filter rejected. These are deleted without being sent.
    pub dropped: u64,
    /// Messages first received after the run started.
    pub skipped: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RedriveReport {
    SameQueue,
    SourceEmpty,
    Completed {
        source: String,
        target: String,
        elapsed: Duration,
        stats: RedriveStats,
    },
}

impl fmt::Display for RedriveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameQueue => f.write_str("Source and destination queues are the same."),
            Self::SourceEmpty => f.write_str("Source queue is empty."),
            Self::Completed {
                source,
                target,
                elapsed,
                stats,
            } => {
                writeln!(f, "Re-drive complete in {elapsed:.3?} from {source} to {target}.")?;
                writeln!(f, "Created: {}", stats.created)?;
                writeln!(f, "Deleted: {}", stats.deleted)?;
                writeln!(f, "Dropped: {}", stats.dropped)?;
                writeln!(f, "Skipped: {}", stats.skipped)
            }
        }
    }
}

pub struct RedriveTask<'a, C> {
    client: &'a C,
    source: &'a str,
    target: &'a str,
    filter: &'a dyn MessageFilter,
    rate: f64,
}

impl<'a, C: QueueClient> RedriveTask<'a, C> {
    pub fn new(
        client: &'a C,
        source: &'a str,
        target: &'a str,
        filter: &'a dyn MessageFilter,
    ) -> Self {
        Self {
            client,
            source,
            target,
            filter,
            rate: DEFAULT_REDRIVE_RATE,
        }
    }

    /// Requests per second. Lower it when the consumers behind the target are fragile.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub async fn run(self) -> Result<RedriveReport> {
        info!(
            "Re-driving messages from {} to {}",
            self.source, self.target
        );

        if self.source == self.target {
            let report = RedriveReport::SameQueue;
            error!("{report}");
            return Ok(report);
        }
        let mut limiter = RateLimiter::new(self.rate)?;

        let started = std::time::Instant::now();
        let run_start = now_millis();

        let expected = self.client.count_approximate(self.source).await?.total();
        if expected == 0 {
            let report = RedriveReport::SourceEmpty;
            error!("{report}");
            return Ok(report);
        }
        let max_skips = expected / 2;

        info!(
            "Re-driving {expected} messages at {:.1} requests per second.",
            limiter.permits_per_second()
        );

        let mut stats = RedriveStats::default();
        loop {
            let batch = self.client.receive_batch(self.source).await?;
            if batch.is_empty() {
                break;
            }

            for message in &batch {
                stats.messages += 1;
                if message.first_received()? > run_start {
                    stats.skipped += 1;
                    continue;
                }

                limiter.acquire().await;
                let forward = self
                    .filter
                    .forward(&message.body)
                    .map_err(|e| rejected(message, e))?;

                if forward {
                    self.client.send_body(self.target, &message.body).await?;
                    stats.created += 1;
                    info!("Forwarding({}): {}", stats.messages, message.body);
                } else {
                    stats.dropped += 1;
                    info!("Dropping({}): {}", stats.messages, message.body);
                }

                self.client
                    .delete_by_receipt(self.source, &message.receipt_handle)
                    .await?;
                stats.deleted += 1;
            }

            if stats.skipped > max_skips {
                warn!(
                    "Skipped {} messages produced after the run started (limit {max_skips}), stopping",
                    stats.skipped
                );
                break;
            }
        }

        let report = RedriveReport::Completed {
            source: self.source.to_owned(),
            target: self.target.to_owned(),
            elapsed: started.elapsed(),
            stats,
        };
        info!("{report}");
        Ok(report)
    }
}
