//! Deletes every message in a queue.

use std::fmt;

use tracing::{error, info};

use crate::{Error, QueueClient, Result};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PurgeReport {
    Purged { queue: String },
    QueueNotFound { queue: String },
}

impl fmt::Display for PurgeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Purged { queue } => write!(f, "Purge completed successfully. {queue}"),
            Self::QueueNotFound { queue } => {
                write!(f, "Purge failed. Queue does not exist. {queue}")
            }
        }
    }
}

pub struct PurgeTask<'a, C> {
    client: &'a C,
    queue: &'a str,
}

impl<'a, C: QueueClient> PurgeTask<'a, C> {
    pub fn new(client: &'a C, queue: &'a str) -> Self {
        Self { client, queue }
    }

    pub async fn run(self) -> Result<PurgeReport> {
        let queue = self.queue.to_owned();
        match self.client.purge(self.queue).await {
            Ok(()) => {
                let report = PurgeReport::Purged { queue };
                info!("{report}");
                Ok(report)
            }
            Err(Error::QueueNotFound(_)) => {
                let report = PurgeReport::QueueNotFound { queue };
                error!("{report}");
                Ok(report)
            }
            Err(e) => Err(e),
        }
    }
}
