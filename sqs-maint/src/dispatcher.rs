//! Runs one task per invocation, chosen by the `command` parameter.
//!
//! Problems with the parameters are not errors: they are logged and handed back as the
//! invocation's result, without any call to the queue service. Errors are reserved for failures
//! while a task runs.

use indexmap::{IndexMap, IndexSet};
use tracing::{error, info};

use crate::{
    tasks::{PurgeReport, PurgeTask, ReadTask, RedriveReport, RedriveTask},
    AlwaysForward, Error, FilterKind, FreshnessFilter, GroupByWebhookUrl, MessageFilter,
    Parameters, Plan, QueueClient, Result,
};

pub async fn dispatch<C: QueueClient>(client: &C, params: &Parameters) -> Result<String> {
    match params.plan() {
        Ok(plan) => run(client, plan).await,
        Err(e) => {
            error!("{e}");
            Ok(e.to_string())
        }
    }
}

/// Runs the planned task. Failures are logged before they are returned.
pub async fn run<C: QueueClient>(client: &C, plan: Plan) -> Result<String> {
    execute(client, plan).await.inspect_err(|e| error!("{e}"))
}

async fn execute<C: QueueClient>(client: &C, plan: Plan) -> Result<String> {
    match plan {
        Plan::Redrive {
            from_queue,
            to_queue,
            rate,
            filter,
        } => {
            // Checked before name resolution so that nothing reaches the service.
            if from_queue == to_queue {
                let report = RedriveReport::SameQueue;
                error!("{report}");
                return Ok(report.to_string());
            }

            let source = client.resolve_queue_url(&from_queue).await?;
            let target = client.resolve_queue_url(&to_queue).await?;
            let filter = build_filter(filter);

            let report = RedriveTask::new(client, &source, &target, &*filter)
                .with_rate(rate)
                .run()
                .await?;
            Ok(report.to_string())
        }
        Plan::Read { queue } => {
            let url = client.resolve_queue_url(&queue).await?;
            let mut grouping = GroupByWebhookUrl::new();

            let report = ReadTask::new(client, &url, &mut grouping).run().await?;
            log_groups(grouping.groups());
            Ok(report.to_string())
        }
        Plan::Purge { queue } => {
            let url = match client.resolve_queue_url(&queue).await {
                Ok(url) => url,
                Err(Error::QueueNotFound(_)) => {
                    let report = PurgeReport::QueueNotFound { queue };
                    error!("{report}");
                    return Ok(report.to_string());
                }
                Err(e) => return Err(e),
            };

            let report = PurgeTask::new(client, &url).run().await?;
            Ok(report.to_string())
        }
    }
}

fn build_filter(kind: FilterKind) -> Box<dyn MessageFilter> {
    match kind {
        FilterKind::Freshness => Box::new(FreshnessFilter::new()),
        FilterKind::Always => Box::new(AlwaysForward),
    }
}

fn log_groups(groups: &IndexMap<String, IndexSet<String>>) {
    info!(
        "{} webhooks found:\n{}",
        groups.len(),
        groups.keys().map(String::as_str).collect::<Vec<_>>().join("\n")
    );
    for (url, events) in groups {
        info!("All messages for webhook {url}");
        for event in events {
            info!("{event}");
        }
    }
}
