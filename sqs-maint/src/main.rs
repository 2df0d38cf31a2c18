use anyhow::Context as _;
use clap::Parser;
use sqs_maint::{
    backends::{sqs::DEFAULT_REGION, SqsBackend, SqsConfig},
    dispatcher, Parameters,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Bulk message maintenance for SQS queues.
///
/// Every option can also be given through the environment variable named in brackets, which is
/// how scheduled invocations pass them.
#[derive(Debug, Parser)]
#[command(name = "sqs-maint", version, long_about = None)]
struct Cli {
    /// REDRIVE, READ or PURGE (case-insensitive)
    #[arg(long, env = "command")]
    command: Option<String>,

    /// Queue to move messages from (REDRIVE), as a name or URL
    #[arg(long, env = "fromQueue")]
    from_queue: Option<String>,

    /// Queue to move messages to (REDRIVE), as a name or URL
    #[arg(long, env = "toQueue")]
    to_queue: Option<String>,

    /// Queue to read or purge (READ, PURGE), as a name or URL
    #[arg(long, env = "queue")]
    queue: Option<String>,

    /// Redrive rate in requests per second
    #[arg(long, env = "rate")]
    rate: Option<String>,

    /// Redrive filter: `freshness` or `always`
    #[arg(long, env = "filter")]
    filter: Option<String>,

    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// Endpoint override, e.g. http://localhost:9324 for ElasticMQ
    #[arg(long, env = "endpoint")]
    endpoint: Option<String>,
}

impl Cli {
    fn sqs_config(&self) -> SqsConfig {
        SqsConfig {
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
        }
    }

    fn into_parameters(self) -> Parameters {
        Parameters {
            command: self.command,
            from_queue: self.from_queue,
            to_queue: self.to_queue,
            queue: self.queue,
            rate: self.rate,
            filter: self.filter,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_env("SQS_MAINT_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let client = SqsBackend::new(cli.sqs_config()).await;

    let summary = dispatcher::dispatch(&client, &cli.into_parameters())
        .await
        .context("invocation failed")?;
    println!("{summary}");

    Ok(())
}
