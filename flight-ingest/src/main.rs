use anyhow::Context;
use clap::{Parser, Subcommand};
use flight_ingest::aggregator::describe;
use flight_ingest::signal::cancel_on_ctrl_c;
use flight_ingest::{
    BatchSender, BlobRecordLoader, CycleOutcome, EventHubSink, FetchConfig, FlightSummary,
    LoadOptions, MemorySink, PollConfig, PollLoop, RecordAggregator, SinkConfig, SnapshotFetcher,
    StorageConfig, StreamSink,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Parser)]
#[command(name = "flight-ingest", version, about = "Flight telemetry ingestion and reconstruction")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the live API and forward every snapshot to the stream
    Stream {
        #[command(flatten)]
        fetch: FetchConfig,
        #[command(flatten)]
        sink: SinkConfig,
        #[command(flatten)]
        poll: PollConfig,
        /// Keep batches in memory instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch one snapshot and send it
    SendOnce {
        #[command(flatten)]
        fetch: FetchConfig,
        #[command(flatten)]
        sink: SinkConfig,
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the newest persisted records as JSON
    Records {
        #[command(flatten)]
        storage: StorageConfig,
        #[command(flatten)]
        load: LoadOptions,
    },
    /// Print summary statistics over the newest persisted records
    Summary {
        #[command(flatten)]
        storage: StorageConfig,
        #[command(flatten)]
        load: LoadOptions,
    },
}

fn build_sink(config: &SinkConfig, dry_run: bool) -> anyhow::Result<Arc<dyn StreamSink>> {
    if dry_run {
        warn!("Dry run: batches are kept in memory and discarded");
        return Ok(Arc::new(MemorySink::new(config.max_batch_bytes)));
    }
    let sink = EventHubSink::new(config).context("Failed to configure the streaming sink")?;
    Ok(Arc::new(sink))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Stream {
            fetch,
            sink,
            poll,
            dry_run,
        } => {
            let fetcher = SnapshotFetcher::new(fetch).context("Failed to configure the fetcher")?;
            let sender = BatchSender::new(build_sink(&sink, dry_run)?);
            let poll_loop = PollLoop::new(Arc::new(fetcher), sender, poll.interval());

            let shutdown = CancellationToken::new();
            tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));

            poll_loop.run(shutdown).await;
        }
        Command::SendOnce {
            fetch,
            sink,
            dry_run,
        } => {
            let fetcher = SnapshotFetcher::new(fetch).context("Failed to configure the fetcher")?;
            let sender = BatchSender::new(build_sink(&sink, dry_run)?);
            let poll_loop = PollLoop::new(Arc::new(fetcher), sender, PollConfig::default().interval());

            match poll_loop.run_cycle().await {
                CycleOutcome::Sent(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                CycleOutcome::NoData => println!("No data: the snapshot was empty"),
                CycleOutcome::FetchFailed(reason) => println!("No data: {}", reason),
            }
        }
        Command::Records { storage, load } => {
            let loader = BlobRecordLoader::from_config(&storage);
            let records = loader.load_with(load).await;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Summary { storage, load } => {
            let loader = BlobRecordLoader::from_config(&storage);
            let records = loader.load_with(load).await;
            let summary = RecordAggregator::summarize(&records);
            match &summary {
                FlightSummary::Stats(_) => println!("{}", serde_json::to_string_pretty(&summary)?),
                FlightSummary::InsufficientData { .. } => println!("{}", describe(&summary)),
            }
        }
    }

    Ok(())
}
