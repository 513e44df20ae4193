use crate::sender::BatchSender;
use crate::traits::SnapshotSource;
use crate::types::{FetchOutcome, SendReport};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What one fetch-then-send cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Sent(SendReport),
    /// The snapshot had no states.
    NoData,
    FetchFailed(String),
}

/// Drives the fetcher and sender on a fixed interval.
///
/// Cycles never overlap: a slow send delays the next fetch. A failing cycle
/// is logged and the loop carries on.
pub struct PollLoop {
    source: Arc<dyn SnapshotSource>,
    sender: BatchSender,
    interval: Duration,
}

impl PollLoop {
    pub fn new(source: Arc<dyn SnapshotSource>, sender: BatchSender, interval: Duration) -> Self {
        Self {
            source,
            sender,
            interval,
        }
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        match self.source.fetch().await {
            FetchOutcome::Failed(reason) => {
                warn!("Fetch from {} failed: {}", self.source.source_name(), reason);
                CycleOutcome::FetchFailed(reason)
            }
            outcome => match outcome.into_states() {
                Some(states) => {
                    let mut report = self.sender.send_batch(&states.vectors).await;
                    report.records_submitted += states.malformed;
                    report.records_skipped += states.malformed;
                    CycleOutcome::Sent(report)
                }
                None => {
                    warn!("Snapshot from {} was empty", self.source.source_name());
                    CycleOutcome::NoData
                }
            },
        }
    }

    /// Run until `shutdown` is cancelled. Cancellation is observed between
    /// cycles and while sleeping, never in the middle of a send. Returns the
    /// number of completed cycles.
    pub async fn run(&self, shutdown: CancellationToken) -> u64 {
        info!(
            "Starting poll loop against {} every {}s",
            self.source.source_name(),
            self.interval.as_secs()
        );
        let mut cycles = 0u64;

        loop {
            if shutdown.is_cancelled() {
                info!("Shutdown requested before cycle {}", cycles + 1);
                break;
            }

            let outcome = self.run_cycle().await;
            cycles += 1;
            match &outcome {
                CycleOutcome::Sent(report) if report.is_clean() => {
                    info!("Cycle {} sent {} records", cycles, report.records_sent)
                }
                CycleOutcome::Sent(report) => warn!(
                    "Cycle {} sent {} records, {} batches failed, {} records skipped",
                    cycles, report.records_sent, report.batches_failed, report.records_skipped
                ),
                CycleOutcome::NoData | CycleOutcome::FetchFailed(_) => {
                    info!("Cycle {} had nothing to send", cycles)
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested during poll wait");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Poll loop stopped after {} cycles", cycles);
        cycles
    }
}
