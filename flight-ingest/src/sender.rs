use crate::batch::{AppendRejected, TransportBatch};
use crate::traits::StreamSink;
use crate::types::{IngestError, RawStateVector, SendReport};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Packs state vectors into size-bounded batches and sends them.
///
/// Packing is greedy and left to right: a batch is sealed as soon as the
/// next record does not fit, and that record opens the next batch.
pub struct BatchSender {
    sink: Arc<dyn StreamSink>,
}

impl BatchSender {
    pub fn new(sink: Arc<dyn StreamSink>) -> Self {
        Self { sink }
    }

    pub async fn send_batch(&self, records: &[RawStateVector]) -> SendReport {
        let limit = self.sink.max_batch_bytes();
        let mut report = SendReport {
            records_submitted: records.len(),
            ..Default::default()
        };
        let mut batch = TransportBatch::new(limit);

        for (index, record) in records.iter().enumerate() {
            let payload = match serde_json::to_string(record) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Record {} could not be serialized, skipping: {}", index, e);
                    report.records_skipped += 1;
                    continue;
                }
            };

            let payload = match batch.try_append(payload) {
                Ok(()) => continue,
                Err(AppendRejected { payload, .. }) if !batch.is_empty() => payload,
                Err(rejected) => {
                    self.skip_oversized(index, &rejected, &mut report);
                    continue;
                }
            };

            let full = std::mem::replace(&mut batch, TransportBatch::new(limit));
            self.seal(full, &mut report).await;

            if let Err(rejected) = batch.try_append(payload) {
                self.skip_oversized(index, &rejected, &mut report);
            }
        }

        if !batch.is_empty() {
            self.seal(batch, &mut report).await;
        }

        info!(
            "Sent {}/{} records in {} batches to {} ({} failed, {} skipped)",
            report.records_sent,
            report.records_submitted,
            report.batches_attempted,
            self.sink.sink_name(),
            report.batches_failed,
            report.records_skipped
        );
        report
    }

    async fn seal(&self, batch: TransportBatch, report: &mut SendReport) {
        report.batches_attempted += 1;
        match self.sink.send_batch(&batch).await {
            Ok(()) => report.records_sent += batch.len(),
            Err(e) => {
                error!(
                    "Batch {} of {} records failed: {}",
                    report.batches_attempted,
                    batch.len(),
                    e
                );
                report.batches_failed += 1;
            }
        }
    }

    fn skip_oversized(&self, index: usize, rejected: &AppendRejected, report: &mut SendReport) {
        let e = IngestError::OversizedRecord {
            size: rejected.required,
            limit: rejected.limit,
        };
        warn!("Record {} skipped: {}", index, e);
        report.records_skipped += 1;
    }
}
