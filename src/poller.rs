use std::fmt;

use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::feed::{FeedSource, decode};
use crate::notifier::{LogLevel, LogSink};
use crate::store::{Provisioned, TableStore, ensure_table, put_record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Fetching,
    Decoding,
    Provisioning,
    Writing,
    Sleeping,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleStage::Fetching => "fetching",
            CycleStage::Decoding => "decoding",
            CycleStage::Provisioning => "provisioning",
            CycleStage::Writing => "writing",
            CycleStage::Sleeping => "sleeping",
        };
        f.write_str(s)
    }
}

/// Outcome of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub polled: usize,
    pub written: usize,
    pub failed: usize,
    pub table: Provisioned,
}

/// Fetch → decode → provision → write, then sleep, forever.
///
/// The poller is the only place that decides what a failure means: fetch,
/// decode and provisioning failures end the run, a failed put only costs
/// that one record, and a sink that cannot be reached ends the run whatever
/// stage it happened in.
pub struct Poller<F, S, L> {
    source: F,
    store: S,
    sink: L,
    table: String,
    interval: Duration,
}

impl<F, S, L> Poller<F, S, L>
where
    F: FeedSource,
    S: TableStore,
    L: LogSink,
{
    pub fn new(source: F, store: S, sink: L, table: impl Into<String>, interval: Duration) -> Self {
        Self {
            source,
            store,
            sink,
            table: table.into(),
            interval,
        }
    }

    #[cfg(test)]
    fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    fn sink(&self) -> &L {
        &self.sink
    }

    /// Runs cycles until one fails fatally. Never returns `Ok`.
    pub async fn run(&self) -> Result<(), Error> {
        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            info!("🚀 Cycle {} starting", cycle);

            let report = self.run_cycle().await?;
            info!(
                "✅ Cycle {} done: {} polled, {} written, {} failed. Next poll in {}s",
                cycle,
                report.polled,
                report.written,
                report.failed,
                self.interval.as_secs()
            );

            debug!("Stage: {}", CycleStage::Sleeping);
            sleep(self.interval).await;
        }
    }

    /// One full pass over the pipeline.
    pub async fn run_cycle(&self) -> Result<CycleReport, Error> {
        let bytes = match self.source.fetch().await {
            Ok(b) => b,
            Err(e) => return Err(self.fail(CycleStage::Fetching, e.into()).await),
        };

        let records = match decode(&bytes) {
            Ok(r) => r,
            Err(e) => return Err(self.fail(CycleStage::Decoding, e.into()).await),
        };

        for record in &records {
            debug!("{}", record);
        }
        self.report(
            CycleStage::Decoding,
            LogLevel::Info,
            &format!("Data polled. {} assets", records.len()),
        )
        .await?;

        let provisioned = match ensure_table(&self.store, &self.table).await {
            Ok(p) => p,
            Err(e) => return Err(self.fail(CycleStage::Provisioning, e.into()).await),
        };

        let mut written = 0;
        let mut failed = 0;
        for record in &records {
            match put_record(&self.store, record, &self.table).await {
                Ok(()) => written += 1,
                Err(e) => {
                    failed += 1;
                    self.report(CycleStage::Writing, LogLevel::Error, &e.to_string()).await?;
                }
            }
        }

        self.report(
            CycleStage::Writing,
            LogLevel::Info,
            &format!("Stored {} of {} assets in {} ({} failed)", written, records.len(), self.table, failed),
        )
        .await?;

        Ok(CycleReport {
            polled: records.len(),
            written,
            failed,
            table: provisioned,
        })
    }

    async fn report(&self, stage: CycleStage, level: LogLevel, message: &str) -> Result<(), Error> {
        self.sink
            .send_log(level, message)
            .await
            .map_err(|source| Error::LogDelivery { stage, source })
    }

    /// Emits the single error event for a fatal stage failure and hands back
    /// the error to return. A sink failure here replaces the original error.
    async fn fail(&self, stage: CycleStage, err: Error) -> Error {
        let message = format!("{} failed: {}", stage, err);
        match self.report(stage, LogLevel::Error, &message).await {
            Ok(()) => err,
            Err(delivery) => {
                warn!("❌ Could not report '{}'", message);
                delivery
            }
        }
    }
}
