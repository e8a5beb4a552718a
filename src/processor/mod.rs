//! Batch orchestration
//!
//! Pulls a bounded number of events from a source and runs each one through
//! build, load, project and produce before acknowledging it.

pub mod sink;
pub mod source;

pub use sink::{ChannelSink, JsonLinesSink, ReportSink};
pub use source::{ChannelSource, EventSource, InboundEvent, JsonLinesSource, SourceMessage};

use crate::config::VaultConfig;
use crate::error::VaultResult;
use crate::vault::builder::VaultRecordBuilder;
use crate::vault::key_deriver::KeyDeriver;
use crate::vault::loader::{LoadReport, VaultLoader};
use crate::vault::projector::ReportProjector;
use crate::vault::store::VaultStore;
use crate::{log_processor_error, log_processor_info, log_processor_warn};
use chrono::Utc;

/// Outcome of one batch pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Events loaded and reported
    pub processed: usize,
    /// Malformed events acknowledged without loading
    pub skipped: usize,
    /// Store rows written across the pass
    pub rows_inserted: usize,
    /// Rows that were already present or unchanged
    pub rows_existing: usize,
}

impl BatchSummary {
    fn record(&mut self, report: &LoadReport) {
        self.processed += 1;
        self.rows_inserted += report.inserted();
        self.rows_existing += report.skipped();
    }
}

pub struct OrderVaultProcessor<S, Src, Snk>
where
    S: VaultStore,
    Src: EventSource,
    Snk: ReportSink,
{
    builder: VaultRecordBuilder,
    loader: VaultLoader<S>,
    projector: ReportProjector,
    source: Src,
    sink: Snk,
    batch_size: usize,
}

impl<S, Src, Snk> OrderVaultProcessor<S, Src, Snk>
where
    S: VaultStore,
    Src: EventSource,
    Snk: ReportSink,
{
    pub fn new(
        builder: VaultRecordBuilder,
        loader: VaultLoader<S>,
        source: Src,
        sink: Snk,
        batch_size: usize,
    ) -> Self {
        Self {
            builder,
            loader,
            projector: ReportProjector::new(),
            source,
            sink,
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(config: &VaultConfig, store: S, source: Src, sink: Snk) -> Self {
        let deriver = KeyDeriver::from_config_value(&config.namespace);
        let builder = VaultRecordBuilder::new(deriver, config.load_source.clone());
        let loader = VaultLoader::new(store, config.satellite_mode);
        Self::new(builder, loader, source, sink, config.batch_size)
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    pub fn sink(&self) -> &Snk {
        &self.sink
    }

    pub fn store(&self) -> &S {
        self.loader.store()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Run one batch pass of at most `batch_size` events.
    ///
    /// An empty pull ends the pass normally. Malformed events are acknowledged
    /// and counted as skipped. Any other failure stops the pass and is
    /// returned with the failing event left unacknowledged.
    pub fn run_batch(&mut self) -> VaultResult<BatchSummary> {
        log_processor_info!("{}: START", Utc::now());
        self.source.rewind()?;

        let mut summary = BatchSummary::default();
        for _ in 0..self.batch_size {
            let message = match self.source.consume()? {
                Some(message) => message,
                None => {
                    log_processor_info!("{}: NO messages. Quitting.", Utc::now());
                    break;
                }
            };

            match self.process_message(&message) {
                Ok(report) => {
                    self.source.acknowledge(&message)?;
                    summary.record(&report);
                }
                Err(e) if e.is_skippable() => {
                    log_processor_warn!("Skipping message at offset {}: {}", message.offset, e);
                    self.source.acknowledge(&message)?;
                    summary.skipped += 1;
                }
                Err(e) => {
                    log_processor_error!(
                        "Halting batch at offset {} (retryable: {}): {}",
                        message.offset,
                        e.is_retryable(),
                        e
                    );
                    return Err(e);
                }
            }
        }

        log_processor_info!(
            "{}: FINISH ({} processed, {} skipped, {} rows inserted, {} rows existing)",
            Utc::now(),
            summary.processed,
            summary.skipped,
            summary.rows_inserted,
            summary.rows_existing
        );
        Ok(summary)
    }

    fn process_message(&mut self, message: &SourceMessage) -> VaultResult<LoadReport> {
        let event = InboundEvent::decode(&message.body)?;
        let set = self.builder.build(&event.payload, Utc::now())?;

        log_processor_info!("{}: PROCESSING order {}", Utc::now(), set.order_pk());
        let report = self.loader.load(&set)?;

        let outbound = self.projector.project(&set, Utc::now())?;
        log_processor_info!("{}: PRODUCING report {}", Utc::now(), outbound.object_id);
        self.sink.produce(&outbound)?;
        Ok(report)
    }
}
