//! Outbound report sinks

use crate::error::{VaultError, VaultResult};
use crate::vault::projector::OrderReportEvent;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::Sender;

pub trait ReportSink {
    fn produce(&mut self, event: &OrderReportEvent) -> VaultResult<()>;
}

/// Sink publishing reports into an in-process channel
pub struct ChannelSink {
    sender: Sender<OrderReportEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<OrderReportEvent>) -> Self {
        Self { sender }
    }
}

impl ReportSink for ChannelSink {
    fn produce(&mut self, event: &OrderReportEvent) -> VaultResult<()> {
        self.sender
            .send(event.clone())
            .map_err(|_| VaultError::transport("report channel is closed"))
    }
}

/// Sink appending one JSON document per line to a file
pub struct JsonLinesSink {
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    pub fn open<P: AsRef<Path>>(path: P) -> VaultResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                VaultError::transport(format!("failed to open {}: {}", path.display(), e))
            })?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl ReportSink for JsonLinesSink {
    fn produce(&mut self, event: &OrderReportEvent) -> VaultResult<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer
            .write_all(b"\n")
            .and_then(|_| self.writer.flush())
            .map_err(|e| VaultError::transport(format!("failed to write report: {}", e)))
    }
}
