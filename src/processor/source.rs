//! Inbound event sources
//!
//! A source hands out raw messages and is told when each one has been fully
//! processed. Messages consumed but never acknowledged are handed out again
//! after `rewind`, giving at-least-once delivery.

use crate::error::{VaultError, VaultResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};

/// A raw message pulled from a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMessage {
    /// Source-specific position used to acknowledge this message
    pub offset: u64,
    /// Raw message bytes; decoding, including UTF-8 validation, happens downstream
    pub body: Vec<u8>,
}

/// Envelope wrapping every inbound order event
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEvent {
    #[serde(default)]
    pub object_id: Option<Value>,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub sent_dttm: Option<String>,
    pub payload: Value,
}

impl InboundEvent {
    /// Decode an envelope from the raw message text.
    pub fn decode(body: &[u8]) -> VaultResult<Self> {
        let text = std::str::from_utf8(body)
            .map_err(|e| VaultError::malformed_payload(format!("message is not UTF-8: {}", e)))?;
        let value: Value = serde_json::from_str(text)
            .map_err(|e| VaultError::malformed_payload(format!("invalid JSON: {}", e)))?;
        if !value.is_object() {
            return Err(VaultError::malformed_payload("event envelope is not an object"));
        }
        let event: InboundEvent = serde_json::from_value(value)
            .map_err(|e| VaultError::malformed_payload(e.to_string()))?;
        if event.payload.is_null() {
            return Err(VaultError::malformed_payload("event envelope has a null payload"));
        }
        Ok(event)
    }
}

pub trait EventSource {
    /// Pull the next message; `None` means nothing is available right now.
    fn consume(&mut self) -> VaultResult<Option<SourceMessage>>;

    /// Mark `message` as fully processed.
    fn acknowledge(&mut self, message: &SourceMessage) -> VaultResult<()>;

    /// Return to the last acknowledged position so unacknowledged messages are
    /// delivered again.
    fn rewind(&mut self) -> VaultResult<()> {
        Ok(())
    }
}

/// Source fed through an in-process channel
pub struct ChannelSource {
    receiver: Receiver<String>,
    redelivery: VecDeque<SourceMessage>,
    in_flight: VecDeque<SourceMessage>,
    next_offset: u64,
}

impl ChannelSource {
    pub fn new(receiver: Receiver<String>) -> Self {
        Self {
            receiver,
            redelivery: VecDeque::new(),
            in_flight: VecDeque::new(),
            next_offset: 0,
        }
    }

    /// Messages handed out and not yet acknowledged
    pub fn unacknowledged(&self) -> impl Iterator<Item = &SourceMessage> {
        self.in_flight.iter()
    }
}

impl EventSource for ChannelSource {
    fn consume(&mut self) -> VaultResult<Option<SourceMessage>> {
        let message = match self.redelivery.pop_front() {
            Some(message) => message,
            None => match self.receiver.try_recv() {
                Ok(body) => {
                    let message = SourceMessage {
                        offset: self.next_offset,
                        body: body.into_bytes(),
                    };
                    self.next_offset += 1;
                    message
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(None),
            },
        };
        self.in_flight.push_back(message.clone());
        Ok(Some(message))
    }

    fn acknowledge(&mut self, message: &SourceMessage) -> VaultResult<()> {
        self.in_flight.retain(|m| m.offset != message.offset);
        Ok(())
    }

    fn rewind(&mut self) -> VaultResult<()> {
        while let Some(message) = self.in_flight.pop_back() {
            self.redelivery.push_front(message);
        }
        Ok(())
    }
}

/// Source reading newline-delimited JSON from a file.
///
/// The acknowledged byte offset is persisted next to the input as
/// `<input>.offset`, so a restarted process resumes after the last
/// acknowledged line. Acknowledgements are expected in consumption order.
pub struct JsonLinesSource {
    reader: BufReader<File>,
    offset_path: PathBuf,
    position: u64,
    committed: u64,
}

impl JsonLinesSource {
    pub fn open<P: AsRef<Path>>(path: P) -> VaultResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            VaultError::transport(format!("failed to open {}: {}", path.display(), e))
        })?;
        let offset_path = offset_path_for(path);
        let committed = read_committed(&offset_path)?;

        let mut source = Self {
            reader: BufReader::new(file),
            offset_path,
            position: committed,
            committed,
        };
        source.seek(committed)?;
        Ok(source)
    }

    /// Byte offset just past the last acknowledged line
    pub fn committed(&self) -> u64 {
        self.committed
    }

    fn seek(&mut self, position: u64) -> VaultResult<()> {
        self.reader
            .seek(SeekFrom::Start(position))
            .map_err(|e| VaultError::transport(format!("failed to seek input: {}", e)))?;
        self.position = position;
        Ok(())
    }
}

impl EventSource for JsonLinesSource {
    fn consume(&mut self) -> VaultResult<Option<SourceMessage>> {
        loop {
            let start = self.position;
            let mut line = Vec::new();
            let read = self
                .reader
                .read_until(b'\n', &mut line)
                .map_err(|e| VaultError::transport(format!("failed to read input: {}", e)))?;
            if read == 0 {
                return Ok(None);
            }
            if line.last() != Some(&b'\n') {
                // Partially written line; pick it up on a later pass.
                self.seek(start)?;
                return Ok(None);
            }
            self.position = start + read as u64;

            let body = trim_line(&line);
            if body.is_empty() {
                continue;
            }
            return Ok(Some(SourceMessage {
                offset: self.position,
                body: body.to_vec(),
            }));
        }
    }

    fn acknowledge(&mut self, message: &SourceMessage) -> VaultResult<()> {
        if message.offset <= self.committed {
            return Ok(());
        }
        fs::write(&self.offset_path, message.offset.to_string()).map_err(|e| {
            VaultError::transport(format!(
                "failed to persist offset to {}: {}",
                self.offset_path.display(),
                e
            ))
        })?;
        self.committed = message.offset;
        Ok(())
    }

    fn rewind(&mut self) -> VaultResult<()> {
        let committed = self.committed;
        self.seek(committed)
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &line[start..end]
}

fn offset_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".offset");
    PathBuf::from(name)
}

fn read_committed(offset_path: &Path) -> VaultResult<u64> {
    match fs::read_to_string(offset_path) {
        Ok(content) => content.trim().parse::<u64>().map_err(|e| {
            VaultError::transport(format!(
                "invalid offset file {}: {}",
                offset_path.display(),
                e
            ))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(VaultError::transport(format!(
            "failed to read offset file {}: {}",
            offset_path.display(),
            e
        ))),
    }
}
