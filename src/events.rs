//! JSONL change feed.
//!
//! Each persisted change can be mirrored as one JSON line to stdout or to an
//! append-only file (`--events <path|->`). Lines carry the reducer's
//! [`Change`] verbatim under `data`.

use std::fs::OpenOptions;
use std::io::{self, LineWriter, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::state::Change;

pub const EVENT_SCHEMA_VERSION: &str = "kogura.event.v1";

/// Where `--events` sends the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    /// `-` is stdout, anything else a path; blank means no feed.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") => None,
            Some("-") => Some(Self::Stdout),
            Some(path) => Some(Self::File(PathBuf::from(path))),
        }
    }

    pub fn open(&self) -> Result<EventSink> {
        let writer: Box<dyn Write + Send> = match self {
            Self::Stdout => Box::new(io::stdout()),
            Self::File(path) => Box::new(OpenOptions::new().create(true).append(true).open(path)?),
        };
        Ok(EventSink {
            writer: LineWriter::new(writer),
            emitted: 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskAdded,
    TaskEdited,
    TaskDeleted,
    TaskDoneToggled,
    TaskMoved,
    CollapseToggled,
}

impl EventKind {
    pub fn of(change: &Change) -> Option<Self> {
        Some(match change {
            Change::TaskAdded { .. } => Self::TaskAdded,
            Change::TaskEdited { .. } => Self::TaskEdited,
            Change::TaskDeleted { .. } => Self::TaskDeleted,
            Change::TaskDoneToggled { .. } => Self::TaskDoneToggled,
            Change::TaskMoved { .. } => Self::TaskMoved,
            Change::CollapseToggled { .. } => Self::CollapseToggled,
            Change::Unchanged => return None,
        })
    }
}

/// One line of the feed.
#[derive(Debug, Clone, Serialize)]
pub struct Event<'a> {
    pub schema_version: &'static str,
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    pub data: &'a Change,
}

impl<'a> Event<'a> {
    /// `None` for [`Change::Unchanged`].
    pub fn from_change(change: &'a Change, timestamp: DateTime<Utc>) -> Option<Self> {
        EventKind::of(change).map(|event| Self {
            schema_version: EVENT_SCHEMA_VERSION,
            event,
            timestamp,
            data: change,
        })
    }
}

/// An open feed. Every event is flushed as a complete line.
pub struct EventSink {
    writer: LineWriter<Box<dyn Write + Send>>,
    emitted: usize,
}

impl EventSink {
    pub fn emit(&mut self, event: &Event<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.emitted += 1;
        tracing::debug!(event = ?event.event, emitted = self.emitted, "event written");
        Ok(())
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("emitted", &self.emitted)
            .finish_non_exhaustive()
    }
}
