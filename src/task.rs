//! Task records for kogura.
//!
//! A task is created from an interpreter draft, edited in place, and stored
//! as one element of the `tasks` JSON array. The stored form is read back
//! leniently so that lists written by earlier versions (local `datetime`
//! strings, `text`/`duration` field names) still load.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::schedule::{parse_local_datetime, to_utc};

const SHORT_ID_MIN_LEN: usize = 4;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// The ordered task list. Order only matters inside a day bucket.
pub type TaskCollection = Vec<TaskRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Something to finish, possibly by a deadline.
    Task,
    /// Happens at a specific time.
    Schedule,
    /// A light nudge, possibly at a later date.
    Reminder,
    Other,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Task,
        TaskType::Schedule,
        TaskType::Reminder,
        TaskType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Task => "task",
            TaskType::Schedule => "schedule",
            TaskType::Reminder => "reminder",
            TaskType::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        TaskType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        TaskType::parse(value).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "unknown task type '{value}' (expected task|schedule|reminder|other)"
            ))
        })
    }
}

/// Structured interpreter output, before it becomes a record.
///
/// `datetime` is wall-clock time in the configured zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub datetime: NaiveDateTime,
    pub content: String,
    pub duration: Option<String>,
    pub task_type: TaskType,
    pub deadline: Option<NaiveDate>,
    pub remind_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub raw_input: String,
    pub content: String,
    pub datetime: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_text: Option<String>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remind_at: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub done: bool,
}

/// A type-specific field set on a record of another type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFieldMismatch {
    DeadlineOnNonTask(TaskType),
    RemindAtOnNonReminder(TaskType),
}

impl fmt::Display for TypeFieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeFieldMismatch::DeadlineOnNonTask(kind) => {
                write!(f, "deadline set on a {kind} record")
            }
            TypeFieldMismatch::RemindAtOnNonReminder(kind) => {
                write!(f, "remindAt set on a {kind} record")
            }
        }
    }
}

/// Field changes for an edit. `Some("")` clears the optional text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub content: Option<String>,
    pub datetime: Option<NaiveDateTime>,
    pub task_type: Option<TaskType>,
    pub duration: Option<String>,
    pub memo: Option<String>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.datetime.is_none()
            && self.task_type.is_none()
            && self.duration.is_none()
            && self.memo.is_none()
    }
}

impl TaskRecord {
    /// Build a fresh record from a validated draft.
    pub fn from_draft(
        id: impl Into<String>,
        raw_input: impl Into<String>,
        draft: TaskDraft,
        zone: FixedOffset,
    ) -> Self {
        let record = Self {
            id: id.into(),
            raw_input: raw_input.into(),
            content: draft.content,
            datetime: to_utc(draft.datetime, zone),
            duration_text: non_empty(draft.duration),
            task_type: draft.task_type,
            deadline: draft.deadline,
            remind_at: draft.remind_at,
            memo: None,
            done: false,
        };
        record.check_type_fields();
        record
    }

    /// Rebuild a record from its stored form.
    pub fn from_persisted(stored: StoredTask, zone: FixedOffset) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidStoredTask {
            id: stored.id.clone(),
            reason,
        };

        if stored.id.trim().is_empty() {
            return Err(invalid("empty id".to_string()));
        }

        let datetime = match DateTime::parse_from_rfc3339(stored.datetime.trim()) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(_) => parse_local_datetime(&stored.datetime)
                .map(|local| to_utc(local, zone))
                .ok_or_else(|| invalid(format!("bad datetime '{}'", stored.datetime)))?,
        };

        let task_type = TaskType::parse(&stored.task_type).unwrap_or_else(|| {
            tracing::warn!(
                task_id = %stored.id,
                stored_type = %stored.task_type,
                "unknown task type in store; treating as other"
            );
            TaskType::Other
        });

        let deadline = parse_stored_date(stored.deadline.as_deref())
            .map_err(|raw| invalid(format!("bad deadline '{raw}'")))?;
        let remind_at = parse_stored_date(stored.remind_at.as_deref())
            .map_err(|raw| invalid(format!("bad remindAt '{raw}'")))?;

        let record = Self {
            id: stored.id.clone(),
            raw_input: stored.raw_input,
            content: stored.content,
            datetime,
            duration_text: non_empty(stored.duration_text),
            task_type,
            deadline,
            remind_at,
            memo: non_empty(stored.memo),
            done: stored.done,
        };
        record.check_type_fields();
        Ok(record)
    }

    pub fn type_field_mismatches(&self) -> Vec<TypeFieldMismatch> {
        let mut found = Vec::new();
        if self.deadline.is_some() && self.task_type != TaskType::Task {
            found.push(TypeFieldMismatch::DeadlineOnNonTask(self.task_type));
        }
        if self.remind_at.is_some() && self.task_type != TaskType::Reminder {
            found.push(TypeFieldMismatch::RemindAtOnNonReminder(self.task_type));
        }
        found
    }

    /// Advisory check of the type-specific fields. Logs each mismatch and
    /// returns whether the record is consistent; never rejects.
    pub fn check_type_fields(&self) -> bool {
        let mismatches = self.type_field_mismatches();
        for mismatch in &mismatches {
            tracing::warn!(task_id = %self.id, %mismatch, "task type field mismatch");
        }
        mismatches.is_empty()
    }

    /// Text to show for the task; falls back to what the user typed.
    pub fn display_text(&self) -> &str {
        if self.content.trim().is_empty() {
            &self.raw_input
        } else {
            &self.content
        }
    }

    pub fn toggle_done(&mut self) {
        self.done = !self.done;
    }

    /// Apply an edit. Returns whether anything changed.
    pub fn apply_patch(&mut self, patch: TaskPatch, zone: FixedOffset) -> bool {
        let before = self.clone();

        if let Some(content) = patch.content {
            self.content = content.trim().to_string();
        }
        if let Some(local) = patch.datetime {
            self.datetime = to_utc(local, zone);
        }
        if let Some(task_type) = patch.task_type {
            self.set_type(task_type);
        }
        if let Some(duration) = patch.duration {
            self.duration_text = non_empty(Some(duration));
        }
        if let Some(memo) = patch.memo {
            self.memo = non_empty(Some(memo));
        }

        *self != before
    }

    /// Change the type, dropping fields that only belong to the old one.
    pub fn set_type(&mut self, task_type: TaskType) {
        self.task_type = task_type;
        if task_type != TaskType::Task {
            self.deadline = None;
        }
        if task_type != TaskType::Reminder {
            self.remind_at = None;
        }
    }
}

/// Stored (persisted) form of a task, accepted leniently.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTask {
    pub id: String,
    #[serde(default, alias = "text")]
    pub raw_input: String,
    #[serde(default)]
    pub content: String,
    pub datetime: String,
    #[serde(default, alias = "duration")]
    pub duration_text: Option<String>,
    #[serde(rename = "type", default = "default_stored_type")]
    pub task_type: String,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub remind_at: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub done: bool,
}

fn default_stored_type() -> String {
    TaskType::Other.as_str().to_string()
}

fn parse_stored_date(raw: Option<&str>) -> std::result::Result<Option<NaiveDate>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(Some)
            .map_err(|_| value.to_string()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Generate a new task id that is not present in `existing`.
pub fn generate_task_id(existing: &[TaskRecord]) -> String {
    loop {
        let candidate = Ulid::new().to_string().to_ascii_lowercase();
        if !existing.iter().any(|task| task.id == candidate) {
            return candidate;
        }
    }
}

/// Length of the shortest id suffix that is unique across `tasks`.
pub fn short_id_len(tasks: &[TaskRecord]) -> usize {
    let longest = tasks
        .iter()
        .map(|task| task.id.len())
        .max()
        .unwrap_or(SHORT_ID_MIN_LEN);
    let mut len = SHORT_ID_MIN_LEN;
    while len < longest {
        let mut seen = HashSet::new();
        if tasks.iter().all(|task| seen.insert(short_id(&task.id, len))) {
            return len;
        }
        len += 1;
    }
    len.max(SHORT_ID_MIN_LEN)
}

/// Trailing `len` characters of `id` (the random, distinguishing part of a ULID).
pub fn short_id(id: &str, len: usize) -> &str {
    let count = id.chars().count();
    if count <= len {
        return id;
    }
    let skip = count - len;
    match id.char_indices().nth(skip) {
        Some((idx, _)) => &id[idx..],
        None => id,
    }
}

/// Resolve a full id or an id suffix to exactly one task id.
pub fn resolve_task_id(tasks: &[TaskRecord], input: &str) -> Result<String> {
    let wanted = input.trim().to_ascii_lowercase();
    if wanted.is_empty() {
        return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
    }

    if let Some(task) = tasks
        .iter()
        .find(|task| task.id.to_ascii_lowercase() == wanted)
    {
        return Ok(task.id.clone());
    }

    let mut matches: Vec<String> = tasks
        .iter()
        .filter(|task| task.id.to_ascii_lowercase().ends_with(&wanted))
        .map(|task| task.id.clone())
        .collect();
    matches.sort();
    matches.dedup();

    match matches.len() {
        0 => Err(Error::TaskNotFound(input.trim().to_string())),
        1 => Ok(matches.remove(0)),
        _ => Err(Error::AmbiguousTaskId {
            input: input.trim().to_string(),
            candidates: matches.join(", "),
        }),
    }
}
