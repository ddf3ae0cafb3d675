//! Application state and the command reducer.
//!
//! State is two independently versioned values: the task collection and the
//! collapse overrides. `reduce` never mutates its input; it returns the next
//! state together with what changed, and bumps the version of each value it
//! touched so callers know what to persist.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::reorder::{self, MoveRequest};
use crate::schedule::{self, CollapseState, DateKey};
use crate::task::{generate_task_id, TaskCollection, TaskDraft, TaskPatch, TaskRecord};

/// A value plus a counter bumped on every replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    value: T,
    version: u64,
}

impl<T> Versioned<T> {
    pub fn new(value: T) -> Self {
        Self { value, version: 0 }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace the value and bump the version.
    pub fn replace(&mut self, value: T) {
        self.value = value;
        self.version += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub tasks: Versioned<TaskCollection>,
    pub collapse: Versioned<CollapseState>,
}

impl<T: Default> Default for Versioned<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl AppState {
    pub fn new(tasks: TaskCollection, collapse: CollapseState) -> Self {
        Self {
            tasks: Versioned::new(tasks),
            collapse: Versioned::new(collapse),
        }
    }

    pub fn find_task(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.value().iter().find(|task| task.id == id)
    }
}

/// Every user-visible mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddTask { raw_input: String, draft: TaskDraft },
    EditTask { id: String, patch: TaskPatch },
    DeleteTask { id: String },
    ToggleDone { id: String },
    MoveTask(MoveRequest),
    ToggleCollapse { date: DateKey },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddTask { .. } => "add_task",
            Command::EditTask { .. } => "edit_task",
            Command::DeleteTask { .. } => "delete_task",
            Command::ToggleDone { .. } => "toggle_done",
            Command::MoveTask(_) => "move_task",
            Command::ToggleCollapse { .. } => "toggle_collapse",
        }
    }
}

/// Zone and clock for one reduction.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub zone: FixedOffset,
    pub now: DateTime<Utc>,
}

impl Context {
    pub fn new(zone: FixedOffset, now: DateTime<Utc>) -> Self {
        Self { zone, now }
    }

    pub fn local_now(&self) -> DateTime<FixedOffset> {
        self.now.with_timezone(&self.zone)
    }
}

/// What a command did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    TaskAdded { task: TaskRecord },
    TaskEdited { task: TaskRecord },
    TaskDeleted { task: TaskRecord },
    TaskDoneToggled { id: String, done: bool },
    TaskMoved { id: String, request: MoveRequest },
    CollapseToggled { date: DateKey, collapsed: bool },
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: AppState,
    pub change: Change,
}

/// Apply one command to the state.
pub fn reduce(state: &AppState, command: Command, ctx: Context) -> Result<Transition> {
    let name = command.name();
    let mut next = state.clone();

    let change = match command {
        Command::AddTask { raw_input, draft } => {
            let mut tasks = state.tasks.value().clone();
            let id = generate_task_id(&tasks);
            let task = TaskRecord::from_draft(id, raw_input, draft, ctx.zone);
            tasks.push(task.clone());
            next.tasks.replace(tasks);
            tracing::info!(task_id = %task.id, task_type = %task.task_type, "task added");
            Change::TaskAdded { task }
        }
        Command::EditTask { id, patch } => {
            if patch.is_empty() {
                return Err(Error::InvalidArgument("nothing to edit".to_string()));
            }
            let mut tasks = state.tasks.value().clone();
            let task = find_mut(&mut tasks, &id)?;
            if task.apply_patch(patch, ctx.zone) {
                task.check_type_fields();
                let task = task.clone();
                next.tasks.replace(tasks);
                Change::TaskEdited { task }
            } else {
                Change::Unchanged
            }
        }
        Command::DeleteTask { id } => {
            let mut tasks = state.tasks.value().clone();
            let position = tasks
                .iter()
                .position(|task| task.id == id)
                .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
            let task = tasks.remove(position);
            next.tasks.replace(tasks);
            Change::TaskDeleted { task }
        }
        Command::ToggleDone { id } => {
            let mut tasks = state.tasks.value().clone();
            let task = find_mut(&mut tasks, &id)?;
            task.toggle_done();
            let done = task.done;
            next.tasks.replace(tasks);
            Change::TaskDoneToggled { id, done }
        }
        Command::MoveTask(request) => {
            let moved_id = schedule::group_by_day(state.tasks.value(), ctx.zone)
                .get(&request.source_key)
                .and_then(|bucket| bucket.get(request.source_index))
                .map(|task| task.id.clone());
            match (moved_id, reorder::move_task(state.tasks.value(), ctx.zone, request)) {
                (Some(id), Ok(tasks)) => {
                    next.tasks.replace(tasks);
                    Change::TaskMoved { id, request }
                }
                (_, Err(err)) => {
                    tracing::debug!(error = %err, "ignoring move");
                    Change::Unchanged
                }
                (None, Ok(_)) => Change::Unchanged,
            }
        }
        Command::ToggleCollapse { date } => {
            let mut collapse = state.collapse.value().clone();
            let collapsed = schedule::toggle_collapse(&mut collapse, date, ctx.local_now());
            next.collapse.replace(collapse);
            Change::CollapseToggled { date, collapsed }
        }
    };

    tracing::debug!(
        command = name,
        tasks_version = next.tasks.version(),
        collapse_version = next.collapse.version(),
        "reduced command"
    );
    Ok(Transition {
        state: next,
        change,
    })
}

fn find_mut<'a>(tasks: &'a mut [TaskRecord], id: &str) -> Result<&'a mut TaskRecord> {
    tasks
        .iter_mut()
        .find(|task| task.id == id)
        .ok_or_else(|| Error::TaskNotFound(id.to_string()))
}
