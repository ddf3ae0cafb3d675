//! A planning session: loaded state, its store, and the submission gate.
//!
//! The session loads both persisted values once, routes every command
//! through the reducer, writes back whichever value changed, and mirrors the
//! change to the event sink. Text submission is the only async step; while
//! one is outstanding a second is refused.

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::{Error, Result};
use crate::events::{Event, EventSink};
use crate::interpret::{Interpretation, Interpreter};
use crate::state::{reduce, AppState, Change, Command, Context};
use crate::storage::{Gateway, KeyValueStore};
use crate::task::{resolve_task_id, TaskRecord};

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub task: TaskRecord,
    /// Interpreter reply, kept so it can be shown back.
    pub raw_reply: String,
}

/// Holds the submission flag up until dropped, including when the
/// submitting future is dropped mid-call.
struct InFlight<'a>(&'a mut bool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

pub struct Planner<S> {
    gateway: Gateway<S>,
    state: AppState,
    zone: FixedOffset,
    events: Option<EventSink>,
    in_flight: bool,
}

impl<S: KeyValueStore> Planner<S> {
    /// Load tasks and collapse state from `gateway`.
    pub fn open(gateway: Gateway<S>, zone: FixedOffset) -> Result<Self> {
        let tasks = gateway.load_tasks()?;
        let collapse = gateway.load_collapse()?;
        Ok(Self {
            gateway,
            state: AppState::new(tasks, collapse),
            zone,
            events: None,
            in_flight: false,
        })
    }

    pub fn with_events(mut self, sink: Option<EventSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        self.state.tasks.value()
    }

    pub fn zone(&self) -> FixedOffset {
        self.zone
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    /// Resolve a full id or unique id suffix.
    pub fn resolve_id(&self, input: &str) -> Result<String> {
        resolve_task_id(self.tasks(), input)
    }

    /// Apply a command, persist what changed, and emit its event.
    pub fn dispatch(&mut self, command: Command, now: DateTime<Utc>) -> Result<Change> {
        let ctx = Context::new(self.zone, now);
        let transition = reduce(&self.state, command, ctx)?;

        let tasks_changed = transition.state.tasks.version() != self.state.tasks.version();
        let collapse_changed =
            transition.state.collapse.version() != self.state.collapse.version();

        if tasks_changed {
            self.gateway.save_tasks(transition.state.tasks.value())?;
        }
        if collapse_changed {
            self.gateway.save_collapse(transition.state.collapse.value())?;
        }
        self.state = transition.state;

        if let Some(sink) = self.events.as_mut() {
            if let Some(event) = Event::from_change(&transition.change, now) {
                sink.emit(&event)?;
            }
        }
        Ok(transition.change)
    }

    /// Interpret `text` and add the resulting task.
    ///
    /// Empty input is refused before any call. On interpreter failure the
    /// state is untouched and a generic error is returned; the cause is only
    /// logged.
    pub async fn submit<I: Interpreter>(
        &mut self,
        interpreter: &I,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Submission> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyInput);
        }
        if self.in_flight {
            return Err(Error::SubmissionInFlight);
        }

        let local_now = now.with_timezone(&self.zone);
        let outcome = {
            let _gate = InFlight::enter(&mut self.in_flight);
            interpreter.interpret(text, local_now).await
        };

        let Interpretation { draft, raw } = match outcome {
            Ok(interpretation) => interpretation,
            Err(err) => {
                tracing::warn!(error = %err, kind = err.kind(), "interpretation failed");
                return Err(Error::Interpret(err));
            }
        };

        match self.dispatch(
            Command::AddTask {
                raw_input: text.to_string(),
                draft,
            },
            now,
        )? {
            Change::TaskAdded { task } => Ok(Submission {
                task,
                raw_reply: raw,
            }),
            other => Err(Error::InvalidArgument(format!(
                "unexpected result of add: {other:?}"
            ))),
        }
    }
}
