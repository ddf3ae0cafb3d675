//! Task commands: add, edit, done, rm.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::interpret::HttpInterpreter;
use crate::output::{emit_success, HumanOutput};
use crate::schedule::{day_label, parse_local_datetime, time_label, DateKey};
use crate::state::{Change, Command};
use crate::task::{short_id, short_id_len, TaskPatch, TaskRecord, TaskType};

use super::{open_session, CommonOptions};

pub(crate) struct AddOptions {
    pub text: String,
    pub common: CommonOptions,
}

pub(crate) struct EditOptions {
    pub id: String,
    pub content: Option<String>,
    pub datetime: Option<String>,
    pub task_type: Option<String>,
    pub duration: Option<String>,
    pub memo: Option<String>,
    pub common: CommonOptions,
}

pub(crate) struct DoneOptions {
    pub id: String,
    pub common: CommonOptions,
}

pub(crate) struct RmOptions {
    pub id: String,
    pub yes: bool,
    pub common: CommonOptions,
}

#[derive(Serialize)]
struct AddReport {
    task: TaskRecord,
    short_id: String,
    interpreter_output: String,
}

#[derive(Serialize)]
struct EditReport {
    changed: bool,
    task: TaskRecord,
}

#[derive(Serialize)]
struct DoneReport {
    id: String,
    done: bool,
}

#[derive(Serialize)]
struct RmReport {
    deleted: TaskRecord,
}

pub(crate) fn run_add(options: AddOptions) -> Result<()> {
    if options.text.trim().is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut session = open_session(&options.common)?;
    let interpreter = HttpInterpreter::from_config(&session.config.interpreter)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let submission =
        runtime.block_on(session.planner.submit(&interpreter, &options.text, Utc::now()))?;

    let zone = session.planner.zone();
    let now = Utc::now().with_timezone(&zone);
    let task = submission.task;
    let short = short_id(&task.id, short_id_len(session.planner.tasks())).to_string();

    let mut human = HumanOutput::new(format!("Added task {short}"));
    push_task_summary(&mut human, &task, zone, now);
    human.push_detail(format!("interpreter output: {}", submission.raw_reply.trim()));
    human.push_next_step("kogura list");

    let report = AddReport {
        short_id: short,
        interpreter_output: submission.raw_reply,
        task,
    };
    emit_success(options.common.output(), "add", &report, Some(&human))
}

pub(crate) fn run_edit(options: EditOptions) -> Result<()> {
    let datetime = options
        .datetime
        .as_deref()
        .map(|raw| {
            parse_local_datetime(raw).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "invalid datetime '{raw}' (expected YYYY-MM-DD HH:MM)"
                ))
            })
        })
        .transpose()?;
    let task_type = options
        .task_type
        .as_deref()
        .map(str::parse::<TaskType>)
        .transpose()?;
    let patch = TaskPatch {
        content: options.content,
        datetime,
        task_type,
        duration: options.duration,
        memo: options.memo,
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to edit; pass --content, --datetime, --type, --duration or --memo"
                .to_string(),
        ));
    }

    let mut session = open_session(&options.common)?;
    let id = session.planner.resolve_id(&options.id)?;
    let change = session.planner.dispatch(
        Command::EditTask {
            id: id.clone(),
            patch,
        },
        Utc::now(),
    )?;

    let zone = session.planner.zone();
    let now = Utc::now().with_timezone(&zone);
    let (changed, task) = match change {
        Change::TaskEdited { task } => (true, task),
        _ => (
            false,
            session
                .planner
                .state()
                .find_task(&id)
                .cloned()
                .ok_or_else(|| Error::TaskNotFound(id.clone()))?,
        ),
    };

    let short = short_id(&task.id, short_id_len(session.planner.tasks())).to_string();
    let header = if changed {
        format!("Edited task {short}")
    } else {
        format!("Task {short} unchanged")
    };
    let mut human = HumanOutput::new(header);
    push_task_summary(&mut human, &task, zone, now);

    emit_success(
        options.common.output(),
        "edit",
        &EditReport { changed, task },
        Some(&human),
    )
}

pub(crate) fn run_done(options: DoneOptions) -> Result<()> {
    let mut session = open_session(&options.common)?;
    let id = session.planner.resolve_id(&options.id)?;
    let change = session
        .planner
        .dispatch(Command::ToggleDone { id: id.clone() }, Utc::now())?;

    let done = match change {
        Change::TaskDoneToggled { done, .. } => done,
        _ => false,
    };
    let short = short_id(&id, short_id_len(session.planner.tasks())).to_string();
    let header = if done {
        format!("Marked {short} done")
    } else {
        format!("Marked {short} not done")
    };
    let human = HumanOutput::new(header);

    emit_success(
        options.common.output(),
        "done",
        &DoneReport { id, done },
        Some(&human),
    )
}

pub(crate) fn run_rm(options: RmOptions) -> Result<()> {
    let mut session = open_session(&options.common)?;
    let id = session.planner.resolve_id(&options.id)?;
    if !options.yes {
        return Err(Error::ConfirmationRequired(id));
    }

    let zone = session.planner.zone();
    let short = short_id(&id, short_id_len(session.planner.tasks())).to_string();
    let change = session
        .planner
        .dispatch(Command::DeleteTask { id: id.clone() }, Utc::now())?;
    let deleted = match change {
        Change::TaskDeleted { task } => task,
        _ => return Err(Error::TaskNotFound(id)),
    };

    let mut human = HumanOutput::new(format!("Deleted task {short}"));
    human.push_summary("task", deleted.display_text().to_string());
    human.push_summary(
        "was on",
        format!(
            "{} {}",
            DateKey::of(deleted.datetime, zone),
            time_label(deleted.datetime, zone)
        ),
    );

    emit_success(
        options.common.output(),
        "rm",
        &RmReport { deleted },
        Some(&human),
    )
}

fn push_task_summary(
    human: &mut HumanOutput,
    task: &TaskRecord,
    zone: FixedOffset,
    now: DateTime<FixedOffset>,
) {
    let date = DateKey::of(task.datetime, zone);
    human.push_summary("task", task.display_text().to_string());
    human.push_summary(
        "when",
        format!(
            "{} ({date}) {}",
            day_label(date, now),
            time_label(task.datetime, zone)
        ),
    );
    human.push_summary("type", task.task_type.as_str());
    if let Some(duration) = &task.duration_text {
        human.push_summary("duration", duration.clone());
    }
    if let Some(deadline) = task.deadline {
        human.push_summary("deadline", deadline.format("%Y-%m-%d").to_string());
    }
    if let Some(remind_at) = task.remind_at {
        human.push_summary("remind at", remind_at.format("%Y-%m-%d").to_string());
    }
    if let Some(memo) = &task.memo {
        human.push_summary("memo", memo.clone());
    }
    if task.done {
        human.push_summary("done", "");
    }
    for mismatch in task.type_field_mismatches() {
        human.push_warning(mismatch.to_string());
    }
}
