//! Day board commands: list, move, collapse.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::reorder::MoveRequest;
use crate::schedule::{board, day_label, is_collapsed, is_past, time_label, DateKey, DayBucket};
use crate::state::{Change, Command};
use crate::task::{short_id, short_id_len, TaskRecord};

use super::{open_session, CommonOptions};

pub(crate) struct ListOptions {
    pub all: bool,
    pub common: CommonOptions,
}

pub(crate) struct MoveOptions {
    pub from_date: String,
    pub from_position: u64,
    pub to_date: String,
    pub to_position: u64,
    pub common: CommonOptions,
}

pub(crate) struct CollapseOptions {
    pub date: String,
    pub common: CommonOptions,
}

#[derive(Serialize)]
struct ListReport<'a> {
    today: DateKey,
    task_count: usize,
    days: Vec<DayReport<'a>>,
}

#[derive(Serialize)]
struct DayReport<'a> {
    date: DateKey,
    label: String,
    past: bool,
    collapsed: bool,
    tasks: Vec<TaskLine<'a>>,
}

#[derive(Serialize)]
struct TaskLine<'a> {
    short_id: &'a str,
    time: String,
    #[serde(flatten)]
    task: &'a TaskRecord,
}

#[derive(Serialize)]
struct MoveReport {
    moved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    request: MoveRequest,
}

#[derive(Serialize)]
struct CollapseReport {
    date: DateKey,
    past: bool,
    collapsed: bool,
}

pub(crate) fn run_list(options: ListOptions) -> Result<()> {
    let session = open_session(&options.common)?;
    let zone = session.planner.zone();
    let now = Utc::now();
    let local_now = now.with_timezone(&zone);
    let tasks = session.planner.tasks();
    let id_len = short_id_len(tasks);

    let buckets = board(tasks, session.planner.state().collapse.value(), zone, now);

    let header = if tasks.is_empty() {
        "No tasks yet".to_string()
    } else {
        format!("{} tasks on {} days", tasks.len(), buckets.len())
    };
    let mut human = HumanOutput::new(header);
    let mut hidden = 0usize;
    for bucket in &buckets {
        human.push_detail(render_bucket(bucket, options.all, id_len, zone, local_now));
        if bucket.collapsed && !options.all {
            hidden += bucket.tasks.len();
        }
    }
    if tasks.is_empty() {
        human.push_next_step("kogura add \"明日14時 会議\"");
    } else if hidden > 0 {
        human.push_next_step("kogura list --all");
    }

    let report = ListReport {
        today: DateKey::new(local_now.date_naive()),
        task_count: tasks.len(),
        days: buckets
            .iter()
            .map(|bucket| DayReport {
                date: bucket.date,
                label: day_label(bucket.date, local_now),
                past: bucket.past,
                collapsed: bucket.collapsed,
                tasks: bucket
                    .tasks
                    .iter()
                    .map(|task| TaskLine {
                        short_id: short_id(&task.id, id_len),
                        time: time_label(task.datetime, zone),
                        task,
                    })
                    .collect(),
            })
            .collect(),
    };

    emit_success(options.common.output(), "list", &report, Some(&human))
}

fn render_bucket(
    bucket: &DayBucket<'_>,
    show_collapsed: bool,
    id_len: usize,
    zone: FixedOffset,
    now: DateTime<FixedOffset>,
) -> String {
    let label = day_label(bucket.date, now);
    if bucket.collapsed && !show_collapsed {
        return format!(
            "{label} ({}) [collapsed, {} tasks]",
            bucket.date,
            bucket.tasks.len()
        );
    }

    let mut lines = vec![format!("{label} ({})", bucket.date)];
    for (position, task) in bucket.tasks.iter().enumerate() {
        let mark = if task.done { "x" } else { " " };
        let mut line = format!(
            "    {}. [{mark}] {} {} {}",
            position + 1,
            time_label(task.datetime, zone),
            short_id(&task.id, id_len),
            task.display_text()
        );
        match &task.duration_text {
            Some(duration) => line.push_str(&format!(" ({}, {duration})", task.task_type)),
            None => line.push_str(&format!(" ({})", task.task_type)),
        }
        lines.push(line);
    }
    lines.join("\n")
}

pub(crate) fn run_move(options: MoveOptions) -> Result<()> {
    let request = MoveRequest {
        source_key: options.from_date.parse()?,
        source_index: position_to_index(options.from_position)?,
        dest_key: options.to_date.parse()?,
        dest_index: position_to_index(options.to_position)?,
    };

    let mut session = open_session(&options.common)?;
    let zone = session.planner.zone();
    let change = session
        .planner
        .dispatch(Command::MoveTask(request), Utc::now())?;

    let (moved, id) = match change {
        Change::TaskMoved { id, .. } => (true, Some(id)),
        _ => (false, None),
    };

    let mut human = match &id {
        Some(id) => {
            let short = short_id(id, short_id_len(session.planner.tasks()));
            let mut human = HumanOutput::new(format!("Moved {short} to {}", request.dest_key));
            if let Some(task) = session.planner.state().find_task(id) {
                human.push_summary("task", task.display_text().to_string());
                human.push_summary(
                    "at",
                    format!("{} {}", DateKey::of(task.datetime, zone), time_label(task.datetime, zone)),
                );
            }
            human
        }
        None => HumanOutput::new("Nothing moved"),
    };
    if !moved {
        human.push_warning(format!(
            "no task at position {} on {}",
            options.from_position, request.source_key
        ));
        human.push_next_step("kogura list --all");
    }

    emit_success(
        options.common.output(),
        "move",
        &MoveReport { moved, id, request },
        Some(&human),
    )
}

pub(crate) fn run_collapse(options: CollapseOptions) -> Result<()> {
    let date: DateKey = options.date.parse()?;

    let mut session = open_session(&options.common)?;
    let now = Utc::now();
    let local_now = now.with_timezone(&session.planner.zone());
    let change = session
        .planner
        .dispatch(Command::ToggleCollapse { date }, now)?;

    let collapsed = match change {
        Change::CollapseToggled { collapsed, .. } => collapsed,
        _ => is_collapsed(date, session.planner.state().collapse.value(), local_now),
    };
    let past = is_past(date, local_now);

    let header = if collapsed {
        format!("Collapsed {date}")
    } else {
        format!("Expanded {date}")
    };
    let mut human = HumanOutput::new(header);
    if !past {
        human.push_warning("today and later days are always shown");
    }

    emit_success(
        options.common.output(),
        "collapse",
        &CollapseReport {
            date,
            past,
            collapsed,
        },
        Some(&human),
    )
}

fn position_to_index(position: u64) -> Result<usize> {
    position
        .checked_sub(1)
        .and_then(|index| usize::try_from(index).ok())
        .ok_or_else(|| Error::InvalidArgument(format!("invalid position {position}")))
}
