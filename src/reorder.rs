//! Moving a task within or between day buckets.
//!
//! Positions are bucket-relative. A move across buckets gives the task the
//! destination's date and keeps its local time of day. Tasks outside the two
//! buckets involved keep their relative order.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schedule::{to_local, to_utc, DateKey};
use crate::task::TaskRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReorderError {
    #[error("no task at position {index} on {date} (bucket has {len})")]
    IndexOutOfRange {
        date: DateKey,
        index: usize,
        len: usize,
    },
}

/// Relocate the task at (`source_key`, `source_index`) to
/// (`dest_key`, `dest_index`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub source_key: DateKey,
    pub source_index: usize,
    pub dest_key: DateKey,
    pub dest_index: usize,
}

/// Apply a move and return the rebuilt collection.
///
/// The result lists untouched tasks first, then the destination bucket, then
/// the source bucket when it differs. `dest_index` is clamped to the bucket
/// length. An out-of-range `source_index` changes nothing and is reported as
/// `IndexOutOfRange`.
pub fn move_task(
    tasks: &[TaskRecord],
    zone: FixedOffset,
    request: MoveRequest,
) -> Result<Vec<TaskRecord>, ReorderError> {
    let in_bucket = |task: &TaskRecord, key: DateKey| DateKey::of(task.datetime, zone) == key;

    let mut source: Vec<TaskRecord> = tasks
        .iter()
        .filter(|task| in_bucket(task, request.source_key))
        .cloned()
        .collect();

    if request.source_index >= source.len() {
        return Err(ReorderError::IndexOutOfRange {
            date: request.source_key,
            index: request.source_index,
            len: source.len(),
        });
    }

    let mut moved = source.remove(request.source_index);
    let same_bucket = request.source_key == request.dest_key;

    let mut dest: Vec<TaskRecord> = if same_bucket {
        Vec::new()
    } else {
        let local = to_local(moved.datetime, zone);
        let rewritten = request.dest_key.date().and_time(local.time());
        moved.datetime = to_utc(rewritten, zone);
        tasks
            .iter()
            .filter(|task| in_bucket(task, request.dest_key))
            .cloned()
            .collect()
    };

    let target = if same_bucket { &mut source } else { &mut dest };
    let at = request.dest_index.min(target.len());
    target.insert(at, moved);

    let mut rebuilt: Vec<TaskRecord> = tasks
        .iter()
        .filter(|task| {
            !in_bucket(task, request.source_key) && !in_bucket(task, request.dest_key)
        })
        .cloned()
        .collect();

    if same_bucket {
        rebuilt.extend(source);
    } else {
        rebuilt.extend(dest);
        rebuilt.extend(source);
    }

    tracing::debug!(
        from = %request.source_key,
        from_index = request.source_index,
        to = %request.dest_key,
        to_index = at,
        "task moved"
    );
    Ok(rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{group_by_day, parse_local_datetime};
    use crate::task::{TaskDraft, TaskType};
    use std::collections::BTreeSet;

    fn tokyo() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).expect("offset")
    }

    fn task(id: &str, at: &str) -> TaskRecord {
        let draft = TaskDraft {
            datetime: parse_local_datetime(at).expect("datetime"),
            content: id.to_string(),
            duration: None,
            task_type: TaskType::Schedule,
            deadline: None,
            remind_at: None,
        };
        TaskRecord::from_draft(id, id, draft, tokyo())
    }

    fn key(value: &str) -> DateKey {
        value.parse().expect("date key")
    }

    fn ids(tasks: &[TaskRecord]) -> Vec<&str> {
        tasks.iter().map(|task| task.id.as_str()).collect()
    }

    fn bucket_ids<'a>(tasks: &'a [TaskRecord], date: &str) -> Vec<&'a str> {
        group_by_day(tasks, tokyo())
            .remove(&key(date))
            .unwrap_or_default()
            .into_iter()
            .map(|task| task.id.as_str())
            .collect()
    }

    fn sample() -> Vec<TaskRecord> {
        vec![
            task("a", "2026-03-01 09:00"),
            task("x", "2026-03-05 08:00"),
            task("b", "2026-03-01 10:00"),
            task("y", "2026-03-07 12:00"),
            task("c", "2026-03-01 11:00"),
        ]
    }

    fn request(from: &str, from_index: usize, to: &str, to_index: usize) -> MoveRequest {
        MoveRequest {
            source_key: key(from),
            source_index: from_index,
            dest_key: key(to),
            dest_index: to_index,
        }
    }

    #[test]
    fn intra_bucket_move_reorders_only_that_bucket() {
        let tasks = sample();
        let moved = move_task(&tasks, tokyo(), request("2026-03-01", 1, "2026-03-01", 0))
            .expect("move");
        assert_eq!(bucket_ids(&moved, "2026-03-01"), vec!["b", "a", "c"]);
        assert_eq!(ids(&moved), vec!["x", "y", "b", "a", "c"]);
    }

    #[test]
    fn cross_bucket_move_rewrites_date_and_keeps_time() {
        let tasks = sample();
        let moved = move_task(&tasks, tokyo(), request("2026-03-01", 0, "2026-03-05", 1))
            .expect("move");
        let a = moved.iter().find(|task| task.id == "a").expect("a");
        assert_eq!(
            to_local(a.datetime, tokyo()),
            parse_local_datetime("2026-03-05 09:00").expect("dt")
        );
        assert_eq!(bucket_ids(&moved, "2026-03-05"), vec!["x", "a"]);
        assert_eq!(bucket_ids(&moved, "2026-03-01"), vec!["b", "c"]);
        assert_eq!(ids(&moved), vec!["y", "x", "a", "b", "c"]);
    }

    #[test]
    fn move_into_empty_day_creates_bucket() {
        let tasks = sample();
        let moved = move_task(&tasks, tokyo(), request("2026-03-07", 0, "2026-04-01", 5))
            .expect("move");
        assert_eq!(bucket_ids(&moved, "2026-04-01"), vec!["y"]);
        assert!(bucket_ids(&moved, "2026-03-07").is_empty());
    }

    #[test]
    fn destination_index_is_clamped() {
        let tasks = sample();
        let moved = move_task(&tasks, tokyo(), request("2026-03-01", 0, "2026-03-01", 99))
            .expect("move");
        assert_eq!(bucket_ids(&moved, "2026-03-01"), vec!["b", "c", "a"]);
    }

    #[test]
    fn out_of_range_source_is_rejected_without_change() {
        let tasks = sample();
        let err = move_task(&tasks, tokyo(), request("2026-03-01", 3, "2026-03-05", 0))
            .expect_err("out of range");
        assert_eq!(
            err,
            ReorderError::IndexOutOfRange {
                date: key("2026-03-01"),
                index: 3,
                len: 3,
            }
        );
        let err = move_task(&tasks, tokyo(), request("2026-02-01", 0, "2026-03-05", 0));
        assert!(err.is_err());
    }

    #[test]
    fn moves_conserve_the_id_set() {
        let tasks = sample();
        let before: BTreeSet<_> = tasks.iter().map(|task| task.id.clone()).collect();
        let moves = [
            request("2026-03-01", 2, "2026-03-07", 0),
            request("2026-03-05", 0, "2026-03-05", 0),
            request("2026-03-01", 0, "2025-12-31", 0),
        ];
        for step in moves {
            let moved = move_task(&tasks, tokyo(), step).expect("move");
            assert_eq!(moved.len(), tasks.len());
            let after: BTreeSet<_> = moved.iter().map(|task| task.id.clone()).collect();
            assert_eq!(after, before);
        }
    }

    #[test]
    fn toggling_done_keeps_bucket_and_position() {
        let mut tasks = sample();
        let before = bucket_ids(&tasks, "2026-03-01")
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        tasks[2].toggle_done();
        assert_eq!(bucket_ids(&tasks, "2026-03-01"), before);
    }
}
