//! Day grouping for the task list.
//!
//! Tasks are bucketed by the calendar date of their `datetime` in one fixed
//! zone. Buckets for today and later come first in date order; past buckets
//! follow, also in date order. Past buckets are collapsed unless the user
//! expanded them.
//!
//! Every function here takes "now" as a parameter; nothing reads the clock.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::task::TaskRecord;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
const LOCAL_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Calendar date in the fixed zone, rendered as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// Bucket key for an instant, seen from `zone`.
    pub fn of(datetime: DateTime<Utc>, zone: FixedOffset) -> Self {
        Self(datetime.with_timezone(&zone).date_naive())
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        NaiveDate::parse_from_str(value.trim(), DATE_KEY_FORMAT)
            .map(DateKey)
            .map_err(|_| {
                Error::InvalidArgument(format!("invalid date '{value}' (expected YYYY-MM-DD)"))
            })
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Per-day collapse overrides. A missing entry means "use the default".
pub type CollapseState = BTreeMap<DateKey, bool>;

/// Wall-clock time in `zone` to an absolute instant.
///
/// A fixed offset maps every wall-clock time to one instant. Only the edges
/// of chrono's range have none; those are read as UTC.
pub fn to_utc(local: NaiveDateTime, zone: FixedOffset) -> DateTime<Utc> {
    local
        .and_local_timezone(zone)
        .single()
        .map(|datetime| datetime.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}

/// Absolute instant to wall-clock time in `zone`.
pub fn to_local(datetime: DateTime<Utc>, zone: FixedOffset) -> NaiveDateTime {
    datetime.with_timezone(&zone).naive_local()
}

/// Parse `YYYY-MM-DD HH:mm` (also `T`-separated, optional seconds).
pub fn parse_local_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    LOCAL_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Parse a `+HH:MM` / `-HH:MM` offset (`Z` and `+HHMM` also accepted).
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    let trimmed = value.trim();
    let invalid = || Error::InvalidConfig(format!("invalid UTC offset '{value}' (expected +HH:MM)"));

    if trimmed.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|ch| *ch != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Partition tasks by local date, keeping source order inside each day.
pub fn group_by_day(tasks: &[TaskRecord], zone: FixedOffset) -> BTreeMap<DateKey, Vec<&TaskRecord>> {
    let mut groups: BTreeMap<DateKey, Vec<&TaskRecord>> = BTreeMap::new();
    for task in tasks {
        groups
            .entry(DateKey::of(task.datetime, zone))
            .or_default()
            .push(task);
    }
    groups
}

/// A day is past when it is strictly before today's date. Time of day on
/// `now` plays no part.
pub fn is_past(key: DateKey, now: DateTime<FixedOffset>) -> bool {
    key.date() < now.date_naive()
}

/// Display order: today and later ascending, then past days ascending.
pub fn sort_day_keys(keys: &mut [DateKey], now: DateTime<FixedOffset>) {
    keys.sort_by(|left, right| {
        is_past(*left, now)
            .cmp(&is_past(*right, now))
            .then_with(|| left.cmp(right))
    });
}

/// Whether a day's tasks are hidden. Past days default to collapsed and
/// honor an explicit override; today and later are always expanded.
pub fn is_collapsed(key: DateKey, collapse: &CollapseState, now: DateTime<FixedOffset>) -> bool {
    if !is_past(key, now) {
        return false;
    }
    collapse.get(&key).copied().unwrap_or(true)
}

/// Flip the recorded state of a day and return the effective state after
/// the write. Past days flip what is shown. Today and later days only flip
/// the stored override, which stays ignored while the day is not past.
pub fn toggle_collapse(collapse: &mut CollapseState, key: DateKey, now: DateTime<FixedOffset>) -> bool {
    let current = if is_past(key, now) {
        is_collapsed(key, collapse, now)
    } else {
        collapse.get(&key).copied().unwrap_or(false)
    };
    collapse.insert(key, !current);
    is_collapsed(key, collapse, now)
}

/// One day of the board, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct DayBucket<'a> {
    pub date: DateKey,
    pub past: bool,
    pub collapsed: bool,
    pub tasks: Vec<&'a TaskRecord>,
}

/// Group, order, and apply collapse state in one pass.
pub fn board<'a>(
    tasks: &'a [TaskRecord],
    collapse: &CollapseState,
    zone: FixedOffset,
    now: DateTime<Utc>,
) -> Vec<DayBucket<'a>> {
    let now = now.with_timezone(&zone);
    let mut groups = group_by_day(tasks, zone);
    let mut keys: Vec<DateKey> = groups.keys().copied().collect();
    sort_day_keys(&mut keys, now);

    keys.into_iter()
        .filter_map(|key| {
            groups.remove(&key).map(|tasks| DayBucket {
                date: key,
                past: is_past(key, now),
                collapsed: is_collapsed(key, collapse, now),
                tasks,
            })
        })
        .collect()
}

/// "Today", "Tomorrow", or e.g. "Thu, Mar 5".
pub fn day_label(key: DateKey, now: DateTime<FixedOffset>) -> String {
    let today = now.date_naive();
    if key.date() == today {
        return "Today".to_string();
    }
    if today.succ_opt() == Some(key.date()) {
        return "Tomorrow".to_string();
    }
    key.date().format("%a, %b %-d").to_string()
}

/// `HH:MM` in the fixed zone.
pub fn time_label(datetime: DateTime<Utc>, zone: FixedOffset) -> String {
    datetime.with_timezone(&zone).format("%H:%M").to_string()
}
