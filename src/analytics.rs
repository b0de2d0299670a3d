//! Usage statistics over a user's generation history.
//!
//! Pure aggregation: callers load the history and pass `now`.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::Serialize;

use crate::generation::{GenerationRecord, PlanScope};

/// Weekday labels, Monday first, matching [`DetailedUsage::by_weekday`].
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Time-of-day bucket labels, matching [`DetailedUsage::by_time_of_day`].
pub const TIMES_OF_DAY: [&str; 4] = ["Morning", "Day", "Evening", "Night"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub total: u32,
    pub last_7_days: u32,
    pub by_scope: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailedUsage {
    pub by_weekday: [u32; 7],
    pub by_time_of_day: [u32; 4],
    /// Mean gap between consecutive generations; `None` with fewer than two.
    pub average_days_between: Option<f64>,
}

pub fn summarize(history: &[GenerationRecord], now: DateTime<Utc>) -> UsageSummary {
    let week_ago = now - Duration::days(7);
    let mut summary = UsageSummary::default();

    for record in history {
        summary.total += 1;
        if record.created_at >= week_ago && record.created_at <= now {
            summary.last_7_days += 1;
        }
        *summary
            .by_scope
            .entry(record.scope.as_str().to_string())
            .or_default() += 1;
    }
    summary
}

/// Bucket index for an hour: morning 5-12, day 12-17, evening 17-23,
/// night otherwise.
pub fn time_of_day_bucket(hour: u32) -> usize {
    match hour {
        5..=11 => 0,
        12..=16 => 1,
        17..=22 => 2,
        _ => 3,
    }
}

pub fn detail(history: &[GenerationRecord]) -> DetailedUsage {
    let mut usage = DetailedUsage::default();

    for record in history {
        let at = record.created_at;
        usage.by_weekday[at.weekday().num_days_from_monday() as usize] += 1;
        usage.by_time_of_day[time_of_day_bucket(at.hour())] += 1;
    }

    if history.len() >= 2 {
        let first = history.iter().map(|r| r.created_at).min();
        let last = history.iter().map(|r| r.created_at).max();
        if let (Some(first), Some(last)) = (first, last) {
            let span_days = (last - first).num_seconds() as f64 / 86_400.0;
            usage.average_days_between = Some(span_days / (history.len() - 1) as f64);
        }
    }
    usage
}

/// Count for `scope`, zero if it never appeared.
pub fn scope_count(summary: &UsageSummary, scope: PlanScope) -> u32 {
    summary.by_scope.get(scope.as_str()).copied().unwrap_or(0)
}
