use std::fmt::Write as _;

use crate::aggregator::{Aggregator, Stats};

pub const CASE_TABLE_HEADER: &str = "Case Id,Fail Count,Total Count,Failure Rate,Minimum Time Taken,Maximum Time Taken,Average Time Taken";

pub const GROUP_TABLE_HEADER: &str = "Case Id,Group Index,Start Time,End Time,Fail Count,Total Count,Failure Rate,Minimum Time Taken,Maximum Time Taken,Average Time Taken";

const BUCKET_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Case table, a blank line, then the group table. `None` when nothing was ingested.
pub fn render(aggregator: &Aggregator) -> Option<String> {
    if aggregator.is_empty() {
        return None;
    }

    let mut cases = String::new();
    let mut groups = String::new();
    let _ = writeln!(cases, "{CASE_TABLE_HEADER}");
    let _ = writeln!(groups, "{GROUP_TABLE_HEADER}");

    for (case_id, stats) in aggregator.cases() {
        let _ = writeln!(
            cases,
            "{case_id},{},{},{:.4}%,{},{},{}",
            stats.fail_count,
            stats.total_count,
            stats.failure_rate(),
            seconds(stats.min),
            seconds(stats.max),
            seconds(stats.average),
        );

        for (i, bucket) in aggregator.buckets(case_id).iter().enumerate() {
            let start = bucket.start_time.format(BUCKET_TIME_FORMAT);
            let end = bucket
                .start_time
                .checked_add_signed(aggregator.width())
                .map(|t| t.format(BUCKET_TIME_FORMAT).to_string())
                .unwrap_or_default();
            let _ = writeln!(
                groups,
                "{case_id},{},{start},{end},{}",
                i + 1,
                bucket_fields(bucket.stats.as_ref()),
            );
        }
    }

    Some(format!("{cases}\n{groups}"))
}

fn bucket_fields(stats: Option<&Stats>) -> String {
    match stats {
        Some(s) => format!(
            "{},{},{:.4}%,{},{},{}",
            s.fail_count,
            s.total_count,
            s.failure_rate(),
            seconds(s.min),
            seconds(s.max),
            seconds(s.average),
        ),
        None => "0,0,0.0000%,,,".to_string(),
    }
}

/// Shortest round-trip form, always with a fractional part (`16.0`, `3.69`).
fn seconds(value: f64) -> String {
    let mut s = value.to_string();
    if value.is_finite() && !s.contains('.') {
        s.push_str(".0");
    }
    s
}
