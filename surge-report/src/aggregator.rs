use std::collections::hash_map::Entry;

use ahash::AHashMap;
use chrono::{DateTime, NaiveDateTime, TimeDelta};
use surge_core::ResultRecord;

use crate::error::{Error, Result};

/// Upper bound on the buckets one sample may move a case forward by. About 69 days of
/// one-minute buckets; anything further is treated as a bad timestamp.
pub const MAX_SKIPPED_BUCKETS: u32 = 100_000;

/// Running figures for one case, or one bucket of one case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub fail_count: u64,
    pub total_count: u64,
    pub min: f64,
    pub max: f64,
    /// `(previous + sample) / 2` per sample. Recent samples weigh more; this is not the
    /// arithmetic mean and existing dashboards depend on that.
    pub average: f64,
}

impl Stats {
    fn first(elapsed: f64, is_pass: bool) -> Self {
        Self {
            fail_count: u64::from(!is_pass),
            total_count: 1,
            min: elapsed,
            max: elapsed,
            average: elapsed,
        }
    }

    fn add(&mut self, elapsed: f64, is_pass: bool) {
        self.total_count += 1;
        if !is_pass {
            self.fail_count += 1;
        }
        self.min = self.min.min(elapsed);
        self.max = self.max.max(elapsed);
        self.average = (self.average + elapsed) / 2.0;
    }

    /// `fail / total` as a percentage.
    pub fn failure_rate(&self) -> f64 {
        self.fail_count as f64 / self.total_count.max(1) as f64 * 100.0
    }
}

fn merge(slot: &mut Option<Stats>, elapsed: f64, is_pass: bool) {
    match slot {
        Some(stats) => stats.add(elapsed, is_pass),
        None => *slot = Some(Stats::first(elapsed, is_pass)),
    }
}

/// One time bucket of one case. Placeholder buckets, inserted when a case skips ahead,
/// carry no stats.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub start_time: NaiveDateTime,
    pub stats: Option<Stats>,
}

#[derive(Debug, Clone)]
struct CaseEntry {
    summary: Stats,
    buckets: Vec<Bucket>,
}

/// Incremental per-case and per-bucket statistics.
///
/// Cases keep first-seen order. Buckets of a case only ever move forward: a sample that
/// ends before the current bucket is counted in the current bucket.
#[derive(Debug, Clone)]
pub struct Aggregator {
    width: TimeDelta,
    order: Vec<String>,
    cases: AHashMap<String, CaseEntry>,
}

impl Aggregator {
    pub fn new(width: TimeDelta) -> Result<Self> {
        if width <= TimeDelta::zero() {
            return Err(Error::InvalidGroupMinutes);
        }
        Ok(Self {
            width,
            order: Vec::new(),
            cases: AHashMap::new(),
        })
    }

    pub fn with_group_minutes(group_minutes: u64) -> Result<Self> {
        let minutes = i64::try_from(group_minutes).map_err(|_| Error::InvalidGroupMinutes)?;
        let width = TimeDelta::try_minutes(minutes).ok_or(Error::InvalidGroupMinutes)?;
        Self::new(width)
    }

    pub fn width(&self) -> TimeDelta {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Counts one sample. Fails, leaving the aggregator untouched, when the sample's
    /// bucket cannot be represented or lies more than [`MAX_SKIPPED_BUCKETS`] past the
    /// case's current bucket.
    pub fn ingest(
        &mut self,
        case_id: &str,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        elapsed: f64,
        is_pass: bool,
    ) -> Result<()> {
        let width = self.width;
        let out_of_range = || Error::OutOfRange {
            case: case_id.to_string(),
            end_time,
        };

        let origin = match self.cases.get(case_id).and_then(|e| e.buckets.last()) {
            Some(bucket) => bucket.start_time,
            None => floor(start_time, width),
        };
        let steps = steps_past(origin, end_time, width).ok_or_else(out_of_range)?;

        let mut cursor = origin;
        let mut skipped = Vec::new();
        for step in 0..steps {
            if step > 0 {
                skipped.push(cursor);
            }
            cursor = cursor.checked_add_signed(width).ok_or_else(out_of_range)?;
        }
        // The bucket's end is printed, so it has to exist too.
        cursor.checked_add_signed(width).ok_or_else(out_of_range)?;

        let entry = match self.cases.entry(case_id.to_string()) {
            Entry::Occupied(slot) => {
                let entry = slot.into_mut();
                entry.summary.add(elapsed, is_pass);
                entry
            }
            Entry::Vacant(slot) => {
                self.order.push(case_id.to_string());
                slot.insert(CaseEntry {
                    summary: Stats::first(elapsed, is_pass),
                    buckets: Vec::new(),
                })
            }
        };

        entry.buckets.extend(skipped.into_iter().map(|start_time| Bucket {
            start_time,
            stats: None,
        }));
        match entry.buckets.last_mut() {
            Some(bucket) if bucket.start_time == cursor => merge(&mut bucket.stats, elapsed, is_pass),
            _ => entry.buckets.push(Bucket {
                start_time: cursor,
                stats: Some(Stats::first(elapsed, is_pass)),
            }),
        }
        Ok(())
    }

    /// Feeds a received record. Records without timing (a case that failed before it
    /// started) are skipped and reported as `Ok(false)`.
    pub fn ingest_record(&mut self, record: &ResultRecord) -> Result<bool> {
        match (record.start_time, record.end_time, record.time_taken) {
            (Some(start), Some(end), Some(elapsed)) => {
                self.ingest(&record.id, start, end, elapsed, record.status)?;
                Ok(true)
            }
            _ => {
                tracing::debug!(case = %record.id, "record without timing, not aggregated");
                Ok(false)
            }
        }
    }

    /// Case summaries in first-seen order.
    pub fn cases(&self) -> impl Iterator<Item = (&str, &Stats)> {
        self.order
            .iter()
            .filter_map(|id| self.cases.get(id).map(|e| (id.as_str(), &e.summary)))
    }

    pub fn buckets(&self, case_id: &str) -> &[Bucket] {
        self.cases
            .get(case_id)
            .map(|e| e.buckets.as_slice())
            .unwrap_or_default()
    }
}

/// How many widths past `origin` the bucket holding a sample that ends at `end_time`
/// starts. `None` when that is more than [`MAX_SKIPPED_BUCKETS`].
fn steps_past(origin: NaiveDateTime, end_time: NaiveDateTime, width: TimeDelta) -> Option<u32> {
    let gap = end_time.signed_duration_since(origin);
    if gap <= width {
        return Some(0);
    }
    // Widths are whole minutes; round the gap up so a sub-microsecond overhang counts.
    let gap = gap.num_microseconds()? + i64::from(gap.subsec_nanos() % 1_000 != 0);
    let width = width.num_microseconds()?.max(1);
    let steps = (gap - 1) / width;
    u32::try_from(steps).ok().filter(|&n| n <= MAX_SKIPPED_BUCKETS)
}

/// Rounds down to a multiple of `width` since the epoch.
fn floor(t: NaiveDateTime, width: TimeDelta) -> NaiveDateTime {
    let secs = t.and_utc().timestamp();
    let step = width.num_seconds().max(1);
    let floored = secs - secs.rem_euclid(step);
    DateTime::from_timestamp(floored, 0)
        .map(|d| d.naive_utc())
        .unwrap_or(t)
}
