use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::task::JoinHandle;

use super::cancel::CancelSignal;
use super::error::{Error, Result};
use crate::case::now;

/// Absolute start/stop instants of a run, in local time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleWindow {
    pub starts_time: Option<NaiveDateTime>,
    pub ends_time: Option<NaiveDateTime>,
}

impl ScheduleWindow {
    pub fn new(
        starts_time: Option<NaiveDateTime>,
        ends_time: Option<NaiveDateTime>,
    ) -> Result<Self> {
        if let (Some(starts), Some(ends)) = (starts_time, ends_time)
            && ends < starts
        {
            return Err(Error::InvalidWindow);
        }
        Ok(Self {
            starts_time,
            ends_time,
        })
    }

    /// Ends `duration` after `max(starts_time, now)`.
    pub fn with_duration(starts_time: Option<NaiveDateTime>, duration: Duration) -> Self {
        let current = now();
        let base = starts_time.filter(|s| *s > current).unwrap_or(current);
        let ends_time = chrono::TimeDelta::from_std(duration)
            .ok()
            .and_then(|d| base.checked_add_signed(d));
        Self {
            starts_time,
            ends_time,
        }
    }

    /// Blocks until `starts_time`, returning early if the run gets cancelled.
    pub(crate) async fn wait_for_start(&self, cancel: &CancelSignal) {
        let Some(starts) = self.starts_time else {
            return;
        };
        if let Some(wait) = until(starts) {
            tracing::info!("waiting until {starts}...");
            cancel.sleep(wait).await;
        }
    }

    /// Whether `ends_time` is already behind us.
    pub(crate) fn is_over(&self) -> bool {
        self.ends_time.is_some_and(|ends| until(ends).is_none())
    }

    /// Deferred cancellation at `ends_time`. In-flight workers are not interrupted; they
    /// observe the flag at their next iteration boundary.
    pub(crate) fn spawn_watchdog(&self, cancel: Arc<CancelSignal>) -> Option<JoinHandle<()>> {
        let ends = self.ends_time?;
        let wait = until(ends)?;
        tracing::info!("will be stopped at {ends}...");
        Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            cancel.cancel();
        }))
    }
}

fn until(instant: NaiveDateTime) -> Option<Duration> {
    let remaining = (instant - now()).to_std().ok()?;
    (!remaining.is_zero()).then_some(remaining)
}
