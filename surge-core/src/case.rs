use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;

mod execute;
mod fn_case;

pub use execute::{CaseFailure, execute};
pub use fn_case::FnCase;

/// Read-only case list shared by every worker of a run.
pub type CaseList = Arc<[Box<dyn Case>]>;

/// One unit of test work.
///
/// A case value only carries identity and configuration. Everything produced while it
/// executes lives in the [`CaseRun`] handed to each lifecycle step, so a fresh run state
/// exists per execution and concurrent workers never share it.
///
/// Lifecycle: `initialize -> run -> verify -> dispose`.
/// - `initialize` returning `Ok(false)` fails the case and skips `run`/`verify`.
/// - `run` returning `Ok(false)` fails the case and skips `verify`.
/// - an error or panic in any of the three fails the case and captures its trace.
/// - `dispose` always runs; its errors are swallowed.
pub trait Case: Send + Sync {
    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Copy for a new execution: identity and configuration are kept, any per-execution
    /// scratch state must start empty.
    fn fresh(&self) -> Box<dyn Case>;

    fn initialize(&mut self, _run: &mut CaseRun) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn run(&mut self, run: &mut CaseRun) -> anyhow::Result<bool>;

    /// Compare received against expected. A verification that wants to fail the case
    /// without raising calls [`CaseRun::set_status`] with `false`.
    fn verify(&mut self, _run: &mut CaseRun) -> anyhow::Result<()> {
        Ok(())
    }

    fn dispose(&mut self, _run: &mut CaseRun) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Mutable state of one case execution.
#[derive(Debug, Clone, Default)]
pub struct CaseRun {
    pub repeat_index: u64,
    pub is_under_stress_test: bool,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub expected: Option<String>,
    pub received: Option<String>,
    pub output_messages: Vec<String>,
    /// Values for the additional report columns, in header order.
    pub additional_messages: Vec<String>,
    pub log_path: Option<PathBuf>,
    status: Option<bool>,
    time_taken: Option<f64>,
}

impl CaseRun {
    pub fn new(repeat_index: u64, is_under_stress_test: bool) -> Self {
        Self {
            repeat_index,
            is_under_stress_test,
            ..Self::default()
        }
    }

    pub fn status(&self) -> Option<bool> {
        self.status
    }

    pub fn is_pass(&self) -> bool {
        self.status == Some(true)
    }

    /// The first assignment wins. Returns whether this call set the status.
    pub fn set_status(&mut self, pass: bool) -> bool {
        if self.status.is_some() {
            return false;
        }
        self.status = Some(pass);
        true
    }

    /// Overrides the measured end-to-end time (seconds).
    pub fn set_time_taken(&mut self, seconds: f64) {
        self.time_taken = Some(seconds);
    }

    /// Explicit value if one was set, otherwise `end_time - start_time`.
    pub fn time_taken(&self) -> Option<f64> {
        if self.time_taken.is_some() {
            return self.time_taken;
        }
        let (start, end) = (self.start_time?, self.end_time?);
        let micros = (end - start).num_microseconds()?;
        Some(micros as f64 / 1_000_000.0)
    }

    pub fn push_output(&mut self, message: impl Into<String>) {
        self.output_messages.push(message.into());
    }

    pub(crate) fn mark_start(&mut self) {
        self.start_time = Some(now());
    }

    pub(crate) fn mark_end(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(now());
        }
    }
}

pub(crate) fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
