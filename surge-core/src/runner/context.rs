use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use super::cancel::CancelSignal;
use crate::case::{Case, CaseRun};
use crate::record::ResultRecord;
use crate::sink::ResultSink;

/// Pass bookkeeping of one run.
///
/// `completed <= started` always holds; equality means every launched pass has drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Case-list passes launched.
    pub started: u64,
    /// Case-list passes finished.
    pub completed: u64,
    /// Result records handed to the sink.
    pub recorded: u64,
}

impl RunCounters {
    pub fn in_flight(&self) -> u64 {
        self.started.saturating_sub(self.completed)
    }

    pub fn is_drained(&self) -> bool {
        self.completed >= self.started
    }
}

#[derive(Debug)]
struct RunState {
    counters: RunCounters,
    sink: ResultSink,
    /// `(case id, passed)` per recorded case, kept only when asked for.
    outcomes: Option<Vec<(String, bool)>>,
}

/// Per-run shared state. Counter updates and sink writes go through one lock, which is
/// never held while a case executes.
#[derive(Debug)]
pub(crate) struct RunContext {
    pub(crate) cancel: Arc<CancelSignal>,
    state: Mutex<RunState>,
}

impl RunContext {
    pub(crate) fn new(cancel: Arc<CancelSignal>, sink: ResultSink) -> Self {
        Self {
            cancel,
            state: Mutex::new(RunState {
                counters: RunCounters::default(),
                sink,
                outcomes: None,
            }),
        }
    }

    /// Also remember every case outcome, for the end-of-run summary.
    pub(crate) fn keep_outcomes(self) -> Self {
        self.lock().outcomes = Some(Vec::new());
        self
    }

    pub(crate) fn take_outcomes(&self) -> Vec<(String, bool)> {
        self.lock().outcomes.take().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn pass_started(&self) {
        self.lock().counters.started += 1;
    }

    pub(crate) fn pass_finished(&self) {
        let mut state = self.lock();
        state.counters.completed += 1;
        debug_assert!(state.counters.completed <= state.counters.started);
    }

    pub(crate) fn counters(&self) -> RunCounters {
        self.lock().counters
    }

    /// Number of passes to launch this tick: `thread_count`, clamped to the room left under
    /// `max_thread_count` when a cap is set.
    pub(crate) fn admit(&self, thread_count: u64, max_thread_count: u64) -> u64 {
        if max_thread_count == 0 {
            return thread_count;
        }
        let in_flight = self.lock().counters.in_flight();
        max_thread_count
            .saturating_sub(in_flight)
            .min(thread_count)
    }

    /// Completion hook for a finished case: snapshot it and hand it to the sink.
    pub(crate) fn record(&self, case: &dyn Case, run: &CaseRun) {
        let record = ResultRecord::new(case, run);
        let mut state = self.lock();
        if let Err(err) = state.sink.write(&record) {
            tracing::warn!(case = case.id(), "failed to write result: {err}");
        }
        state.counters.recorded += 1;
        if let Some(outcomes) = state.outcomes.as_mut() {
            outcomes.push((record.id, record.status));
        }
    }

    pub(crate) fn close_sink(&self) -> Option<PathBuf> {
        let mut state = self.lock();
        if let Err(err) = state.sink.close() {
            tracing::warn!("failed to close report: {err}");
        }
        state.sink.report_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RunContext {
        RunContext::new(Arc::new(CancelSignal::new()), ResultSink::Discard)
    }

    #[test]
    fn admission_without_cap_is_thread_count() {
        let ctx = ctx();
        for _ in 0..10 {
            ctx.pass_started();
        }
        assert_eq!(ctx.admit(3, 0), 3);
    }

    #[test]
    fn admission_clamps_to_room_under_cap() {
        let ctx = ctx();
        assert_eq!(ctx.admit(3, 2), 2);

        ctx.pass_started();
        assert_eq!(ctx.admit(3, 2), 1);

        ctx.pass_started();
        assert_eq!(ctx.admit(3, 2), 0);

        ctx.pass_finished();
        assert_eq!(ctx.admit(3, 2), 1);
        assert_eq!(ctx.admit(3, 10), 3);
    }

    #[test]
    fn counters_track_drain() {
        let ctx = ctx();
        ctx.pass_started();
        assert!(!ctx.counters().is_drained());
        ctx.pass_finished();
        assert!(ctx.counters().is_drained());
        assert_eq!(ctx.close_sink(), None);
    }

    #[test]
    fn outcomes_only_kept_on_request() {
        let case = crate::case::FnCase::new("a", |_| Ok(()));
        let mut run = CaseRun::new(0, false);
        run.set_status(true);

        let plain = ctx();
        plain.record(&case, &run);
        assert!(plain.take_outcomes().is_empty());

        let summarised = ctx().keep_outcomes();
        summarised.record(&case, &run);
        assert_eq!(summarised.take_outcomes(), vec![("a".to_string(), true)]);
        assert_eq!(summarised.counters().recorded, 1);
    }
}
