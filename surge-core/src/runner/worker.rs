use std::sync::Arc;

use tokio::task::JoinHandle;

use super::context::RunContext;
use crate::case::{CaseList, CaseRun, execute};

/// Runs a fresh copy of every case, in order, on the current thread.
///
/// Cancellation is checked before each case; a case that already started always runs to
/// the end of its `dispose`.
pub(crate) fn run_pass(ctx: &RunContext, cases: &CaseList, repeat_index: u64, under_stress: bool) {
    for proto in cases.iter() {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let mut case = proto.fresh();
        let run = CaseRun::new(repeat_index, under_stress);
        execute(case.as_mut(), run, |case, run| ctx.record(case, run));
    }
}

/// Marks the pass finished even if the worker thread unwinds.
struct PassGuard<'a>(&'a RunContext);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.pass_finished();
    }
}

/// Launches one pass on the blocking pool. The pass is counted as started before this
/// returns.
pub(crate) fn spawn_pass(
    ctx: &Arc<RunContext>,
    cases: &CaseList,
    repeat_index: u64,
    under_stress: bool,
) -> JoinHandle<()> {
    ctx.pass_started();
    let ctx = ctx.clone();
    let cases = cases.clone();
    tokio::task::spawn_blocking(move || {
        let _finished = PassGuard(&ctx);
        run_pass(&ctx, &cases, repeat_index, under_stress);
    })
}

/// Awaits a batch of passes. Join failures are logged and collected, never propagated.
pub(crate) async fn join_passes(handles: Vec<JoinHandle<()>>, errors: &mut Vec<String>) {
    for h in handles {
        if let Err(err) = h.await {
            tracing::error!("worker failed: {err}");
            errors.push(format!("worker failed: {err}"));
        }
    }
}
