use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use super::context::RunContext;
use super::worker::{join_passes, spawn_pass};
use crate::case::CaseList;

/// One synchronous pass.
pub(crate) async fn normal(ctx: &Arc<RunContext>, cases: &CaseList, errors: &mut Vec<String>) {
    tracing::info!("starting testing...");
    join_passes(vec![spawn_pass(ctx, cases, 0, false)], errors).await;
}

/// `repeat_times` sequential passes, `interval` apart.
pub(crate) async fn continuous(
    ctx: &Arc<RunContext>,
    cases: &CaseList,
    repeat_times: u64,
    interval: Duration,
    errors: &mut Vec<String>,
) {
    for round in 0..repeat_times {
        if ctx.cancel.is_cancelled() {
            break;
        }
        tracing::info!("starting ({round}) round...");
        join_passes(vec![spawn_pass(ctx, cases, round, false)], errors).await;

        if round + 1 < repeat_times && !ctx.cancel.sleep(interval).await {
            break;
        }
    }
}

/// Rounds of `thread_count` parallel passes. A round ends only when all of its passes
/// have finished; the next one starts `interval` later.
pub(crate) async fn simultaneous(
    ctx: &Arc<RunContext>,
    cases: &CaseList,
    thread_count: u64,
    repeat_times: u64,
    interval: Duration,
    errors: &mut Vec<String>,
) {
    for round in 0..repeat_times {
        if ctx.cancel.is_cancelled() {
            break;
        }
        tracing::info!("starting ({round}) round...");

        let mut handles = Vec::with_capacity(thread_count as usize);
        for _ in 0..thread_count {
            if ctx.cancel.is_cancelled() {
                break;
            }
            handles.push(spawn_pass(ctx, cases, round, true));
        }
        join_passes(handles, errors).await;

        if round + 1 < repeat_times && !ctx.cancel.sleep(interval).await {
            break;
        }
    }
}

/// `thread_count` independent workers, each looping pass/sleep until cancelled.
pub(crate) async fn concurrency(
    ctx: &Arc<RunContext>,
    cases: &CaseList,
    thread_count: u64,
    interval: Duration,
    errors: &mut Vec<String>,
) {
    tracing::info!("starting {thread_count} workers...");

    let mut workers = JoinSet::new();
    for _ in 0..thread_count {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let ctx = ctx.clone();
        let cases = cases.clone();
        workers.spawn(async move {
            let mut errors = Vec::new();
            let mut repeat_index = 0u64;
            while !ctx.cancel.is_cancelled() {
                join_passes(vec![spawn_pass(&ctx, &cases, repeat_index, true)], &mut errors)
                    .await;
                repeat_index += 1;
                if !ctx.cancel.sleep(interval).await {
                    break;
                }
            }
            errors
        });
    }

    while let Some(res) = workers.join_next().await {
        match res {
            Ok(worker_errors) => errors.extend(worker_errors),
            Err(err) => {
                tracing::error!("worker loop failed: {err}");
                errors.push(format!("worker loop failed: {err}"));
            }
        }
    }
}

/// Every `interval`, launch up to `thread_count` passes without waiting for earlier ones,
/// keeping at most `max_thread_count` in flight when a cap is set. Stops launching after
/// `repeat_times` ticks and drains.
pub(crate) async fn frequent(
    ctx: &Arc<RunContext>,
    cases: &CaseList,
    thread_count: u64,
    max_thread_count: u64,
    repeat_times: u64,
    interval: Duration,
    errors: &mut Vec<String>,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut handles = Vec::new();
    for round in 0..repeat_times {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = ctx.cancel.cancelled() => break,
        }
        if ctx.cancel.is_cancelled() {
            break;
        }

        let available = ctx.admit(thread_count, max_thread_count);
        tracing::info!("starting ({round}) round...");
        for _ in 0..available {
            handles.push(spawn_pass(ctx, cases, round, true));
        }
        tracing::info!("initialized {available} workers");
    }

    join_passes(handles, errors).await;
}
