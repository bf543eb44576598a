use std::path::PathBuf;
use std::sync::Arc;

use super::cancel::CancelSignal;
use super::config::{Hook, Mode, ModeKind, RunOptions};
use super::context::{RunContext, RunCounters};
use super::error::{Error, Result};
use super::gate::ScheduleWindow;
use super::modes;
use crate::case::CaseList;
use crate::sink::ResultSink;

/// What a finished run looked like.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub mode: ModeKind,
    pub counters: RunCounters,
    /// Whether the run ended through cancellation (explicit or `ends_time`).
    pub cancelled: bool,
    /// The local report file, when one was written.
    pub report_path: Option<PathBuf>,
    /// `(case id, passed)` in execution order. Only filled in normal mode.
    pub outcomes: Vec<(String, bool)>,
    /// Worker and hook failures that did not abort the run.
    pub errors: Vec<String>,
}

/// Drives one case list through a scheduling mode.
pub struct Scheduler {
    cases: CaseList,
    mode: Mode,
    window: ScheduleWindow,
    options: RunOptions,
    cancel: Arc<CancelSignal>,
}

impl Scheduler {
    pub fn new(cases: CaseList, mode: Mode) -> Self {
        Self {
            cases,
            mode,
            window: ScheduleWindow::default(),
            options: RunOptions::default(),
            cancel: Arc::new(CancelSignal::new()),
        }
    }

    pub fn with_window(mut self, window: ScheduleWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Handle for cancelling the run from elsewhere (signal handler, another task).
    pub fn cancel_signal(&self) -> Arc<CancelSignal> {
        self.cancel.clone()
    }

    /// Stop launching new work. In-flight passes finish their current case list pass.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Runs to completion: wait for `starts_time`, setup, schedule, drain, finish.
    ///
    /// Only a sink that cannot be opened fails the run; case failures end up in the
    /// records, hook and worker failures in [`RunReport::errors`].
    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport {
            mode: self.mode.kind(),
            ..RunReport::default()
        };
        if self.cases.is_empty() {
            tracing::info!("no test cases to run");
            return Ok(report);
        }

        self.cancel.reset();
        let sink = ResultSink::open(
            self.options.report_server.as_deref(),
            self.options.no_report,
            &self.options.report_folder,
            &self.options.additional_report_header,
        )
        .map_err(Error::Sink)?;

        let mut ctx = RunContext::new(self.cancel.clone(), sink);
        if matches!(self.mode, Mode::Normal) {
            ctx = ctx.keep_outcomes();
        }
        let ctx = Arc::new(ctx);

        self.window.wait_for_start(&self.cancel).await;

        let mut setup_ran = false;
        if self.window.is_over() {
            tracing::info!("end time already passed, nothing to run");
            self.cancel.cancel();
        } else if !self.cancel.is_cancelled() {
            let watchdog = self.window.spawn_watchdog(self.cancel.clone());

            setup_ran = true;
            match run_hook("setup", self.options.setup.as_ref()) {
                Ok(()) => self.schedule(&ctx, &mut report.errors).await,
                Err(err) => report.errors.push(err),
            }

            if let Some(watchdog) = watchdog {
                watchdog.abort();
            }
        }

        report.report_path = self.process_finished(&ctx, setup_ran, &mut report.errors);
        report.counters = ctx.counters();
        report.cancelled = self.cancel.is_cancelled();
        report.outcomes = ctx.take_outcomes();

        if !report.outcomes.is_empty() {
            let summary = report
                .outcomes
                .iter()
                .map(|(id, passed)| format!("{id}\t{}", if *passed { "Pass" } else { "Fail" }))
                .collect::<Vec<_>>()
                .join("\n");
            tracing::info!("summary:\n{summary}");
        }

        Ok(report)
    }

    async fn schedule(&self, ctx: &Arc<RunContext>, errors: &mut Vec<String>) {
        let cases = &self.cases;
        match self.mode {
            Mode::Normal => modes::normal(ctx, cases, errors).await,
            Mode::Continuous {
                repeat_times,
                interval,
            } => modes::continuous(ctx, cases, repeat_times, interval, errors).await,
            Mode::Simultaneous {
                thread_count,
                repeat_times,
                interval,
            } => modes::simultaneous(ctx, cases, thread_count, repeat_times, interval, errors).await,
            Mode::Concurrency {
                thread_count,
                interval,
            } => modes::concurrency(ctx, cases, thread_count, interval, errors).await,
            Mode::Frequent {
                thread_count,
                max_thread_count,
                repeat_times,
                interval,
            } => {
                modes::frequent(
                    ctx,
                    cases,
                    thread_count,
                    max_thread_count,
                    repeat_times,
                    interval,
                    errors,
                )
                .await
            }
        }
    }

    /// Close the sink, hand the report to the notifier, tear down.
    fn process_finished(
        &self,
        ctx: &RunContext,
        setup_ran: bool,
        errors: &mut Vec<String>,
    ) -> Option<PathBuf> {
        let report_path = ctx.close_sink();

        if let (Some(notifier), Some(path)) = (self.options.notifier.as_ref(), report_path.as_ref())
            && let Err(err) = notifier.notify(path)
        {
            tracing::warn!("failed to deliver report {}: {err:#}", path.display());
            errors.push(format!("notify failed: {err:#}"));
        }

        if setup_ran && let Err(err) = run_hook("teardown", self.options.teardown.as_ref()) {
            errors.push(err);
        }

        tracing::info!("Completed all test cases!");
        report_path
    }
}

fn run_hook(name: &str, hook: Option<&Hook>) -> std::result::Result<(), String> {
    let Some(hook) = hook else {
        return Ok(());
    };
    hook().map_err(|err| {
        tracing::error!("{name} failed: {err:#}");
        format!("{name} failed: {err:#}")
    })
}
