use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};

use super::{Case, CaseRun};

/// Why a lifecycle step did not complete.
#[derive(Debug, thiserror::Error)]
pub enum CaseFailure {
    #[error("{0:#}")]
    Error(anyhow::Error),

    #[error("panicked: {message}")]
    Panic { message: String, trace: String },
}

impl CaseFailure {
    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };

        Self::Panic {
            message,
            trace: Backtrace::force_capture().to_string(),
        }
    }

    /// Text stored in the case output: the failure plus whatever trace was captured.
    pub fn trace(&self) -> String {
        match self {
            // `{:?}` on anyhow renders the cause chain and, when enabled, the backtrace.
            Self::Error(err) => format!("{err:?}"),
            Self::Panic { message, trace } => {
                format!("panicked: {message}\n{}", trace.trim_end())
            }
        }
    }
}

fn guard<T>(step: impl FnOnce() -> anyhow::Result<T>) -> Result<T, CaseFailure> {
    match panic::catch_unwind(AssertUnwindSafe(step)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CaseFailure::Error(err)),
        Err(payload) => Err(CaseFailure::from_panic(payload)),
    }
}

fn drive(case: &mut dyn Case, run: &mut CaseRun) -> Result<(), CaseFailure> {
    if !guard(|| case.initialize(run))? {
        run.set_status(false);
        return Ok(());
    }

    run.mark_start();
    let ran = guard(|| case.run(run));
    run.mark_end();
    if !ran? {
        run.set_status(false);
        return Ok(());
    }

    guard(|| case.verify(run))?;
    run.set_status(true);
    Ok(())
}

/// Executes one case through its full lifecycle.
///
/// Exactly one status transition happens, `dispose` always runs, and `on_finished` is
/// invoked once after `dispose` regardless of the outcome.
pub fn execute<F>(case: &mut dyn Case, mut run: CaseRun, on_finished: F) -> CaseRun
where
    F: FnOnce(&dyn Case, &CaseRun),
{
    if let Err(failure) = drive(case, &mut run) {
        run.mark_end();
        run.set_status(false);
        tracing::warn!(case = case.id(), repeat_index = run.repeat_index, "{failure}");
        run.output_messages.push(failure.trace());
    }

    if let Err(failure) = guard(|| case.dispose(&mut run)) {
        tracing::info!(case = case.id(), "dispose failed: {failure}");
    }

    tracing::info!(
        "Case[{}] is {}.",
        case.id(),
        if run.is_pass() { "Pass" } else { "Fail" }
    );

    on_finished(&*case, &run);
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        init: bool,
        run: bool,
        verify_fails: bool,
        disposed: Arc<AtomicUsize>,
    }

    impl Case for Scripted {
        fn id(&self) -> &str {
            "scripted"
        }

        fn fresh(&self) -> Box<dyn Case> {
            Box::new(Scripted {
                init: self.init,
                run: self.run,
                verify_fails: self.verify_fails,
                disposed: self.disposed.clone(),
            })
        }

        fn initialize(&mut self, _run: &mut CaseRun) -> anyhow::Result<bool> {
            Ok(self.init)
        }

        fn run(&mut self, run: &mut CaseRun) -> anyhow::Result<bool> {
            run.received = Some("42".to_string());
            Ok(self.run)
        }

        fn verify(&mut self, _run: &mut CaseRun) -> anyhow::Result<()> {
            if self.verify_fails {
                anyhow::bail!("expected 41");
            }
            Ok(())
        }

        fn dispose(&mut self, _run: &mut CaseRun) -> anyhow::Result<()> {
            self.disposed.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("dispose errors never change the status")
        }
    }

    fn scripted(init: bool, run: bool, verify_fails: bool) -> (Scripted, Arc<AtomicUsize>) {
        let disposed = Arc::new(AtomicUsize::new(0));
        let case = Scripted {
            init,
            run,
            verify_fails,
            disposed: disposed.clone(),
        };
        (case, disposed)
    }

    #[test]
    fn pass_path_sets_timestamps() {
        let (mut case, disposed) = scripted(true, true, false);
        let mut calls = 0;
        let run = execute(&mut case, CaseRun::new(3, false), |_, _| calls += 1);

        assert!(run.is_pass());
        assert_eq!(run.repeat_index, 3);
        assert!(run.start_time.is_some());
        assert!(run.end_time.is_some());
        assert!(run.time_taken().is_some());
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn initialize_false_skips_run() {
        let (mut case, disposed) = scripted(false, true, false);
        let run = execute(&mut case, CaseRun::new(0, false), |_, _| {});

        assert_eq!(run.status(), Some(false));
        assert_eq!(run.start_time, None);
        assert_eq!(run.received, None);
        assert!(run.output_messages.is_empty());
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_false_skips_verify() {
        let (mut case, disposed) = scripted(true, false, true);
        let run = execute(&mut case, CaseRun::new(0, false), |_, _| {});

        assert_eq!(run.status(), Some(false));
        assert!(run.output_messages.is_empty());
        assert!(run.end_time.is_some());
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn verify_error_is_captured() {
        let (mut case, _) = scripted(true, true, true);
        let run = execute(&mut case, CaseRun::new(0, false), |_, _| {});

        assert_eq!(run.status(), Some(false));
        assert_eq!(run.output_messages.len(), 1);
        assert!(run.output_messages[0].contains("expected 41"));
    }

    #[test]
    fn panic_message_is_kept_in_trace() {
        let failure = CaseFailure::from_panic(Box::new("boom"));
        assert!(failure.trace().starts_with("panicked: boom"));
        assert_eq!(failure.to_string(), "panicked: boom");
    }
}
