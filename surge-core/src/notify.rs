use std::path::Path;

/// Delivers a finished report somewhere (mail, chat, object storage).
///
/// Called once per run, after the report file is closed. Errors are logged by the
/// scheduler and never fail the run.
pub trait ReportNotifier: Send + Sync {
    fn notify(&self, report_path: &Path) -> anyhow::Result<()>;
}
