use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::notify::ReportNotifier;

use super::error::{Error, Result};

/// Run-level hook (setup/teardown), invoked once per run.
pub type Hook = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ModeKind {
    /// Run the case list once.
    #[default]
    #[strum(to_string = "normal", serialize = "0")]
    Normal,
    /// Repeat the sequential pass `repeat_times` times.
    #[strum(to_string = "continuous", serialize = "1")]
    Continuous,
    /// Rounds of `thread_count` parallel passes, joined before the next round.
    #[strum(to_string = "simultaneous", serialize = "2")]
    Simultaneous,
    /// `thread_count` workers looping independently until cancelled.
    #[strum(to_string = "concurrency", serialize = "3")]
    Concurrency,
    /// A new round every interval, bounded by `max_thread_count` in-flight passes.
    #[strum(to_string = "frequent", serialize = "4")]
    Frequent,
}

impl ModeKind {
    pub fn parse(raw: &str) -> Result<Self> {
        raw.trim()
            .parse()
            .map_err(|_| Error::InvalidMode(raw.to_string()))
    }
}

/// Every scheduler knob in one place. Which ones matter depends on `kind`.
#[derive(Debug, Clone)]
pub struct ModeConfig {
    pub kind: ModeKind,
    pub thread_count: u64,
    pub repeat_times: u64,
    pub interval: Duration,
    /// Admission cap for frequent mode; `0` disables it.
    pub max_thread_count: u64,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            kind: ModeKind::Normal,
            thread_count: 1,
            repeat_times: 1,
            interval: Duration::ZERO,
            max_thread_count: 0,
        }
    }
}

impl ModeConfig {
    pub fn into_mode(self) -> Result<Mode> {
        let needs_threads = matches!(
            self.kind,
            ModeKind::Simultaneous | ModeKind::Concurrency | ModeKind::Frequent
        );
        if needs_threads && self.thread_count == 0 {
            return Err(Error::InvalidThreadCount);
        }

        let needs_repeats = matches!(
            self.kind,
            ModeKind::Continuous | ModeKind::Simultaneous | ModeKind::Frequent
        );
        if needs_repeats && self.repeat_times == 0 {
            return Err(Error::InvalidRepeatTimes);
        }

        Ok(match self.kind {
            ModeKind::Normal => Mode::Normal,
            ModeKind::Continuous => Mode::Continuous {
                repeat_times: self.repeat_times,
                interval: self.interval,
            },
            ModeKind::Simultaneous => Mode::Simultaneous {
                thread_count: self.thread_count,
                repeat_times: self.repeat_times,
                interval: self.interval,
            },
            ModeKind::Concurrency => Mode::Concurrency {
                thread_count: self.thread_count,
                interval: self.interval,
            },
            ModeKind::Frequent => Mode::Frequent {
                thread_count: self.thread_count,
                max_thread_count: self.max_thread_count,
                repeat_times: self.repeat_times,
                interval: self.interval.max(Duration::from_secs(1)),
            },
        })
    }
}

/// Validated scheduling mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Continuous {
        repeat_times: u64,
        interval: Duration,
    },
    Simultaneous {
        thread_count: u64,
        repeat_times: u64,
        interval: Duration,
    },
    Concurrency {
        thread_count: u64,
        interval: Duration,
    },
    Frequent {
        thread_count: u64,
        max_thread_count: u64,
        repeat_times: u64,
        interval: Duration,
    },
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Normal => ModeKind::Normal,
            Self::Continuous { .. } => ModeKind::Continuous,
            Self::Simultaneous { .. } => ModeKind::Simultaneous,
            Self::Concurrency { .. } => ModeKind::Concurrency,
            Self::Frequent { .. } => ModeKind::Frequent,
        }
    }
}

/// Reporting and hook settings for a run.
#[derive(Clone)]
pub struct RunOptions {
    pub report_folder: PathBuf,
    pub no_report: bool,
    /// `host[:port]` of a report server. When set, records are sent there instead of the
    /// local report file.
    pub report_server: Option<String>,
    pub additional_report_header: Vec<String>,
    pub setup: Option<Hook>,
    pub teardown: Option<Hook>,
    pub notifier: Option<Arc<dyn ReportNotifier>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            report_folder: PathBuf::from("reports"),
            no_report: false,
            report_server: None,
            additional_report_header: Vec::new(),
            setup: None,
            teardown: None,
            notifier: None,
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("report_folder", &self.report_folder)
            .field("no_report", &self.no_report)
            .field("report_server", &self.report_server)
            .field("additional_report_header", &self.additional_report_header)
            .field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}
