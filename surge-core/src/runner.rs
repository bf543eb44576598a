mod cancel;
mod config;
mod context;
mod error;
mod gate;
mod modes;
mod run;
mod worker;

pub use cancel::CancelSignal;
pub use config::{Hook, Mode, ModeConfig, ModeKind, RunOptions};
pub use context::RunCounters;
pub use error::{Error, Result};
pub use gate::ScheduleWindow;
pub use run::{RunReport, Scheduler};
