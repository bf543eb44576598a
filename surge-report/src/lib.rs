mod aggregator;
mod calc;
mod client;
mod error;
mod render;
mod rolling;
mod server;

pub use aggregator::{Aggregator, Bucket, MAX_SKIPPED_BUCKETS, Stats};
pub use calc::calc;
pub use client::{DEFAULT_DUMP_TIMEOUT, dump};
pub use error::{Error, Result};
pub use render::{CASE_TABLE_HEADER, GROUP_TABLE_HEADER, render};
pub use rolling::{DEFAULT_MAX_BYTES, RollingReport};
pub use server::{DUMP_COMMAND, NO_DATA, ReportServer, SUMMARY_TOO_LARGE, ServerConfig};
