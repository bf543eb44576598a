mod case;
mod notify;
mod record;
mod sink;

pub mod runner;

pub use case::{Case, CaseFailure, CaseList, CaseRun, FnCase, execute};
pub use notify::ReportNotifier;
pub use record::{
    REPORT_HEADER, ResultRecord, TIMESTAMP_FORMAT, csv_escape, format_timestamp, parse_timestamp,
    report_header,
};
pub use sink::{CsvReport, DEFAULT_REPORT_PORT, ResultSink, UdpReporter, parse_report_server};
