use std::io;
use std::path::{Path, PathBuf};

mod csv;
mod udp;

pub use csv::CsvReport;
pub use udp::{DEFAULT_REPORT_PORT, UdpReporter, parse_report_server};

use crate::record::ResultRecord;

/// Where finished cases go for one run. Exactly one target is active.
#[derive(Debug)]
pub enum ResultSink {
    /// Append one CSV row per record to a local report file.
    File(CsvReport),
    /// Send one datagram per record to a report server.
    Remote(UdpReporter),
    /// Reporting disabled.
    Discard,
}

impl ResultSink {
    /// Picks the remote target when a report server is configured, the local file otherwise.
    pub fn open(
        report_server: Option<&str>,
        no_report: bool,
        report_folder: &Path,
        extra_headers: &[String],
    ) -> io::Result<Self> {
        if let Some(server) = report_server {
            return Ok(Self::Remote(UdpReporter::connect(server)?));
        }
        if no_report {
            return Ok(Self::Discard);
        }
        Ok(Self::File(CsvReport::create(report_folder, extra_headers)?))
    }

    pub fn write(&mut self, record: &ResultRecord) -> io::Result<()> {
        match self {
            Self::File(report) => report.append(record),
            Self::Remote(reporter) => reporter.send(record),
            Self::Discard => Ok(()),
        }
    }

    pub fn close(&mut self) -> io::Result<()> {
        match self {
            Self::File(report) => report.close(),
            Self::Remote(_) | Self::Discard => Ok(()),
        }
    }

    pub fn report_path(&self) -> Option<PathBuf> {
        match self {
            Self::File(report) => Some(report.path().to_path_buf()),
            Self::Remote(_) | Self::Discard => None,
        }
    }
}
