use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::record::{ResultRecord, report_header};

/// Local report file: `<folder>/report_<timestamp>.csv`.
#[derive(Debug)]
pub struct CsvReport {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl CsvReport {
    pub fn create(folder: &Path, extra_headers: &[String]) -> io::Result<Self> {
        fs::create_dir_all(folder)?;
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%6f");
        let path = folder.join(format!("report_{stamp}.csv"));

        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(report_header(extra_headers).as_bytes())?;
        writer.flush()?;

        Ok(Self {
            path,
            writer: Some(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows are flushed one by one so a crashed run still leaves a readable report.
    pub fn append(&mut self, record: &ResultRecord) -> io::Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(io::Error::other("report file already closed"));
        };
        writer.write_all(record.to_csv_row().as_bytes())?;
        writer.flush()
    }

    pub fn close(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }
}
