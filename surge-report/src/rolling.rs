use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use surge_core::{ResultRecord, report_header};

const FILE_NAME: &str = "report.csv";
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Server-side copy of every received record: `<folder>/report.csv`, rolled over to
/// `report.csv.<n>` before it would reach `max_bytes`.
///
/// A folder left behind by an earlier server is moved aside (`<folder>_<timestamp>`) on
/// the first write.
#[derive(Debug)]
pub struct RollingReport {
    folder: PathBuf,
    max_bytes: u64,
    next_index: u32,
    file: Option<(File, u64)>,
}

impl RollingReport {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            max_bytes: DEFAULT_MAX_BYTES,
            next_index: 1,
            file: None,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn path(&self) -> PathBuf {
        self.folder.join(FILE_NAME)
    }

    pub fn write(&mut self, record: &ResultRecord) -> io::Result<()> {
        let row = record.to_csv_row();

        match self.file.as_ref().map(|(_, size)| *size) {
            None => {
                self.move_old_folder_aside()?;
                fs::create_dir_all(&self.folder)?;
                self.open()?;
            }
            Some(size) if size + row.len() as u64 >= self.max_bytes => self.roll_over()?,
            Some(_) => {}
        }

        let Some((file, size)) = self.file.as_mut() else {
            return Err(io::Error::other("report file not open"));
        };
        file.write_all(row.as_bytes())?;
        file.flush()?;
        *size += row.len() as u64;
        Ok(())
    }

    fn move_old_folder_aside(&self) -> io::Result<()> {
        if !self.folder.exists() {
            return Ok(());
        }
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        let mut aside = OsString::from(self.folder.as_os_str());
        aside.push(format!("_{stamp}"));
        tracing::info!(
            "moving old report folder {} to {}",
            self.folder.display(),
            Path::new(&aside).display()
        );
        fs::rename(&self.folder, aside)
    }

    fn roll_over(&mut self) -> io::Result<()> {
        self.file = None;
        let source = self.path();
        if source.exists() {
            let mut target = OsString::from(source.as_os_str());
            target.push(format!(".{}", self.next_index));
            fs::rename(&source, target)?;
            self.next_index += 1;
        }
        self.open()
    }

    fn open(&mut self) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path())?;
        let header = report_header(&[]);
        file.write_all(header.as_bytes())?;
        file.flush()?;
        let size = file.metadata()?.len();
        self.file = Some((file, size));
        Ok(())
    }
}
