use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use surge_core::parse_timestamp;

use crate::aggregator::Aggregator;
use crate::error::{Error, Result};

/// First columns a report file must start with.
const HEADER_PREFIX: &str = r#""Repeat Index","Id","Description","Status""#;

static STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^"\d+","(.+?)",".*?","(Pass|Fail)""#).unwrap_or_else(|err| panic!("{err}"))
});

static TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#""(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{6})","(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{6})","([\d.]+)""#,
    )
    .unwrap_or_else(|err| panic!("{err}"))
});

/// Recomputes statistics from report files on disk.
///
/// `paths` may name files or folders (every regular file directly inside). Missing paths
/// and files that are not reports are logged and skipped.
pub fn calc(paths: &[PathBuf], group_minutes: u64) -> Result<Aggregator> {
    if paths.is_empty() {
        return Err(Error::NoInput);
    }
    let mut aggregator = Aggregator::with_group_minutes(group_minutes)?;

    for file in expand(paths) {
        tracing::info!("calculating for {}...", file.display());
        match ingest_file(&mut aggregator, &file) {
            Ok(true) => {}
            Ok(false) => tracing::warn!("not a report file, ignoring {}", file.display()),
            Err(err) => tracing::warn!("cannot read {}, ignoring: {err}", file.display()),
        }
    }

    Ok(aggregator)
}

fn expand(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            match fs::read_dir(path) {
                Ok(entries) => {
                    let mut found: Vec<PathBuf> = entries
                        .filter_map(|e| e.ok().map(|e| e.path()))
                        .filter(|p| p.is_file())
                        .collect();
                    found.sort();
                    files.extend(found);
                }
                Err(err) => tracing::warn!("cannot list {}: {err}", path.display()),
            }
        } else {
            tracing::warn!("cannot find {}", path.display());
        }
    }
    files
}

/// Returns `Ok(false)` when the first line is not a report header.
///
/// Rows are matched line by line: the id/status triple and the timing triple are found
/// independently, so an output column spanning several lines still counts once its
/// timing line shows up.
pub(crate) fn ingest_file(aggregator: &mut Aggregator, path: &Path) -> Result<bool> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut line = String::new();

    if reader.read_line(&mut line)? == 0 || !line.starts_with(HEADER_PREFIX) {
        return Ok(false);
    }

    let mut current: Option<(String, bool)> = None;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }

        if let Some(caps) = STATUS.captures(&line) {
            current = Some((caps[1].replace("\"\"", "\""), &caps[2] == "Pass"));
        }

        let Some(caps) = TIMING.captures(&line) else {
            continue;
        };
        let Some((case_id, is_pass)) = current.as_ref() else {
            continue;
        };
        let (Ok(start), Ok(end), Ok(elapsed)) = (
            parse_timestamp(&caps[1]),
            parse_timestamp(&caps[2]),
            caps[3].parse::<f64>(),
        ) else {
            tracing::debug!("unparsable timing in {}: {}", path.display(), line.trim_end());
            continue;
        };
        if let Err(err) = aggregator.ingest(case_id, start, end, elapsed, *is_pass) {
            tracing::warn!("skipping row in {}: {err}", path.display());
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = r#""Repeat Index","Id","Description","Status","Expected","Received","Output","Starts DateTime","Ends DateTime","E2E Taken","Log Path""#;

    fn write(dir: &Path, name: &str, body: &str) -> std::io::Result<PathBuf> {
        let path = dir.join(name);
        let mut f = File::create(&path)?;
        f.write_all(body.as_bytes())?;
        Ok(path)
    }

    #[test]
    fn multi_line_output_counts_once() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let body = format!(
            "{HEADER}\n\
\"0\",\"say \"\"hi\"\"\",\"\",\"Fail\",\"\",\"\",\"first line\n\
second line\",\"2024-03-01 10:00:00.000000\",\"2024-03-01 10:00:01.500000\",\"1.5\",\"\"\n\
\"1\",\"say \"\"hi\"\"\",\"\",\"Pass\",\"\",\"\",\"\",\"2024-03-01 10:00:02.000000\",\"2024-03-01 10:00:02.500000\",\"0.5\",\"\"\n"
        );
        let path = write(dir.path(), "report_1.csv", &body)?;

        let agg = calc(&[path], 60)?;
        let cases: Vec<_> = agg.cases().collect();
        assert_eq!(cases.len(), 1);
        let (id, stats) = cases[0];
        assert_eq!(id, "say \"hi\"");
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.fail_count, 1);
        assert_eq!(stats.average, 1.0);
        Ok(())
    }

    #[test]
    fn folder_input_skips_non_reports() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "notes.txt", "just some notes\n")?;
        write(
            dir.path(),
            "report_2.csv",
            &format!(
                "{HEADER}\n\"0\",\"a\",\"a\",\"Pass\",\"\",\"\",\"\",\"2024-03-01 10:00:00.000000\",\"2024-03-01 10:00:00.250000\",\"0.25\",\"\"\n"
            ),
        )?;

        let agg = calc(&[dir.path().to_path_buf(), dir.path().join("missing.csv")], 60)?;
        assert_eq!(agg.cases().count(), 1);
        Ok(())
    }

    #[test]
    fn nothing_found_is_empty() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write(dir.path(), "empty.csv", "")?;
        assert!(calc(&[path], 60)?.is_empty());
        assert!(matches!(calc(&[], 60), Err(Error::NoInput)));
        Ok(())
    }
}
