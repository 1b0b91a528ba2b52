//! Status transition reporting
//!
//! Appends human-readable up/down lines to a day-partitioned report file.

use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::error::Result;

pub struct StatusReporter {
    dir: PathBuf,
}

impl StatusReporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Report file for the day containing `now`.
    pub fn file_for(&self, now: DateTime<Local>) -> PathBuf {
        self.dir
            .join(format!("report_msg_{}.log", now.format("%Y%m%d")))
    }

    /// Append accumulated transition lines for one tick. Empty content is
    /// a no-op so quiet ticks never touch the filesystem.
    pub fn append(&self, now: DateTime<Local>, content: &str) -> Result<()> {
        if content.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_for(now))?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn appends_into_the_day_file() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = StatusReporter::new(dir.path().join("report_log"));
        let noon = Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();

        reporter
            .append(noon, "service worker_8080 4321 up 2024-06-15 12:00:00\n")
            .unwrap();
        reporter
            .append(noon, "service worker_8080 4321 down 2024-06-15 12:00:05\n")
            .unwrap();

        let content = fs::read_to_string(reporter.file_for(noon)).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(reporter
            .file_for(noon)
            .ends_with("report_log/report_msg_20240615.log"));
    }

    #[test]
    fn days_get_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = StatusReporter::new(dir.path().join("report_log"));
        let day_one = Local.with_ymd_and_hms(2024, 6, 15, 23, 59, 59).unwrap();
        let day_two = Local.with_ymd_and_hms(2024, 6, 16, 0, 0, 1).unwrap();

        reporter.append(day_one, "first\n").unwrap();
        reporter.append(day_two, "second\n").unwrap();

        assert_ne!(reporter.file_for(day_one), reporter.file_for(day_two));
        assert_eq!(
            fs::read_to_string(reporter.file_for(day_two)).unwrap(),
            "second\n"
        );
    }

    #[test]
    fn empty_content_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let report_dir = dir.path().join("report_log");
        let reporter = StatusReporter::new(&report_dir);
        let noon = Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();

        reporter.append(noon, "").unwrap();
        assert!(!report_dir.exists());
    }
}
