//! Error-log burst detection
//!
//! Scans the tail of a service's structured error log and buckets matching
//! lines by their stamped second. A line counts when it starts with the
//! `E` severity marker followed by a `YYYYMMDD HH:MM:SS` local-time stamp
//! and that stamp falls inside the sliding window ending at `now`.

use chrono::{NaiveDate, NaiveTime, TimeZone};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

const TAIL_CHUNK: usize = 64 * 1024;

/// One scan result for one service.
#[derive(Debug, Clone, Default)]
pub struct ErrorLogWindow {
    /// Highest per-second error count observed inside the window
    pub peak: u32,
    /// Up to three most recent matching lines, newest first,
    /// newline-terminated; empty when nothing matched
    pub samples: String,
}

#[derive(Debug, Clone)]
pub struct ErrorRateDetector {
    window_secs: i64,
    /// Upper bound on lines read per scan, sized so a window-saturating
    /// burst still fits
    max_lines: usize,
}

impl ErrorRateDetector {
    pub fn new(window_secs: u64, alert_threshold: u32) -> Self {
        Self {
            window_secs: window_secs as i64,
            max_lines: window_secs as usize * alert_threshold as usize,
        }
    }

    /// Scan one error log as of `now_epoch`.
    ///
    /// A missing or unreadable log reads as an empty window; services that
    /// have never logged an error simply have no file yet.
    pub fn scan(&self, log_path: &Path, now_epoch: i64) -> ErrorLogWindow {
        let lines = match read_tail_lines(log_path, self.max_lines) {
            Ok(lines) => lines,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return ErrorLogWindow::default(),
            Err(e) => {
                debug!(path = %log_path.display(), error = %e, "error log unreadable");
                return ErrorLogWindow::default();
            }
        };

        let mut buckets: HashMap<i64, u32> = HashMap::new();
        let mut matched: Vec<&str> = Vec::new();
        for line in &lines {
            let Some(ts) = parse_error_stamp(line) else {
                continue;
            };
            if ts > now_epoch || now_epoch - ts >= self.window_secs {
                continue;
            }
            *buckets.entry(ts).or_insert(0) += 1;
            matched.push(line);
        }

        let peak = buckets.values().copied().max().unwrap_or(0);
        let samples = matched
            .iter()
            .rev()
            .take(3)
            .map(|line| format!("{line}\n"))
            .collect();

        ErrorLogWindow { peak, samples }
    }
}

/// Parse the `EYYYYMMDD HH:MM:SS` prefix into local epoch seconds.
/// Fractional seconds and everything after them are ignored.
fn parse_error_stamp(line: &str) -> Option<i64> {
    let stamp = line.strip_prefix('E')?.get(..17)?;
    let bytes = stamp.as_bytes();
    if bytes[8] != b' ' || bytes[11] != b':' || bytes[14] != b':' {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(
        stamp[..4].parse().ok()?,
        stamp[4..6].parse().ok()?,
        stamp[6..8].parse().ok()?,
    )?;
    let time = NaiveTime::from_hms_opt(
        stamp[9..11].parse().ok()?,
        stamp[12..14].parse().ok()?,
        stamp[15..17].parse().ok()?,
    )?;

    // DST-ambiguous wall times resolve to the earlier instant.
    chrono::Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.timestamp())
}

/// Read up to `max_lines` lines from the end of a file without walking
/// the whole thing, in fixed-size chunks back from EOF.
fn read_tail_lines(path: &Path, max_lines: usize) -> io::Result<Vec<String>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut pos = len;
    let mut data: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; TAIL_CHUNK];

    while pos > 0 {
        let read_len = TAIL_CHUNK.min(pos as usize);
        pos -= read_len as u64;
        file.seek(SeekFrom::Start(pos))?;
        file.read_exact(&mut chunk[..read_len])?;

        let mut head = chunk[..read_len].to_vec();
        head.extend_from_slice(&data);
        data = head;

        let newlines = data.iter().filter(|&&b| b == b'\n').count();
        if newlines > max_lines {
            break;
        }
    }

    let text = String::from_utf8_lossy(&data);
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    if lines.len() > max_lines {
        // Also drops any partial first line left by the chunk boundary.
        lines.drain(..lines.len() - max_lines);
    }
    Ok(lines)
}
