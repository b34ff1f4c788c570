//! Sample storage: the bounded in-memory window and its on-disk table.
//!
//! The persisted format is a two-column CSV, `timestamp,ping_time`, rewritten
//! in full after every successful probe. Timestamps are local wall-clock
//! times at microsecond precision so a rewrite-then-reload round-trips.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike};
use thiserror::Error;

pub const CSV_HEADER: &str = "timestamp,ping_time";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One successful probe: when it ran and what it measured.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub latency_ms: f64,
}

/// How much history to hydrate at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Every persisted row.
    All,
    /// Only the newest n rows.
    Newest(usize),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access data file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed data file {} at line {line}: {reason}", path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// Ordered sample history, oldest first, capped at `max_records` on append.
///
/// Hydration may exceed the cap (a full load of a larger, older file); the
/// next push re-establishes it by dropping from the oldest end.
#[derive(Debug)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    max_records: usize,
}

impl SampleWindow {
    pub fn new(max_records: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            max_records,
        }
    }

    pub fn from_samples(samples: Vec<Sample>, max_records: usize) -> Self {
        Self {
            samples: samples.into(),
            max_records,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.max_records {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn min_latency(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.latency_ms).reduce(f64::min)
    }

    pub fn max_latency(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.latency_ms).reduce(f64::max)
    }

    pub fn avg_latency(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.samples.iter().map(|s| s.latency_ms).sum();
        Some(sum / self.samples.len() as f64)
    }
}

/// Now, truncated to the microsecond precision the data file preserves, so
/// in-memory samples always equal their reloaded form.
pub fn now_micros() -> DateTime<Local> {
    let now = Local::now();
    now.with_nanosecond(now.nanosecond() / 1000 * 1000)
        .unwrap_or(now)
}

/// Hydrate a window from the data file.
///
/// A missing file yields an empty window. Any malformed content (header or
/// row) is fatal; fully blank lines are skipped.
pub fn load(path: &Path, policy: LoadPolicy, max_records: usize) -> Result<SampleWindow, StoreError> {
    if !path.exists() {
        return Ok(SampleWindow::new(max_records));
    }
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rows: Vec<Sample> = Vec::new();
    let mut saw_header = false;
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if !saw_header {
            if line.trim() != CSV_HEADER {
                return Err(StoreError::Corrupt {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: format!("expected header `{CSV_HEADER}`"),
                });
            }
            saw_header = true;
            continue;
        }
        let sample = parse_row(line).map_err(|reason| StoreError::Corrupt {
            path: path.to_path_buf(),
            line: idx + 1,
            reason,
        })?;
        rows.push(sample);
    }
    if !saw_header {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            line: 1,
            reason: format!("expected header `{CSV_HEADER}`"),
        });
    }

    let keep = match policy {
        LoadPolicy::All => rows.len(),
        LoadPolicy::Newest(n) => n.min(rows.len()),
    };
    if keep < rows.len() {
        rows.drain(..rows.len() - keep);
    }
    Ok(SampleWindow::from_samples(rows, max_records))
}

/// Overwrite the data file with the full current window.
pub fn persist(path: &Path, window: &SampleWindow) -> Result<(), StoreError> {
    let io_err = |source: io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{CSV_HEADER}").map_err(io_err)?;
    for sample in window.iter() {
        writeln!(
            out,
            "{},{}",
            sample.timestamp.format(TIMESTAMP_FORMAT),
            sample.latency_ms
        )
        .map_err(io_err)?;
    }
    out.flush().map_err(io_err)
}

/// Append a sample (dropping the oldest past the cap) and rewrite the file.
pub fn append_and_persist(
    path: &Path,
    window: &mut SampleWindow,
    sample: Sample,
) -> Result<(), StoreError> {
    window.push(sample);
    persist(path, window)
}

fn parse_row(line: &str) -> Result<Sample, String> {
    let (ts, latency) = line
        .split_once(',')
        .ok_or_else(|| "expected two comma-separated columns".to_string())?;
    let timestamp = parse_timestamp(ts)?;
    let latency_ms: f64 = latency
        .trim()
        .parse()
        .map_err(|_| format!("invalid ping_time `{latency}`"))?;
    Ok(Sample {
        timestamp,
        latency_ms,
    })
}

fn parse_timestamp(text: &str) -> Result<DateTime<Local>, String> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| format!("invalid timestamp `{text}`: {e}"))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| format!("timestamp `{text}` does not exist in the local timezone"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample(ts: &str, latency_ms: f64) -> Sample {
        Sample {
            timestamp: parse_timestamp(ts).unwrap(),
            latency_ms,
        }
    }

    fn window_of(samples: Vec<Sample>, max_records: usize) -> SampleWindow {
        SampleWindow::from_samples(samples, max_records)
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let w = load(&dir.path().join("none.csv"), LoadPolicy::All, 10).unwrap();
        assert!(w.is_empty());
        assert_eq!(w.max_records(), 10);
    }

    #[test]
    fn header_only_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "timestamp,ping_time\n").unwrap();
        let w = load(&path, LoadPolicy::All, 10).unwrap();
        assert!(w.is_empty());
    }

    #[test]
    fn round_trip_preserves_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let original = vec![
            sample("2024-05-01 12:00:00.000000", 0.045),
            sample("2024-05-01 12:00:01.123456", 18.2),
            sample("2024-05-01 12:00:02.500000", 7.0),
        ];
        persist(&path, &window_of(original.clone(), 10)).unwrap();

        let reloaded = load(&path, LoadPolicy::All, 10).unwrap();
        let got: Vec<Sample> = reloaded.iter().cloned().collect();
        assert_eq!(got, original);
    }

    #[test]
    fn newest_policy_keeps_suffix_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let rows: Vec<Sample> = (0..5)
            .map(|i| sample(&format!("2024-05-01 12:00:0{i}.000000"), i as f64))
            .collect();
        persist(&path, &window_of(rows, 10)).unwrap();

        let w = load(&path, LoadPolicy::Newest(2), 10).unwrap();
        let latencies: Vec<f64> = w.iter().map(|s| s.latency_ms).collect();
        assert_eq!(latencies, vec![3.0, 4.0]);
    }

    #[test]
    fn newest_policy_larger_than_file_keeps_all() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let rows = vec![sample("2024-05-01 12:00:00.000000", 1.0)];
        persist(&path, &window_of(rows, 10)).unwrap();

        let w = load(&path, LoadPolicy::Newest(50), 10).unwrap();
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn push_drops_oldest_past_cap() {
        let mut w = SampleWindow::new(2);
        w.push(sample("2024-05-01 12:00:00.000000", 1.0));
        w.push(sample("2024-05-01 12:00:01.000000", 2.0));
        w.push(sample("2024-05-01 12:00:02.000000", 3.0));
        let latencies: Vec<f64> = w.iter().map(|s| s.latency_ms).collect();
        assert_eq!(latencies, vec![2.0, 3.0]);
    }

    #[test]
    fn full_load_exceeds_cap_until_next_push() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let rows: Vec<Sample> = (0..5)
            .map(|i| sample(&format!("2024-05-01 12:00:0{i}.000000"), i as f64))
            .collect();
        persist(&path, &window_of(rows, 10)).unwrap();

        let mut w = load(&path, LoadPolicy::All, 3).unwrap();
        assert_eq!(w.len(), 5);

        w.push(sample("2024-05-01 12:00:05.000000", 5.0));
        let latencies: Vec<f64> = w.iter().map(|s| s.latency_ms).collect();
        assert_eq!(latencies, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn append_and_persist_rolls_oldest_out_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut w = window_of(
            vec![
                sample("2024-05-01 12:00:00.000000", 1.0),
                sample("2024-05-01 12:00:01.000000", 2.0),
            ],
            2,
        );
        append_and_persist(&path, &mut w, sample("2024-05-01 12:00:02.000000", 3.0)).unwrap();

        let reloaded = load(&path, LoadPolicy::All, 2).unwrap();
        let latencies: Vec<f64> = reloaded.iter().map(|s| s.latency_ms).collect();
        assert_eq!(latencies, vec![2.0, 3.0]);
    }

    #[test]
    fn malformed_latency_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(
            &path,
            "timestamp,ping_time\n2024-05-01 12:00:00.000000,not-a-number\n",
        )
        .unwrap();
        match load(&path, LoadPolicy::All, 10) {
            Err(StoreError::Corrupt { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn malformed_timestamp_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "timestamp,ping_time\nyesterday,1.0\n").unwrap();
        assert!(matches!(
            load(&path, LoadPolicy::All, 10),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn missing_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "timestamp,ping_time\n2024-05-01 12:00:00.000000\n").unwrap();
        assert!(matches!(
            load(&path, LoadPolicy::All, 10),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn wrong_header_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "time,latency\n").unwrap();
        assert!(matches!(
            load(&path, LoadPolicy::All, 10),
            Err(StoreError::Corrupt { line: 1, .. })
        ));
    }

    #[test]
    fn empty_existing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "").unwrap();
        assert!(matches!(
            load(&path, LoadPolicy::All, 10),
            Err(StoreError::Corrupt { line: 1, .. })
        ));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(
            &path,
            "timestamp,ping_time\n\n2024-05-01 12:00:00.000000,1.5\n\n",
        )
        .unwrap();
        let w = load(&path, LoadPolicy::All, 10).unwrap();
        assert_eq!(w.len(), 1);
        assert_eq!(w.last().unwrap().latency_ms, 1.5);
    }

    #[test]
    fn timestamps_without_fraction_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "timestamp,ping_time\n2024-05-01 12:00:00,1.5\n").unwrap();
        let w = load(&path, LoadPolicy::All, 10).unwrap();
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn latency_extremes_over_window() {
        let w = window_of(
            vec![
                sample("2024-05-01 12:00:00.000000", 4.0),
                sample("2024-05-01 12:00:01.000000", 1.0),
                sample("2024-05-01 12:00:02.000000", 7.0),
            ],
            10,
        );
        assert_eq!(w.min_latency(), Some(1.0));
        assert_eq!(w.max_latency(), Some(7.0));
        assert_eq!(w.avg_latency(), Some(4.0));
        assert_eq!(SampleWindow::new(5).max_latency(), None);
    }

    #[test]
    fn now_micros_has_no_sub_microsecond_part() {
        assert_eq!(now_micros().nanosecond() % 1000, 0);
    }
}
