use std::path::PathBuf;

use chrono::{DateTime, Duration, Local};
use log::debug;

use crate::constants::{EMPTY_X_SPAN_SECS, EMPTY_Y_MAX_MS, X_PAD_SECS, Y_PAD_MS};
use crate::probe::LatencyProbe;
use crate::store::{self, Sample, SampleWindow, StoreError};

/// Chart extents in chart units: milliseconds since the Unix epoch on X,
/// latency in milliseconds on Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBounds {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

impl AxisBounds {
    /// Bounds for an empty window: a two-minute span starting at `now` and
    /// a fixed latency range, so the chart frame renders before any data.
    pub fn placeholder(now: DateTime<Local>) -> Self {
        Self {
            x: [
                now.timestamp_millis() as f64,
                (now + Duration::seconds(EMPTY_X_SPAN_SECS)).timestamp_millis() as f64,
            ],
            y: [0.0, EMPTY_Y_MAX_MS],
        }
    }

    /// Bounds fitted to the window, padded past the newest sample and the
    /// worst latency. None when the window holds nothing to fit.
    pub fn for_window(window: &SampleWindow) -> Option<Self> {
        let first = window.first()?;
        let last = window.last()?;
        let worst = window.max_latency()?;
        Some(Self {
            x: [
                first.timestamp.timestamp_millis() as f64,
                (last.timestamp + Duration::seconds(X_PAD_SECS)).timestamp_millis() as f64,
            ],
            y: [0.0, worst + Y_PAD_MS],
        })
    }
}

// Main application state
pub struct App {
    pub host: String,
    pub data_file: PathBuf,
    pub window: SampleWindow,
    pub bounds: AxisBounds,

    pub probes_sent: u64,
    pub probes_failed: u64,
    pub started_at: DateTime<Local>,

    probe: Box<dyn LatencyProbe>,
}

impl App {
    pub fn new(
        host: String,
        data_file: PathBuf,
        window: SampleWindow,
        probe: Box<dyn LatencyProbe>,
    ) -> App {
        let bounds =
            AxisBounds::for_window(&window).unwrap_or_else(|| AxisBounds::placeholder(Local::now()));
        App {
            host,
            data_file,
            window,
            bounds,
            probes_sent: 0,
            probes_failed: 0,
            started_at: Local::now(),
            probe,
        }
    }

    /// One measurement cycle: probe the host, record the sample in memory
    /// and on disk, refit the axes. A failed probe leaves everything as it
    /// was; a failed write is fatal.
    pub fn on_tick(&mut self) -> Result<(), StoreError> {
        let timestamp = store::now_micros();
        self.probes_sent += 1;

        let Some(latency_ms) = self.probe.probe(&self.host) else {
            self.probes_failed += 1;
            debug!("no reply from {}", self.host);
            return Ok(());
        };

        store::append_and_persist(
            &self.data_file,
            &mut self.window,
            Sample {
                timestamp,
                latency_ms,
            },
        )?;

        if let Some(bounds) = AxisBounds::for_window(&self.window) {
            self.bounds = bounds;
        }
        Ok(())
    }

    pub fn last_latency(&self) -> Option<f64> {
        self.window.last().map(|s| s.latency_ms)
    }
}
