pub const TICK_RATE_MS: u64 = 1000;

pub const DEFAULT_DATA_FILE: &str = "ping_data.csv";
pub const DEFAULT_MAX_RECORDS: usize = 3600;

// Axis padding applied whenever the chart rescales to fresh data.
pub const X_PAD_SECS: i64 = 10;
pub const Y_PAD_MS: f64 = 10.0;

// Placeholder view shown until the first sample exists.
pub const EMPTY_X_SPAN_SECS: i64 = 120;
pub const EMPTY_Y_MAX_MS: f64 = 100.0;
