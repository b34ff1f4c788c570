//! Terminal ping monitor: probes a host once a second, charts the round
//! trip times, and keeps the history in a CSV file across runs.

pub mod app;
pub mod constants;
pub mod probe;
pub mod store;
pub mod ui;
pub mod util;
