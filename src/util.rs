use chrono::{Local, TimeZone};

// Format function: pick a unit that keeps the number readable
pub fn format_latency(latency_ms: f64) -> String {
    const SEC: f64 = 1000.0;

    if latency_ms >= SEC {
        format!("{:.2} s", latency_ms / SEC)
    } else if latency_ms >= 1.0 {
        format!("{:.1} ms", latency_ms)
    } else {
        format!("{:.3} ms", latency_ms)
    }
}

/// Axis tick label for an X value (milliseconds since the Unix epoch).
pub fn format_axis_time(epoch_ms: f64) -> String {
    match Local.timestamp_millis_opt(epoch_ms as i64) {
        chrono::LocalResult::Single(t) => t.format("%H:%M:%S").to_string(),
        _ => String::new(),
    }
}
