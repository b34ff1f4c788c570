use std::process::Command;

/// One best-effort latency probe against a host.
///
/// Implementations return the round-trip time in milliseconds, or `None` when
/// no latency was obtained. A failed probe is not an error: the caller skips
/// the sample and tries again on the next tick.
pub trait LatencyProbe {
    fn probe(&self, host: &str) -> Option<f64>;
}

/// Probes by shelling out to the system `ping` binary, one echo per call.
///
/// The call blocks until `ping` exits; no timeout is imposed beyond whatever
/// the binary itself enforces.
pub struct SystemPing;

impl LatencyProbe for SystemPing {
    fn probe(&self, host: &str) -> Option<f64> {
        let output = Command::new("ping")
            .args(["-c", "1", host])
            .output()
            .ok()?;
        parse_latency_ms(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Pull the latency out of raw ping output.
///
/// Success is the presence of a `time=` marker; the value is whatever sits
/// between the last such marker and the ` ms` that follows it. Output without
/// the marker, or with a non-numeric value, yields `None`.
pub fn parse_latency_ms(output: &str) -> Option<f64> {
    let (_, tail) = output.rsplit_once("time=")?;
    let value = tail.split(" ms").next()?;
    value.trim().parse().ok()
}
