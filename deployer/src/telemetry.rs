//! Interface traffic telemetry

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::DeployerError;

/// Command printing one traffic sample for `interface`
pub fn monitor_traffic_command(interface: &str) -> String {
    format!("/interface monitor-traffic interface={} once", interface)
}

/// Throughput of one interface in bits per second
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficStats {
    pub rx: f64,
    pub tx: f64,
}

/// Parse the output of [`monitor_traffic_command`].
///
/// Missing fields read as zero. Values may carry a `bps`, `kbps`, `Mbps` or
/// `Gbps` unit.
pub fn parse_monitor_output(output: &str) -> Result<TrafficStats, DeployerError> {
    Ok(TrafficStats {
        rx: parse_field(output, "rx-bits-per-second")?,
        tx: parse_field(output, "tx-bits-per-second")?,
    })
}

fn parse_field(output: &str, field: &str) -> Result<f64, DeployerError> {
    let pattern = Regex::new(&format!(r"{}:\s*([\d.]+)([kMGT]?bps)?", regex::escape(field)))
        .map_err(|e| DeployerError::Internal(format!("invalid traffic pattern: {}", e)))?;

    let Some(captures) = pattern.captures(output) else {
        return Ok(0.0);
    };
    let value: f64 = captures[1]
        .parse()
        .map_err(|_| DeployerError::ValidationError(format!("bad {} value: {}", field, &captures[1])))?;
    let unit = captures.get(2).map(|m| m.as_str()).unwrap_or("bps");
    Ok(convert_to_bps(value, unit))
}

/// Scale `value` given in `unit` to bits per second
pub fn convert_to_bps(value: f64, unit: &str) -> f64 {
    match unit.to_ascii_lowercase().chars().next() {
        Some('k') => value * 1_000.0,
        Some('m') => value * 1_000_000.0,
        Some('g') => value * 1_000_000_000.0,
        Some('t') => value * 1_000_000_000_000.0,
        _ => value,
    }
}
