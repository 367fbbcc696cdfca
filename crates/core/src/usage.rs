//! API usage accounting.
//!
//! [`UsageCounters`] aggregates the outcome of every snapshot fetch.
//! The client reports through [`UsageRecorder`] so it does not depend on
//! where the counters are kept.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Receives one report per completed fetch.
///
/// Implementations must not block for long and must not fail: recording
/// is bookkeeping and never affects the fetch result.
pub trait UsageRecorder: Send + Sync {
    fn record_api_call(&self, latency: Duration, success: bool, bytes: u64);
}

/// Recorder that discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl UsageRecorder for NoopRecorder {
    fn record_api_call(&self, _latency: Duration, _success: bool, _bytes: u64) {}
}

/// Aggregated fetch statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UsageCounters {
    pub total_calls: u64,
    pub success_count: u64,
    pub fail_count: u64,
    pub total_bytes: u64,
    pub avg_latency_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_latency_ms: Option<u64>,
}

impl UsageCounters {
    /// Fold one call into the counters.
    pub fn record(&mut self, latency: Duration, success: bool, bytes: u64) {
        let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);

        self.total_calls += 1;
        if success {
            self.success_count += 1;
            self.total_bytes = self.total_bytes.saturating_add(bytes);
        } else {
            self.fail_count += 1;
        }

        // Running mean over every call, successful or not.
        let n = self.total_calls as f64;
        self.avg_latency_ms += (latency_ms as f64 - self.avg_latency_ms) / n;
        self.min_latency_ms = Some(self.min_latency_ms.map_or(latency_ms, |m| m.min(latency_ms)));
        self.max_latency_ms = Some(self.max_latency_ms.map_or(latency_ms, |m| m.max(latency_ms)));
    }

    /// Share of successful calls in percent; `0.0` before the first call.
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.success_count as f64 / self.total_calls as f64 * 100.0
        }
    }
}

/// Render a byte count with a binary unit, e.g. `"1.5 KB"`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
