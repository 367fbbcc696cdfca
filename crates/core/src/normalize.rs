//! Telemetry normalization.
//!
//! Converts one raw [`UsageSample`] into [`ExtendedMetrics`]: a fixed set of
//! named metrics on a shared 0-100 percentage scale.
//!
//! Missing values stay missing. CPU, memory, GPU and storage are always
//! present as metrics, but their `percentage` is `None` when the raw field
//! is absent or unparseable; a reported `"0"` becomes `Some(0.0)`. The
//! optional metrics (GPU temperature, SSD health, GPU VRAM) are omitted
//! entirely when their raw field is absent.

use serde::Serialize;

use crate::metric_names::{
    METRIC_CPU, METRIC_GPU, METRIC_GPU_TEMPERATURE, METRIC_GPU_VRAM, METRIC_MEMORY,
    METRIC_SSD_HEALTH, METRIC_STORAGE,
};
use crate::snapshot::{de::parse_number, HardwareSpec, UsageSample};

/// Upper bound of the raw temperature range mapped onto 0-100%.
pub const TEMPERATURE_SCALE_MAX_CELSIUS: f64 = 100.0;

/// A value clamped to `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Percentage(f64);

impl Percentage {
    /// Clamp `value` into range. Non-finite input has no percentage.
    pub fn new(value: f64) -> Option<Self> {
        value.is_finite().then(|| Self(value.clamp(0.0, 100.0)))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Which visual scale family a metric belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Usage,
    Temperature,
    Storage,
    Health,
}

/// One graph-ready metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedMetric {
    pub name: &'static str,
    /// `None` means the value is unset and must not be drawn as 0%.
    pub percentage: Option<Percentage>,
    /// Human-readable reading, such as `"57.3%"`, `"72°C"` or `"812GB"`.
    pub raw_value_label: String,
    pub category: MetricCategory,
}

impl NormalizedMetric {
    fn unset(name: &'static str, category: MetricCategory) -> Self {
        Self {
            name,
            percentage: None,
            raw_value_label: String::new(),
            category,
        }
    }

    pub fn is_set(&self) -> bool {
        self.percentage.is_some()
    }
}

/// The fixed metric record handed to rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedMetrics {
    pub cpu: NormalizedMetric,
    pub memory: NormalizedMetric,
    pub gpu: NormalizedMetric,
    pub storage: NormalizedMetric,
    pub gpu_temperature: Option<NormalizedMetric>,
    pub ssd_health: Option<NormalizedMetric>,
    pub gpu_vram: Option<NormalizedMetric>,
}

impl ExtendedMetrics {
    /// Every metric that has a value, in display order.
    pub fn present(&self) -> Vec<&NormalizedMetric> {
        [&self.cpu, &self.memory, &self.gpu, &self.storage]
            .into_iter()
            .chain(self.gpu_temperature.as_ref())
            .chain(self.ssd_health.as_ref())
            .chain(self.gpu_vram.as_ref())
            .filter(|m| m.is_set())
            .collect()
    }
}

/// Normalize a usage sample on its own.
pub fn normalize(sample: &UsageSample) -> ExtendedMetrics {
    normalize_with_hardware(sample, None)
}

/// Normalize a usage sample, deriving the storage percentage from the
/// node's total capacity when the sample carries only used GB.
pub fn normalize_with_hardware(
    sample: &UsageSample,
    hardware: Option<&HardwareSpec>,
) -> ExtendedMetrics {
    ExtendedMetrics {
        cpu: percent_metric(METRIC_CPU, sample.cpu_usage_percent.as_deref(), MetricCategory::Usage)
            .unwrap_or_else(|| NormalizedMetric::unset(METRIC_CPU, MetricCategory::Usage)),
        memory: percent_metric(
            METRIC_MEMORY,
            sample.mem_usage_percent.as_deref(),
            MetricCategory::Usage,
        )
        .unwrap_or_else(|| NormalizedMetric::unset(METRIC_MEMORY, MetricCategory::Usage)),
        gpu: percent_metric(METRIC_GPU, sample.gpu_usage_percent.as_deref(), MetricCategory::Usage)
            .unwrap_or_else(|| NormalizedMetric::unset(METRIC_GPU, MetricCategory::Usage)),
        storage: storage_metric(sample, hardware),
        gpu_temperature: temperature_metric(METRIC_GPU_TEMPERATURE, sample.gpu_temp.as_deref()),
        ssd_health: percent_metric(
            METRIC_SSD_HEALTH,
            sample.ssd_health_percent.as_deref(),
            MetricCategory::Health,
        ),
        gpu_vram: percent_metric(
            METRIC_GPU_VRAM,
            sample.gpu_vram_percent.as_deref(),
            MetricCategory::Usage,
        ),
    }
}

fn percent_metric(
    name: &'static str,
    raw: Option<&str>,
    category: MetricCategory,
) -> Option<NormalizedMetric> {
    let value = raw.and_then(parse_number)?;
    let percentage = Percentage::new(value)?;
    Some(NormalizedMetric {
        name,
        percentage: Some(percentage),
        raw_value_label: format!("{}%", format_number(percentage.value())),
        category,
    })
}

fn temperature_metric(name: &'static str, raw: Option<&str>) -> Option<NormalizedMetric> {
    let celsius = raw.and_then(parse_number)?;
    let percentage = Percentage::new(celsius / TEMPERATURE_SCALE_MAX_CELSIUS * 100.0)?;
    Some(NormalizedMetric {
        name,
        percentage: Some(percentage),
        raw_value_label: format!("{}°C", format_number(celsius)),
        category: MetricCategory::Temperature,
    })
}

fn storage_metric(sample: &UsageSample, hardware: Option<&HardwareSpec>) -> NormalizedMetric {
    let used_gb = sample.used_storage_gb.as_deref().and_then(parse_number);
    let reported = sample
        .harddisk_used_percent
        .as_deref()
        .and_then(parse_number);
    let derived = || {
        let total = hardware.and_then(HardwareSpec::total_storage_gb)?;
        Some(used_gb? / total * 100.0)
    };

    NormalizedMetric {
        name: METRIC_STORAGE,
        percentage: reported.or_else(derived).and_then(Percentage::new),
        raw_value_label: used_gb
            .map(|gb| format!("{}GB", format_number(gb)))
            .unwrap_or_default(),
        category: MetricCategory::Storage,
    }
}

/// Whole numbers print without decimals, everything else with one.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}
