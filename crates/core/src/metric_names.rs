//! Display names for normalized metrics.
//!
//! These are the `name` values carried by every
//! [`NormalizedMetric`](crate::normalize::NormalizedMetric) and the keys the
//! rendering layer uses to pick colours and icons.

/// Host CPU utilization.
pub const METRIC_CPU: &str = "CPU";

/// Host memory utilization.
pub const METRIC_MEMORY: &str = "Memory";

/// GPU compute utilization.
pub const METRIC_GPU: &str = "GPU";

/// Disk usage. Carries an absolute `"812GB"` label next to the percentage.
pub const METRIC_STORAGE: &str = "Storage";

/// GPU core temperature, rescaled onto the percentage axis.
pub const METRIC_GPU_TEMPERATURE: &str = "GPU Temp";

/// SSD wear-level health.
pub const METRIC_SSD_HEALTH: &str = "SSD Health";

/// GPU memory utilization.
pub const METRIC_GPU_VRAM: &str = "GPU VRAM";
