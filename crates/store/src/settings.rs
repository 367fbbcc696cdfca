use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use nanodc_core::facility::DEFAULT_FACILITY;
use nanodc_core::types::Timestamp;
use nanodc_core::usage::{UsageCounters, UsageRecorder};

use crate::error::StoreError;

pub const KEY_ACTIVE_FACILITY_ID: &str = "activeFacilityId";
pub const KEY_REFRESH_INTERVAL_MS: &str = "refreshIntervalMs";
pub const KEY_API_TIMEOUT_SECONDS: &str = "apiTimeoutSeconds";
pub const KEY_DEVICE_NAME: &str = "deviceName";

/// Default refresh period (30 s).
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30_000;

/// Default bound on one snapshot fetch.
pub const DEFAULT_API_TIMEOUT_SECONDS: u64 = 30;

/// Shortest refresh period accepted.
pub const MIN_REFRESH_INTERVAL_MS: u64 = 1_000;

/// Longest fetch timeout accepted.
pub const MAX_API_TIMEOUT_SECONDS: u64 = 300;

/// Everything stored in the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceSettings {
    pub active_facility_id: String,
    pub refresh_interval_ms: u64,
    pub api_timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<Timestamp>,
    #[serde(flatten)]
    pub usage: UsageCounters,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            active_facility_id: DEFAULT_FACILITY.to_string(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            api_timeout_seconds: DEFAULT_API_TIMEOUT_SECONDS,
            device_name: None,
            last_sync_time: None,
            usage: UsageCounters::default(),
        }
    }
}

/// Sequence for temporary file names, unique within the process.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// File-backed settings with in-memory reads.
///
/// Setting changes are written through immediately. Usage counters are
/// only updated in memory by [`UsageRecorder::record_api_call`] and reach
/// disk on the next [`flush_if_dirty`](Self::flush_if_dirty), so recording
/// never performs I/O on the caller's path.
///
/// Writes and flushes do blocking file I/O on a file of a few hundred
/// bytes. Async callers run them through `tokio::task::spawn_blocking`.
/// File writes are serialized; each one goes to its own temporary file and
/// is renamed over the settings file.
pub struct SettingsStore {
    path: Option<PathBuf>,
    state: RwLock<DeviceSettings>,
    dirty: AtomicBool,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    /// Open the settings file at `path`.
    ///
    /// A missing file yields defaults. An unreadable or corrupt file is
    /// logged and replaced by defaults on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match Self::read_file(&path) {
            Ok(Some(settings)) => {
                tracing::info!(path = %path.display(), "Loaded device settings");
                settings
            }
            Ok(None) => {
                tracing::info!(path = %path.display(), "No settings file, using defaults");
                DeviceSettings::default()
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Settings file unreadable, using defaults"
                );
                DeviceSettings::default()
            }
        };
        Self {
            path: Some(path),
            state: RwLock::new(settings),
            dirty: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        }
    }

    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self::with_settings(DeviceSettings::default())
    }

    pub fn with_settings(settings: DeviceSettings) -> Self {
        Self {
            path: None,
            state: RwLock::new(settings),
            dirty: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        }
    }

    fn read_file(path: &Path) -> Result<Option<DeviceSettings>, StoreError> {
        match std::fs::read_to_string(path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ---- reads ----

    /// Copy of every stored value.
    pub fn settings(&self) -> DeviceSettings {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn read<T>(&self, f: impl FnOnce(&DeviceSettings) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn active_facility_id(&self) -> String {
        self.read(|s| s.active_facility_id.clone())
    }

    pub fn refresh_interval(&self) -> Duration {
        self.read(|s| Duration::from_millis(s.refresh_interval_ms))
    }

    pub fn api_timeout(&self) -> Duration {
        self.read(|s| Duration::from_secs(s.api_timeout_seconds))
    }

    pub fn device_name(&self) -> Option<String> {
        self.read(|s| s.device_name.clone())
    }

    pub fn last_sync_time(&self) -> Option<Timestamp> {
        self.read(|s| s.last_sync_time)
    }

    pub fn usage(&self) -> UsageCounters {
        self.read(|s| s.usage.clone())
    }

    /// Value stored under `key`, using the file's key names.
    pub fn get_value(&self, key: &str) -> Result<Value, StoreError> {
        let settings = serde_json::to_value(self.settings())?;
        match settings.get(key) {
            Some(value) => Ok(value.clone()),
            None if Self::is_optional_key(key) => Ok(Value::Null),
            None => Err(StoreError::UnknownKey(key.to_string())),
        }
    }

    fn is_optional_key(key: &str) -> bool {
        matches!(key, KEY_DEVICE_NAME | "lastSyncTime" | "minLatencyMs" | "maxLatencyMs")
    }

    // ---- writes ----

    pub fn set_active_facility_id(&self, facility_id: &str) -> Result<(), StoreError> {
        let facility_id = facility_id.trim();
        if facility_id.is_empty() {
            return Err(invalid(KEY_ACTIVE_FACILITY_ID, "must not be empty"));
        }
        self.update(|s| s.active_facility_id = facility_id.to_ascii_uppercase())?;
        tracing::info!(facility_id, "Active facility setting changed");
        Ok(())
    }

    pub fn set_refresh_interval_ms(&self, ms: u64) -> Result<(), StoreError> {
        if ms < MIN_REFRESH_INTERVAL_MS {
            return Err(invalid(
                KEY_REFRESH_INTERVAL_MS,
                &format!("must be at least {MIN_REFRESH_INTERVAL_MS}"),
            ));
        }
        self.update(|s| s.refresh_interval_ms = ms)
    }

    pub fn set_api_timeout_seconds(&self, seconds: u64) -> Result<(), StoreError> {
        if !(1..=MAX_API_TIMEOUT_SECONDS).contains(&seconds) {
            return Err(invalid(
                KEY_API_TIMEOUT_SECONDS,
                &format!("must be between 1 and {MAX_API_TIMEOUT_SECONDS}"),
            ));
        }
        self.update(|s| s.api_timeout_seconds = seconds)
    }

    pub fn set_device_name(&self, name: Option<&str>) -> Result<(), StoreError> {
        let name = name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
        self.update(|s| s.device_name = name)
    }

    /// Record a successful sync at the current time.
    pub fn mark_synced(&self) -> Result<(), StoreError> {
        let now = Utc::now();
        self.update(|s| s.last_sync_time = Some(now))
    }

    /// Write one setting by key.
    pub fn set_value(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let as_u64 = || value.as_u64().ok_or_else(|| invalid(key, "expected an unsigned integer"));
        match key {
            KEY_ACTIVE_FACILITY_ID => {
                let id = value.as_str().ok_or_else(|| invalid(key, "expected a string"))?;
                self.set_active_facility_id(id)
            }
            KEY_REFRESH_INTERVAL_MS => self.set_refresh_interval_ms(as_u64()?),
            KEY_API_TIMEOUT_SECONDS => self.set_api_timeout_seconds(as_u64()?),
            KEY_DEVICE_NAME => self.set_device_name(value.as_str()),
            _ => match self.get_value(key) {
                Ok(_) => Err(invalid(key, "read-only")),
                Err(e) => Err(e),
            },
        }
    }

    /// Zero the usage counters.
    pub fn reset_usage(&self) -> Result<(), StoreError> {
        self.update(|s| s.usage = UsageCounters::default())
    }

    /// Restore every value to its default.
    pub fn reset(&self) -> Result<(), StoreError> {
        self.update(|s| *s = DeviceSettings::default())?;
        tracing::info!("Device settings reset to defaults");
        Ok(())
    }

    /// Persist pending usage counter changes.
    pub fn flush_if_dirty(&self) -> Result<(), StoreError> {
        if self.dirty.load(Ordering::Acquire) {
            self.persist()?;
        }
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut DeviceSettings)) -> Result<(), StoreError> {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut state);
        }
        self.dirty.store(true, Ordering::Release);
        self.persist()
    }

    /// Write the current settings to disk.
    ///
    /// The dirty flag is cleared before the settings are copied, so a
    /// change recorded during the write marks the store dirty again. A
    /// failed write restores the flag.
    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            self.dirty.store(false, Ordering::Release);
            return Ok(());
        };
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.dirty.store(false, Ordering::Release);

        let result = write_atomically(path, &self.settings());
        if result.is_err() {
            self.dirty.store(true, Ordering::Release);
        }
        result
    }
}

fn write_atomically(path: &Path, settings: &DeviceSettings) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(settings)?;
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("json.{}.{seq}.tmp", std::process::id()));
    if let Err(e) = std::fs::write(&tmp, json).and_then(|()| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn invalid(key: &str, reason: &str) -> StoreError {
    StoreError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

impl UsageRecorder for SettingsStore {
    fn record_api_call(&self, latency: Duration, success: bool, bytes: u64) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .usage
            .record(latency, success, bytes);
        self.dirty.store(true, Ordering::Release);
    }
}
