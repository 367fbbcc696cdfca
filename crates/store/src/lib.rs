//! Persisted device settings.
//!
//! A small JSON key/value file holding the facility selection, refresh and
//! timeout settings, and the API usage counters. One [`SettingsStore`] is
//! created at startup and shared behind an `Arc`.

pub mod error;
pub mod settings;

pub use error::StoreError;
pub use settings::{DeviceSettings, SettingsStore};
