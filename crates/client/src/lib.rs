//! HTTP client for the NanoDC telemetry service.
//!
//! [`TelemetryClient`] authenticates with user credentials and fetches one
//! consolidated [`Snapshot`](nanodc_core::snapshot::Snapshot) per call. A
//! failed GET is retried once as a POST; anything beyond that is left to
//! the caller's schedule.

pub mod api;
pub mod auth;
pub mod error;
pub mod status;

pub use api::{ClientConfig, TelemetryClient};
pub use auth::{AuthToken, Credentials};
pub use error::{AuthError, FetchError};
