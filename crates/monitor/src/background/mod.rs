//! Background tasks.
//!
//! Each task runs until its [`CancellationToken`](tokio_util::sync::CancellationToken)
//! is cancelled.

pub mod refresh;

pub use refresh::{CredentialsHandle, CycleFailure, CycleOutcome, RefreshScheduler};
