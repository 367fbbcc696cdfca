//! Domain logic for the NanoDC monitoring pipeline.
//!
//! Everything in this crate is pure: no network or filesystem access
//! except for loading override tables from an explicit path. The
//! `client`, `store`, and `monitor` crates supply the I/O around it.

pub mod classify;
pub mod dashboard;
pub mod error;
pub mod facility;
pub mod mapper;
pub mod metric_names;
pub mod normalize;
pub mod slot;
pub mod snapshot;
pub mod types;
pub mod usage;
