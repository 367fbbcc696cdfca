//! NanoDC monitor service library.
//!
//! Exposes the composition pieces (config, pipeline, scheduler, published
//! state, routes) so integration tests and the binary entrypoint can both
//! access them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod published;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
