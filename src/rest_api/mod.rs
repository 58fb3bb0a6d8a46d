//! REST API for probes and operators
//!
//! Serves liveness/readiness, Prometheus metrics and a status document
//! describing the broker and its registered controllers.

mod handlers;
mod server;

pub use server::{router, run_server};
