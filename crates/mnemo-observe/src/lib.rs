//! Observability setup for Mnemo: tracing subscriber initialization with
//! optional OpenTelemetry export.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, shutdown_tracing, TracingOptions};
