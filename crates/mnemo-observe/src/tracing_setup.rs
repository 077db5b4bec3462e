//! Tracing subscriber initialization for processes embedding the engine.
//!
//! # Usage
//!
//! ```no_run
//! use mnemo_observe::TracingOptions;
//!
//! // Human-readable logging only.
//! mnemo_observe::init_tracing(TracingOptions::default()).unwrap();
//!
//! // JSON lines plus OpenTelemetry export to stdout (local development).
//! mnemo_observe::init_tracing(TracingOptions {
//!     enable_otel: true,
//!     json_output: true,
//! })
//! .unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use std::sync::OnceLock;

/// Filter used when `RUST_LOG` is unset: engine crates at debug, the rest
/// (hyper, lance, ort, ...) at info.
const DEFAULT_FILTER: &str = "info,mnemo_core=debug,mnemo_infra=debug";

/// Tracer name under which engine spans are exported.
const TRACER_NAME: &str = "mnemo";

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Output configuration for [`init_tracing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOptions {
    /// Bridge tracing spans to OpenTelemetry with a stdout span exporter.
    /// Suitable for local development; swap the exporter for OTLP in
    /// production.
    pub enable_otel: bool,
    /// Emit JSON lines instead of human-readable output, for log shippers.
    pub json_output: bool,
}

/// Initialize the global tracing subscriber.
///
/// Installs a `fmt` layer (plain or JSON per `options`) with target
/// visibility and span close timing, filtered by `RUST_LOG` when set and by
/// [`DEFAULT_FILTER`] otherwise.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set.
pub fn init_tracing(options: TracingOptions) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let otel_layer = if options.enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer(TRACER_NAME);

        // Store the provider for shutdown and register it globally.
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    let registry = tracing_subscriber::registry().with(filter).with(otel_layer);
    if options.json_output {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()?;
    }

    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// Call this before process exit so buffered spans are exported. No-op when
/// OTel was never enabled.
pub fn shutdown_tracing() {
    let Some(provider) = TRACER_PROVIDER.get() else {
        return;
    };
    if let Err(e) = provider.shutdown() {
        eprintln!("Warning: OTel tracer provider shutdown error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_plain_and_local() {
        let options = TracingOptions::default();
        assert!(!options.enable_otel);
        assert!(!options.json_output);
    }

    #[test]
    fn test_default_filter_parses() {
        EnvFilter::try_new(DEFAULT_FILTER).unwrap();
    }

    #[test]
    fn test_shutdown_without_init_is_a_noop() {
        shutdown_tracing();
    }
}
