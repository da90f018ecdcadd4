//! Tracing and metrics bootstrap for embedding applications.
//!
//! Installs a tracing subscriber bridged to OpenTelemetry and a global
//! meter provider, so the stream instruments registered against
//! [`opentelemetry::global::meter`] actually export. Exporters write to
//! stdout; the `RUST_LOG` environment variable filters log output.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_stdout::{MetricExporter, SpanExporter};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing and metrics export.
///
/// Call once at startup, before the first stream: meter instruments bind
/// to whatever meter provider is global when they are created, so a
/// provider installed later is never seen by instruments built earlier.
///
/// # Errors
///
/// Returns an error if a tracing subscriber is already installed or the
/// `RUST_LOG` filter does not parse.
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error>> {
    let resource = Resource::builder()
        .with_service_name("remora")
        .with_attributes(vec![KeyValue::new(
            "service.version",
            env!("CARGO_PKG_VERSION"),
        )])
        .build();

    let tracer_provider = SdkTracerProvider::builder()
        .with_simple_exporter(SpanExporter::default())
        .with_resource(resource.clone())
        .build();
    global::set_tracer_provider(tracer_provider.clone());

    let meter_provider = SdkMeterProvider::builder()
        .with_reader(PeriodicReader::builder(MetricExporter::default()).build())
        .with_resource(resource)
        .build();
    global::set_meter_provider(meter_provider);

    let tracer = tracer_provider.tracer("remora");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush pending telemetry before exit.
///
/// Providers flush on drop in OpenTelemetry SDK 0.31+, so this exists for
/// call-site symmetry with [`init_telemetry`].
pub fn shutdown_telemetry() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializes_once_and_rejects_a_second_subscriber() {
        assert!(init_telemetry().is_ok());
        // The process-wide subscriber slot is taken now.
        assert!(init_telemetry().is_err());
    }
}
