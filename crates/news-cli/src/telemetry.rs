//! OTLP export of research session spans
//!
//! `news_core::init_observability` decides whether the configuration is
//! usable; this module builds the exporter behind it. The provider and its
//! HTTP client must be created and shut down outside the tokio runtime.

use news_core::{
    init_observability, NoopObservability, Observability, Sampler, TelemetryConfig,
    TracingObservability,
};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::trace::{Sampler as SdkSampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{Layer, Registry};

/// Spans and events from these targets are exported regardless of the
/// stderr log level.
const EXPORTED_TARGET: &str = "news_core";
const TRACER_NAME: &str = "ai-news-crew";

pub(crate) type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

pub(crate) struct Telemetry {
    observability: Arc<dyn Observability>,
    provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    /// Build the exporter for an enabled, valid configuration
    ///
    /// Never fails: an exporter that cannot be built yields the "Disabled"
    /// indicator instead.
    pub(crate) fn init(config: &TelemetryConfig) -> Self {
        let checked = init_observability(config);
        if !checked.status().is_active() {
            return Self {
                observability: checked,
                provider: None,
            };
        }

        match build_provider(config) {
            Ok(provider) => Self {
                // Sampling happens in the provider
                observability: Arc::new(TracingObservability::new(
                    config.service_name.trim(),
                    config.otlp_endpoint.trim(),
                    Sampler::AlwaysOn,
                )),
                provider: Some(provider),
            },
            Err(reason) => {
                tracing::warn!("observability disabled: {}", reason);
                Self::disabled(reason)
            }
        }
    }

    pub(crate) fn disabled(reason: impl Into<String>) -> Self {
        Self {
            observability: Arc::new(NoopObservability::new(reason)),
            provider: None,
        }
    }

    pub(crate) fn observability(&self) -> Arc<dyn Observability> {
        Arc::clone(&self.observability)
    }

    /// Layer bridging `tracing` spans to the exporter, with its own filter
    pub(crate) fn layer(&self) -> Option<BoxedLayer> {
        let provider = self.provider.as_ref()?;
        let filter = Targets::new().with_target(EXPORTED_TARGET, LevelFilter::INFO);
        Some(
            tracing_opentelemetry::layer()
                .with_tracer(provider.tracer(TRACER_NAME))
                .with_filter(filter)
                .boxed(),
        )
    }

    /// Flush pending spans
    pub(crate) fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!("failed to flush traces: {}", e);
            }
        }
    }
}

fn build_provider(config: &TelemetryConfig) -> Result<SdkTracerProvider, String> {
    let sampler = Sampler::parse(&config.traces_sampler, config.traces_sampler_arg)?;
    let endpoint = format!("{}/v1/traces", config.otlp_endpoint.trim().trim_end_matches('/'));

    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| format!("failed to build OTLP exporter: {e}"))?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(sdk_sampler(sampler))
        .with_resource(
            Resource::builder()
                .with_service_name(config.service_name.trim().to_string())
                .build(),
        )
        .build())
}

fn sdk_sampler(sampler: Sampler) -> SdkSampler {
    match sampler {
        Sampler::AlwaysOn => SdkSampler::AlwaysOn,
        Sampler::AlwaysOff => SdkSampler::AlwaysOff,
        Sampler::TraceIdRatio(ratio) => {
            SdkSampler::ParentBased(Box::new(SdkSampler::TraceIdRatioBased(ratio)))
        }
    }
}
