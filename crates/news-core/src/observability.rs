//! Optional observability handle
//!
//! The pipeline receives an explicitly constructed [`Observability`] at
//! startup instead of consulting process-wide telemetry state. When
//! initialisation fails the pipeline gets a [`NoopObservability`] and keeps
//! working; the only visible effect is the "disabled" status indicator.

use crate::types::SessionMetadata;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Span;

/// Telemetry settings
///
/// Field defaults match the local collector of the compose stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Master switch
    pub enabled: bool,
    /// OTLP/HTTP collector endpoint
    pub otlp_endpoint: String,
    /// Service name reported on every span
    pub service_name: String,
    /// Sampler name (`always_on`, `always_off`, `traceidratio`)
    pub traces_sampler: String,
    /// Sampler argument (ratio for `traceidratio`)
    pub traces_sampler_arg: f64,
}

impl TelemetryConfig {
    pub const ENV_ENDPOINT: &'static str = "OTEL_EXPORTER_OTLP_ENDPOINT";
    pub const ENV_SERVICE_NAME: &'static str = "OTEL_SERVICE_NAME";
    pub const ENV_SAMPLER: &'static str = "OTEL_TRACES_SAMPLER";
    pub const ENV_SAMPLER_ARG: &'static str = "OTEL_TRACES_SAMPLER_ARG";

    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disabled configuration
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// With collector endpoint
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = endpoint.into();
        self
    }

    /// With sampler
    #[inline]
    #[must_use]
    pub fn with_sampler(mut self, sampler: impl Into<String>, arg: f64) -> Self {
        self.traces_sampler = sampler.into();
        self.traces_sampler_arg = arg;
        self
    }

    /// Apply the standard `OTEL_*` variables that are set
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`. The environment is
    /// only read, never written. An unparsable sampler argument is kept as NaN
    /// so that initialisation reports it.
    #[must_use]
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(Self::ENV_ENDPOINT) {
            self.otlp_endpoint = endpoint;
        }
        if let Some(name) = lookup(Self::ENV_SERVICE_NAME) {
            self.service_name = name;
        }
        if let Some(sampler) = lookup(Self::ENV_SAMPLER) {
            self.traces_sampler = sampler;
        }
        if let Some(arg) = lookup(Self::ENV_SAMPLER_ARG) {
            self.traces_sampler_arg = arg.trim().parse().unwrap_or(f64::NAN);
        }
        self
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            otlp_endpoint: "http://localhost:4318".to_string(),
            service_name: "ai-news-crew".to_string(),
            traces_sampler: "traceidratio".to_string(),
            traces_sampler_arg: 1.0,
        }
    }
}

/// Parsed sampling decision rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampler {
    AlwaysOn,
    AlwaysOff,
    TraceIdRatio(f64),
}

impl Sampler {
    /// Parse a sampler name and argument
    pub fn parse(name: &str, arg: f64) -> Result<Self, String> {
        match name.trim().to_ascii_lowercase().as_str() {
            "always_on" => Ok(Self::AlwaysOn),
            "always_off" => Ok(Self::AlwaysOff),
            "traceidratio" => {
                if (0.0..=1.0).contains(&arg) {
                    Ok(Self::TraceIdRatio(arg))
                } else {
                    Err(format!("sampler ratio {arg} is outside [0, 1]"))
                }
            }
            other => Err(format!("unsupported sampler {other:?}")),
        }
    }

    fn sample(&self) -> bool {
        match self {
            Self::AlwaysOn => true,
            Self::AlwaysOff => false,
            Self::TraceIdRatio(ratio) => rand::random::<f64>() < *ratio,
        }
    }
}

/// Status indicator shown by the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservabilityStatus {
    Active,
    Disabled { reason: String },
}

impl ObservabilityStatus {
    /// Check if tracing is active
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Indicator text
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "🔍 Observability: Active",
            Self::Disabled { .. } => "⚠️ Observability: Disabled",
        }
    }

    /// Indicator colour
    #[must_use]
    pub fn colour(&self) -> &'static str {
        match self {
            Self::Active => "#28a745",
            Self::Disabled { .. } => "#ffc107",
        }
    }
}

impl std::fmt::Display for ObservabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => f.write_str(self.label()),
            Self::Disabled { reason } => write!(f, "{} ({reason})", self.label()),
        }
    }
}

/// Observability service handle
pub trait Observability: Send + Sync + std::fmt::Debug {
    /// Current status
    fn status(&self) -> ObservabilityStatus;

    /// Span that wraps one crew call, tagged with the session metadata
    fn session_span(&self, metadata: &SessionMetadata) -> Span;
}

/// Tags crew calls with `tracing` spans
#[derive(Debug, Clone)]
pub struct TracingObservability {
    service_name: String,
    endpoint: String,
    sampler: Sampler,
}

impl TracingObservability {
    #[must_use]
    pub fn new(service_name: impl Into<String>, endpoint: impl Into<String>, sampler: Sampler) -> Self {
        Self {
            service_name: service_name.into(),
            endpoint: endpoint.into(),
            sampler,
        }
    }
}

impl Observability for TracingObservability {
    fn status(&self) -> ObservabilityStatus {
        ObservabilityStatus::Active
    }

    fn session_span(&self, metadata: &SessionMetadata) -> Span {
        if !self.sampler.sample() {
            return Span::none();
        }
        tracing::info_span!(
            "research_session",
            session_id = %metadata.session_id,
            topic = %metadata.topic,
            timestamp = %metadata.submitted_at.to_rfc3339(),
            interface = metadata.interface,
            service.name = %self.service_name,
            otlp.endpoint = %self.endpoint,
        )
    }
}

/// Used when observability is off or failed to initialise
#[derive(Debug, Clone)]
pub struct NoopObservability {
    reason: String,
}

impl NoopObservability {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Observability for NoopObservability {
    fn status(&self) -> ObservabilityStatus {
        ObservabilityStatus::Disabled {
            reason: self.reason.clone(),
        }
    }

    fn session_span(&self, _metadata: &SessionMetadata) -> Span {
        Span::none()
    }
}

/// Build the observability handle
///
/// Never fails: any problem yields a [`NoopObservability`] carrying the reason.
pub fn init_observability(config: &TelemetryConfig) -> Arc<dyn Observability> {
    match try_init(config) {
        Ok(handle) => {
            tracing::info!(
                service = %config.service_name,
                endpoint = %config.otlp_endpoint,
                "observability enabled"
            );
            Arc::new(handle)
        }
        Err(reason) => {
            tracing::warn!("observability disabled: {}", reason);
            Arc::new(NoopObservability::new(reason))
        }
    }
}

fn try_init(config: &TelemetryConfig) -> Result<TracingObservability, String> {
    if !config.enabled {
        return Err("disabled by configuration".to_string());
    }

    let endpoint = config.otlp_endpoint.trim();
    let host = endpoint
        .strip_prefix("http://")
        .or_else(|| endpoint.strip_prefix("https://"))
        .ok_or_else(|| format!("OTLP endpoint {endpoint:?} is not an http(s) URL"))?;
    if host.is_empty() || host.starts_with('/') {
        return Err(format!("OTLP endpoint {endpoint:?} has no host"));
    }

    if config.service_name.trim().is_empty() {
        return Err("service name is empty".to_string());
    }

    let sampler = Sampler::parse(&config.traces_sampler, config.traces_sampler_arg)?;
    Ok(TracingObservability::new(
        config.service_name.trim(),
        endpoint,
        sampler,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_local_collector() {
        let config = TelemetryConfig::default();
        assert_eq!(config.otlp_endpoint, "http://localhost:4318");
        assert_eq!(config.service_name, "ai-news-crew");
        assert_eq!(config.traces_sampler, "traceidratio");
        assert!((config.traces_sampler_arg - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn env_overrides_when_set() {
        let config = TelemetryConfig::default().with_env_overrides(env(&[
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://custom-endpoint:4318"),
            ("OTEL_SERVICE_NAME", "custom-service"),
        ]));
        assert_eq!(config.otlp_endpoint, "http://custom-endpoint:4318");
        assert_eq!(config.service_name, "custom-service");
        assert_eq!(config.traces_sampler, "traceidratio");
    }

    #[test]
    fn unset_env_keeps_defaults() {
        let config = TelemetryConfig::default().with_env_overrides(env(&[]));
        assert_eq!(config, TelemetryConfig::default());
    }

    #[test]
    fn init_success_is_active() {
        let handle = init_observability(&TelemetryConfig::default());
        assert!(handle.status().is_active());
        assert_eq!(handle.status().label(), "🔍 Observability: Active");
        assert_eq!(handle.status().colour(), "#28a745");
    }

    #[test]
    fn disabled_config_is_noop() {
        let handle = init_observability(&TelemetryConfig::disabled());
        let status = handle.status();
        assert_eq!(status.label(), "⚠️ Observability: Disabled");
        assert_eq!(status.colour(), "#ffc107");
        assert!(status.to_string().contains("disabled by configuration"));
    }

    #[test]
    fn bad_endpoint_degrades() {
        let handle = init_observability(&TelemetryConfig::default().with_endpoint("localhost:4318"));
        assert!(!handle.status().is_active());

        let handle = init_observability(&TelemetryConfig::default().with_endpoint("http://"));
        assert!(!handle.status().is_active());
    }

    #[test]
    fn bad_sampler_degrades() {
        let handle = init_observability(&TelemetryConfig::default().with_sampler("traceidratio", 1.5));
        assert!(!handle.status().is_active());

        let handle = init_observability(&TelemetryConfig::default().with_sampler("jaeger_remote", 1.0));
        assert!(!handle.status().is_active());

        let config = TelemetryConfig::default().with_env_overrides(env(&[("OTEL_TRACES_SAMPLER_ARG", "lots")]));
        assert!(!init_observability(&config).status().is_active());
    }

    #[test]
    fn sampler_parsing() {
        assert_eq!(Sampler::parse("always_on", 0.0), Ok(Sampler::AlwaysOn));
        assert_eq!(Sampler::parse("ALWAYS_OFF", 0.0), Ok(Sampler::AlwaysOff));
        assert_eq!(Sampler::parse("traceidratio", 0.25), Ok(Sampler::TraceIdRatio(0.25)));
        assert!(Sampler::parse("traceidratio", -0.1).is_err());
    }

    #[test]
    fn sampling_extremes() {
        assert!(Sampler::AlwaysOn.sample());
        assert!(!Sampler::AlwaysOff.sample());
        assert!(Sampler::TraceIdRatio(1.0).sample());
        assert!(!Sampler::TraceIdRatio(0.0).sample());
    }
}
