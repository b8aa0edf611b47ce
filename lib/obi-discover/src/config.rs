use obi_export::{ExportModes, FeatureNames};
use serde::Deserialize;

use crate::Criterion;

fn default_features() -> FeatureNames {
    FeatureNames::from(["application"])
}

/// Global metrics settings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct MetricsConfiguration {
    /// Telemetry features enabled for services that don't select their own.
    ///
    /// Defaults to `["application"]`.
    #[serde(default = "default_features")]
    pub features: FeatureNames,
}

impl Default for MetricsConfiguration {
    fn default() -> Self {
        Self {
            features: default_features(),
        }
    }
}

/// Service discovery configuration.
///
/// ```yaml
/// instrument:
///   - open_ports: 80,443
///   - exe_path: "*/java"
///     name: billing
/// exclude_instrument:
///   - exe_path: "*/otelcol*"
/// exports: [metrics, traces]
/// metrics:
///   features: [application, application_span_otel]
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfiguration {
    /// Criteria selecting the processes to instrument, in order of increasing precedence.
    instrument: Vec<Criterion>,

    /// Criteria selecting processes that must never be instrumented.
    exclude_instrument: Vec<Criterion>,

    /// Signals that may be exported for services that don't select their own.
    exports: ExportModes,

    /// Global metrics settings.
    metrics: MetricsConfiguration,
}

impl DiscoveryConfiguration {
    /// Sets the instrumentation criteria.
    pub fn with_instrument(mut self, instrument: Vec<Criterion>) -> Self {
        self.instrument = instrument;
        self
    }

    /// Sets the exclusion criteria.
    pub fn with_exclude_instrument(mut self, exclude_instrument: Vec<Criterion>) -> Self {
        self.exclude_instrument = exclude_instrument;
        self
    }

    /// Sets the default export modes.
    pub fn with_exports(mut self, exports: ExportModes) -> Self {
        self.exports = exports;
        self
    }

    /// Sets the default telemetry features.
    pub fn with_features<F: Into<FeatureNames>>(mut self, features: F) -> Self {
        self.metrics.features = features.into();
        self
    }

    /// Returns the instrumentation criteria.
    pub fn instrument(&self) -> &[Criterion] {
        &self.instrument
    }

    /// Returns the exclusion criteria.
    pub fn exclude_instrument(&self) -> &[Criterion] {
        &self.exclude_instrument
    }

    /// Returns the default export modes.
    pub fn exports(&self) -> ExportModes {
        self.exports
    }

    /// Returns the default telemetry feature names.
    pub fn features(&self) -> &FeatureNames {
        &self.metrics.features
    }
}
