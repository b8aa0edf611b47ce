use std::collections::HashMap;

use obi_export::{ExportModes, FeatureNames};
use serde::Deserialize;

use crate::{matcher::deserialize_regex, CustomRoutesConfig, PortEnum, SamplerConfig, StringMatcher};

/// Per-criterion metrics settings.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct CriterionMetrics {
    /// Telemetry features enabled for matching services.
    pub features: FeatureNames,
}

/// A configured rule for selecting processes and deciding how they're instrumented.
///
/// Every field is optional. Unset selection fields place no constraint on the process, so a criterion with nothing
/// set matches every process. Unset policy fields (name, exports, sampler, ...) inherit from earlier criteria or from
/// the global defaults.
///
/// ```yaml
/// name: checkout
/// namespace: shop
/// open_ports: 8080-8089
/// exe_path: "*/java"
/// k8s_pod_labels:
///   app: "checkout-*"
/// exports: [traces]
/// metrics:
///   features: [application, application_span_otel]
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Criterion {
    /// Service name assigned to matching processes.
    name: String,

    /// Service namespace assigned to matching processes.
    namespace: String,

    /// Ports the process must be listening on (any of them).
    open_ports: Option<PortEnum>,

    /// Glob pattern the executable path must match.
    exe_path: Option<StringMatcher>,

    /// Regular expression the executable path must match.
    #[serde(deserialize_with = "deserialize_regex")]
    exe_path_regexp: Option<StringMatcher>,

    /// Kubernetes namespace the process must run in.
    k8s_namespace: Option<String>,

    /// Metadata entries the process must carry.
    metadata: HashMap<String, StringMatcher>,

    /// Pod labels the process must carry.
    k8s_pod_labels: HashMap<String, StringMatcher>,

    /// Pod annotations the process must carry.
    k8s_pod_annotations: HashMap<String, StringMatcher>,

    /// Whether only containerized processes match.
    containers_only: bool,

    /// Signals that may be exported for matching services.
    exports: ExportModes,

    /// Sampler for matching services.
    sampler: Option<SamplerConfig>,

    /// Custom route templates for matching services.
    routes: Option<CustomRoutesConfig>,

    /// Metrics settings for matching services.
    metrics: CriterionMetrics,
}

impl Criterion {
    /// Creates a new `Criterion` that matches every process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the service namespace.
    pub fn with_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Requires the process to listen on one of the given ports.
    pub fn with_open_ports(mut self, ports: PortEnum) -> Self {
        self.open_ports = Some(ports);
        self
    }

    /// Requires the executable path to match the given matcher.
    pub fn with_exe_path(mut self, matcher: StringMatcher) -> Self {
        self.exe_path = Some(matcher);
        self
    }

    /// Requires the executable path to match the given regular expression matcher.
    pub fn with_exe_path_regexp(mut self, matcher: StringMatcher) -> Self {
        self.exe_path_regexp = Some(matcher);
        self
    }

    /// Requires the process to run in the given Kubernetes namespace.
    pub fn with_k8s_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.k8s_namespace = Some(namespace.into());
        self
    }

    /// Requires the process to carry a matching metadata entry.
    pub fn with_metadata<K: Into<String>>(mut self, key: K, matcher: StringMatcher) -> Self {
        self.metadata.insert(key.into(), matcher);
        self
    }

    /// Requires the process to carry a matching pod label.
    pub fn with_pod_label<K: Into<String>>(mut self, key: K, matcher: StringMatcher) -> Self {
        self.k8s_pod_labels.insert(key.into(), matcher);
        self
    }

    /// Requires the process to carry a matching pod annotation.
    pub fn with_pod_annotation<K: Into<String>>(mut self, key: K, matcher: StringMatcher) -> Self {
        self.k8s_pod_annotations.insert(key.into(), matcher);
        self
    }

    /// Sets whether only containerized processes match.
    pub fn with_containers_only(mut self, containers_only: bool) -> Self {
        self.containers_only = containers_only;
        self
    }

    /// Sets the export modes.
    pub fn with_exports(mut self, exports: ExportModes) -> Self {
        self.exports = exports;
        self
    }

    /// Sets the sampler.
    pub fn with_sampler(mut self, sampler: SamplerConfig) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Sets the custom routes.
    pub fn with_routes(mut self, routes: CustomRoutesConfig) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Sets the enabled telemetry features.
    pub fn with_features<F: Into<FeatureNames>>(mut self, features: F) -> Self {
        self.metrics.features = features.into();
        self
    }

    /// Returns the service name, or an empty string if unset.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the service namespace, or an empty string if unset.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the export modes.
    pub fn exports(&self) -> ExportModes {
        self.exports
    }

    /// Returns the sampler configuration, if set.
    pub fn sampler(&self) -> Option<&SamplerConfig> {
        self.sampler.as_ref()
    }

    /// Returns the custom routes, if set.
    pub fn routes(&self) -> Option<&CustomRoutesConfig> {
        self.routes.as_ref()
    }

    /// Returns the enabled telemetry feature names.
    pub fn features(&self) -> &FeatureNames {
        &self.metrics.features
    }

    pub(crate) fn open_ports(&self) -> Option<&PortEnum> {
        self.open_ports.as_ref()
    }

    pub(crate) fn exe_path(&self) -> Option<&StringMatcher> {
        self.exe_path.as_ref()
    }

    pub(crate) fn exe_path_regexp(&self) -> Option<&StringMatcher> {
        self.exe_path_regexp.as_ref()
    }

    pub(crate) fn k8s_namespace(&self) -> Option<&str> {
        self.k8s_namespace.as_deref()
    }

    pub(crate) fn metadata(&self) -> &HashMap<String, StringMatcher> {
        &self.metadata
    }

    pub(crate) fn pod_labels(&self) -> &HashMap<String, StringMatcher> {
        &self.k8s_pod_labels
    }

    pub(crate) fn pod_annotations(&self) -> &HashMap<String, StringMatcher> {
        &self.k8s_pod_annotations
    }

    pub(crate) fn containers_only(&self) -> bool {
        self.containers_only
    }
}
