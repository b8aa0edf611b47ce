use std::fmt;

use bitmask_enum::bitmask;
use serde::{de, Deserialize, Deserializer};
use snafu::Snafu;

/// Telemetry features that can be enabled for an instrumented process.
///
/// This type is a bitmask: a single value can describe one feature or any combination of OR-ed features. Feature
/// names used in configuration are mapped to bits through a [`FeatureRegistry`][crate::FeatureRegistry].
#[bitmask(u64)]
#[bitmask_config(vec_debug)]
pub enum Features {
    /// Network flow bytes.
    Network,

    /// Network flow bytes between availability zones.
    NetworkInterZone,

    /// Application RED (rate, errors, duration) metrics.
    ApplicationRed,

    /// Span metrics in the legacy naming scheme.
    SpanLegacy,

    /// Span metrics following the OpenTelemetry naming scheme.
    SpanOTel,

    /// Request and response size metrics.
    SpanSizes,

    /// Service graph metrics.
    Graph,

    /// Process-level metrics.
    Process,

    /// Host-level application metrics.
    ApplicationHost,

    /// Internal metrics of the instrumentation itself.
    Ebpf,
}

/// Feature configuration error.
#[derive(Debug, Snafu, Eq, PartialEq)]
#[snafu(context(suffix(false)))]
pub enum FeatureError {
    /// Both span metric flavors were requested at the same time.
    #[snafu(display(
        "Legacy span metrics ('application_span') and OpenTelemetry span metrics ('application_span_otel') can't be enabled at the same time."
    ))]
    InvalidSpanMetrics,
}

impl Default for Features {
    fn default() -> Self {
        Self::none()
    }
}

impl Features {
    /// Returns `true` if any application observability metric is enabled.
    pub fn any_app_o11y_metric(&self) -> bool {
        self.intersects(
            Self::ApplicationRed
                | Self::SpanLegacy
                | Self::SpanOTel
                | Self::SpanSizes
                | Self::Graph
                | Self::Process
                | Self::ApplicationHost,
        )
    }

    /// Returns `true` if either flavor of span metrics is enabled.
    pub fn span_metrics(&self) -> bool {
        self.intersects(Self::SpanLegacy | Self::SpanOTel)
    }

    /// Returns `true` if any span-derived metric, including sizes, is enabled.
    pub fn any_span_metrics(&self) -> bool {
        self.intersects(Self::SpanLegacy | Self::SpanOTel | Self::SpanSizes)
    }

    /// Returns `true` if any network metric is enabled.
    pub fn any_network(&self) -> bool {
        self.intersects(Self::Network | Self::NetworkInterZone)
    }

    /// Returns `true` if application or span metrics are enabled.
    pub fn app_or_span(&self) -> bool {
        self.intersects(
            Self::ApplicationRed | Self::SpanSizes | Self::ApplicationHost | Self::SpanLegacy | Self::SpanOTel,
        )
    }

    /// Returns `true` if legacy span metrics are enabled.
    pub fn legacy_span_metrics(&self) -> bool {
        self.intersects(Self::SpanLegacy)
    }

    /// Returns `true` if service graph metrics are enabled.
    pub fn service_graph(&self) -> bool {
        self.intersects(Self::Graph)
    }

    /// Returns `true` if host-level application metrics are enabled.
    pub fn app_host(&self) -> bool {
        self.intersects(Self::ApplicationHost)
    }

    /// Returns `true` if application RED metrics are enabled.
    pub fn app_red(&self) -> bool {
        self.intersects(Self::ApplicationRed)
    }

    /// Returns `true` if request/response size metrics are enabled.
    pub fn span_sizes(&self) -> bool {
        self.intersects(Self::SpanSizes)
    }

    /// Returns `true` if network flow bytes are enabled.
    pub fn network_bytes(&self) -> bool {
        self.intersects(Self::Network)
    }

    /// Returns `true` if inter-zone network metrics are enabled.
    pub fn network_inter_zone(&self) -> bool {
        self.intersects(Self::NetworkInterZone)
    }

    /// Returns `true` if internal instrumentation metrics are enabled.
    pub fn bpf(&self) -> bool {
        self.intersects(Self::Ebpf)
    }

    /// Returns `true` if both legacy and OpenTelemetry span metrics are enabled.
    ///
    /// The combination is never corrected here. Callers decide whether to reject the configuration.
    pub fn invalid_span_metrics_config(&self) -> bool {
        self.contains(Self::SpanLegacy | Self::SpanOTel)
    }

    /// Validates the feature combination.
    ///
    /// # Errors
    ///
    /// If both legacy and OpenTelemetry span metrics are enabled, an error is returned.
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.invalid_span_metrics_config() {
            return Err(FeatureError::InvalidSpanMetrics);
        }
        Ok(())
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_all_bits() {
            return write!(f, "All");
        }

        let known = [
            (Self::Network, "Network"),
            (Self::NetworkInterZone, "NetworkInterZone"),
            (Self::ApplicationRed, "ApplicationRed"),
            (Self::SpanLegacy, "SpanLegacy"),
            (Self::SpanOTel, "SpanOTel"),
            (Self::SpanSizes, "SpanSizes"),
            (Self::Graph, "Graph"),
            (Self::Process, "Process"),
            (Self::ApplicationHost, "ApplicationHost"),
            (Self::Ebpf, "Ebpf"),
        ];

        let names = known
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>();
        write!(f, "{}", names.join("|"))
    }
}

/// A list of feature names, as written in configuration.
///
/// Names are resolved into [`Features`] by a [`FeatureRegistry`][crate::FeatureRegistry]. Deserializes from either a
/// sequence of strings or a single comma-separated string (as found in environment variables).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FeatureNames(Vec<String>);

impl FeatureNames {
    /// Returns `true` if no names were given.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the feature names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for FeatureNames {
    fn from(names: [S; N]) -> Self {
        names.into_iter().collect()
    }
}

impl<'de> Deserialize<'de> for FeatureNames {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FeatureNamesVisitor;

        impl<'de> de::Visitor<'de> for FeatureNamesVisitor {
            type Value = FeatureNames;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a sequence of feature names or a comma-separated string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(value.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut names = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(name) = seq.next_element::<String>()? {
                    names.push(name);
                }
                Ok(FeatureNames(names))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(FeatureNames::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(FeatureNames::default())
            }
        }

        deserializer.deserialize_any(FeatureNamesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_features_include_every_flag() {
        let all = Features::all_bits();
        assert!(all.any_network());
        assert!(all.app_red());
        assert!(all.bpf());
        assert!(all.invalid_span_metrics_config());
    }

    #[test]
    fn span_metrics_flavors_are_mutually_exclusive() {
        assert!(Features::SpanLegacy.validate().is_ok());
        assert!(Features::SpanOTel.validate().is_ok());
        assert_eq!(
            (Features::SpanLegacy | Features::SpanOTel).validate(),
            Err(FeatureError::InvalidSpanMetrics)
        );
        assert!(!(Features::SpanLegacy | Features::SpanSizes).invalid_span_metrics_config());
    }

    #[test]
    fn app_o11y_queries() {
        let features = Features::Graph;
        assert!(features.any_app_o11y_metric());
        assert!(!features.app_or_span());
        assert!(!features.any_network());

        let features = Features::Network | Features::Ebpf;
        assert!(!features.any_app_o11y_metric());
        assert!(features.network_bytes());
        assert!(!features.network_inter_zone());
        assert!(features.bpf());

        assert!(Features::SpanSizes.any_span_metrics());
        assert!(!Features::SpanSizes.span_metrics());
    }

    #[test]
    fn display() {
        assert_eq!(Features::none().to_string(), "");
        assert_eq!((Features::Network | Features::Graph).to_string(), "Network|Graph");
        assert_eq!(Features::all_bits().to_string(), "All");
    }

    #[test]
    fn feature_names_from_sequence_or_string() {
        let names: FeatureNames = serde_yaml::from_str("[network, application]").unwrap();
        assert_eq!(names, FeatureNames::from(["network", "application"]));

        let names: FeatureNames = serde_yaml::from_str("\"network, application_span_otel\"").unwrap();
        assert_eq!(names, FeatureNames::from(["network", "application_span_otel"]));

        let names: FeatureNames = serde_yaml::from_str("null").unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn feature_names_reject_non_string_items() {
        assert!(serde_yaml::from_str::<FeatureNames>("[{a: b}]").is_err());
    }
}
