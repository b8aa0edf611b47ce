use obi_export::{ExportModes, FeatureRegistry, Features};
use tracing::{debug, warn};

use crate::{DiscoveryConfiguration, ProcessMatch, RouteMatcher, SamplerConfig};

/// Identity of a service.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ServiceUid {
    /// Service name.
    pub name: String,

    /// Service namespace, or empty if none.
    pub namespace: String,
}

/// The resolved instrumentation policy of one process.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceAttributes {
    /// Service identity.
    pub uid: ServiceUid,

    /// PID of the process.
    pub proc_pid: u32,

    /// Signals that may be exported.
    pub export_modes: ExportModes,

    /// Enabled telemetry features.
    pub features: Features,

    /// Sampler, if one was configured.
    pub sampler: Option<SamplerConfig>,

    /// Route templates for inbound requests, if custom routes were configured.
    pub custom_in_route_matcher: Option<RouteMatcher>,

    /// Route templates for outbound requests, if custom routes were configured.
    pub custom_out_route_matcher: Option<RouteMatcher>,
}

/// Resolves the attributes of selected processes.
///
/// Matched criteria are folded in configuration order, so later (more specific) criteria override earlier ones. Fields a
/// later criterion leaves unset never clear a value set by an earlier one:
///
/// - the name and the namespace are each taken from the last criterion setting them to a non-empty value, with the
///   executable name as the fallback name
/// - export modes are taken from the last criterion that sets them, falling back to the global default
/// - the sampler and the custom routes are taken from the last criterion that sets them
/// - features are taken from the last criterion whose feature names enable at least one feature, falling back to the
///   global default
///
/// Feature names are resolved through the [`FeatureRegistry`] given at construction, which must not change afterwards.
#[derive(Clone, Debug)]
pub struct Typer {
    registry: FeatureRegistry,
    default_exports: ExportModes,
    default_features: Features,
}

impl Typer {
    /// Creates a new `Typer` from the given configuration and feature registry.
    pub fn new(config: &DiscoveryConfiguration, registry: FeatureRegistry) -> Self {
        let default_features = registry.load_names(config.features());
        debug!(features = %default_features, exports = %config.exports(), "Resolved default service attributes.");

        Self {
            registry,
            default_exports: config.exports(),
            default_features,
        }
    }

    /// Returns the features applied to services that don't select their own.
    pub fn default_features(&self) -> Features {
        self.default_features
    }

    /// Resolves the attributes of the given process.
    pub fn resolve(&self, process_match: &ProcessMatch<'_>) -> ServiceAttributes {
        let process = process_match.process;

        let mut name = "";
        let mut namespace = "";
        let mut export_modes = ExportModes::UNSET;
        let mut features = Features::none();
        let mut sampler = None;
        let mut routes = None;

        for criterion in &process_match.criteria {
            if !criterion.name().is_empty() {
                name = criterion.name();
            }
            if !criterion.namespace().is_empty() {
                namespace = criterion.namespace();
            }
            if !criterion.exports().is_unset() {
                export_modes = criterion.exports();
            }
            if let Some(criterion_sampler) = criterion.sampler() {
                sampler = Some(criterion_sampler);
            }
            if let Some(criterion_routes) = criterion.routes() {
                routes = Some(criterion_routes);
            }

            let criterion_features = self.registry.load_names(criterion.features());
            if !criterion_features.is_none() {
                features = criterion_features;
            }
        }

        if name.is_empty() {
            name = process.exe_basename();
        }
        if export_modes.is_unset() {
            export_modes = self.default_exports;
        }
        if features.is_none() {
            features = self.default_features;
        }

        if let Err(e) = features.validate() {
            warn!(pid = process.pid(), service = name, error = %e, "Invalid feature selection for service.");
        }

        ServiceAttributes {
            uid: ServiceUid {
                name: name.to_string(),
                namespace: namespace.to_string(),
            },
            proc_pid: process.pid(),
            export_modes,
            features,
            sampler: sampler.cloned(),
            custom_in_route_matcher: routes.map(|routes| RouteMatcher::new(&routes.incoming)),
            custom_out_route_matcher: routes.map(|routes| RouteMatcher::new(&routes.outgoing)),
        }
    }
}

#[cfg(test)]
mod tests {
    use obi_export::FeatureNames;
    use proptest::prelude::*;

    use super::*;
    use crate::{Criterion, CustomRoutesConfig, ProcessInfo};

    fn typer_with_features(features: &[&str]) -> Typer {
        let config = DiscoveryConfiguration::default().with_features(features.iter().copied().collect::<FeatureNames>());
        Typer::new(&config, FeatureRegistry::builtin())
    }

    fn exports_allowing(metrics: bool, traces: bool, logs: bool) -> ExportModes {
        let mut modes = ExportModes::new();
        if metrics {
            modes.allow_metrics();
        }
        if traces {
            modes.allow_traces();
        }
        if logs {
            modes.allow_logs();
        }
        modes
    }

    #[test]
    fn single_criterion() {
        let process = ProcessInfo::new(1234, "/usr/bin/svc");
        let criterion = Criterion::new().with_name("svc1").with_namespace("ns1");
        let typer = typer_with_features(&[]);

        let attrs = typer.resolve(&ProcessMatch::new(&process, vec![&criterion]));
        assert_eq!(attrs.uid.name, "svc1");
        assert_eq!(attrs.uid.namespace, "ns1");
        assert_eq!(attrs.proc_pid, 1234);
        assert_eq!(attrs.export_modes, ExportModes::UNSET);
        assert_eq!(attrs.sampler, None);
        assert_eq!(attrs.custom_in_route_matcher, None);
        assert_eq!(attrs.custom_out_route_matcher, None);
    }

    #[test]
    fn sampler_and_routes() {
        let process = ProcessInfo::new(5678, "/usr/bin/svc");
        let criterion = Criterion::new()
            .with_sampler(SamplerConfig::default())
            .with_routes(CustomRoutesConfig {
                incoming: vec!["/test".to_string()],
                outgoing: vec!["/test2".to_string()],
            });

        let attrs = typer_with_features(&[]).resolve(&ProcessMatch::new(&process, vec![&criterion]));
        assert_eq!(attrs.sampler, Some(SamplerConfig::default()));

        let incoming = attrs.custom_in_route_matcher.unwrap();
        let outgoing = attrs.custom_out_route_matcher.unwrap();
        assert_eq!(incoming.find("/test"), Some("/test"));
        assert_eq!(outgoing.find("/test2"), Some("/test2"));
        assert_eq!(incoming.find("/test2"), None);
    }

    #[test]
    fn later_criteria_prevail() {
        let process = ProcessInfo::new(1234, "/usr/bin/svc");
        let first = Criterion::new()
            .with_name("svc1")
            .with_namespace("ns1")
            .with_exports(exports_allowing(true, false, false))
            .with_features(["application", "application_service_graph"]);
        let second = Criterion::new()
            .with_exports(exports_allowing(false, true, false))
            .with_features(["application_service_graph"]);

        let typer = typer_with_features(&["application_span_otel"]);
        let attrs = typer.resolve(&ProcessMatch::new(&process, vec![&first, &second]));

        assert_eq!(attrs.uid.name, "svc1");
        assert_eq!(attrs.uid.namespace, "ns1");
        assert_eq!(attrs.proc_pid, 1234);
        assert_eq!(attrs.export_modes, exports_allowing(false, true, false));
        assert_eq!(attrs.features, Features::Graph);
    }

    #[test]
    fn no_per_service_features() {
        let process = ProcessInfo::new(1234, "/usr/bin/svc");
        let first = Criterion::new().with_name("svc1").with_namespace("ns1");
        let second = Criterion::new().with_name("svc2").with_namespace("ns2");

        let typer = typer_with_features(&["application_span_otel"]);
        let attrs = typer.resolve(&ProcessMatch::new(&process, vec![&first, &second]));

        assert_eq!(attrs.uid.name, "svc2");
        assert_eq!(attrs.uid.namespace, "ns2");
        assert_eq!(attrs.export_modes, ExportModes::UNSET);
        assert_eq!(attrs.features, Features::SpanOTel);
    }

    #[test]
    fn unset_values_never_clear_earlier_ones() {
        let process = ProcessInfo::new(1, "/usr/bin/svc");
        let first = Criterion::new()
            .with_name("svc1")
            .with_namespace("ns1")
            .with_sampler(SamplerConfig::new("always_off", "").unwrap())
            .with_routes(CustomRoutesConfig {
                incoming: vec!["/users/{id}".to_string()],
                outgoing: Vec::new(),
            })
            .with_exports(exports_allowing(false, false, true))
            .with_features(["network"]);
        let second = Criterion::new().with_features(["unknown_feature"]);

        let attrs = typer_with_features(&[]).resolve(&ProcessMatch::new(&process, vec![&first, &second]));
        assert_eq!(attrs.uid.name, "svc1");
        assert_eq!(attrs.uid.namespace, "ns1");
        assert_eq!(attrs.sampler.map(|s| s.name().to_string()), Some("always_off".to_string()));
        assert_eq!(
            attrs.custom_in_route_matcher.and_then(|m| m.find("/users/7").map(str::to_string)),
            Some("/users/{id}".to_string())
        );
        assert_eq!(attrs.export_modes, exports_allowing(false, false, true));
        assert_eq!(attrs.features, Features::Network);
    }

    #[test]
    fn name_and_namespace_resolve_independently() {
        let process = ProcessInfo::new(1, "/usr/bin/svc");
        let first = Criterion::new().with_name("svc1").with_namespace("ns1");
        let second = Criterion::new().with_name("svc2");

        let attrs = typer_with_features(&[]).resolve(&ProcessMatch::new(&process, vec![&first, &second]));
        assert_eq!(attrs.uid.name, "svc2");
        assert_eq!(attrs.uid.namespace, "ns1");
    }

    #[test]
    fn executable_name_fallback() {
        let process = ProcessInfo::new(42, "/opt/app/bin/inventory");
        let criterion = Criterion::new().with_namespace("shop");

        let attrs = typer_with_features(&[]).resolve(&ProcessMatch::new(&process, vec![&criterion]));
        assert_eq!(attrs.uid.name, "inventory");
        assert_eq!(attrs.uid.namespace, "shop");
    }

    #[test]
    fn global_defaults() {
        let config = DiscoveryConfiguration::default().with_exports(exports_allowing(false, true, false));
        let typer = Typer::new(&config, FeatureRegistry::builtin());
        assert_eq!(typer.default_features(), Features::ApplicationRed);

        let process = ProcessInfo::new(1, "/usr/bin/svc");
        let criterion = Criterion::new();
        let attrs = typer.resolve(&ProcessMatch::new(&process, vec![&criterion]));
        assert_eq!(attrs.export_modes, exports_allowing(false, true, false));
        assert_eq!(attrs.features, Features::ApplicationRed);
    }

    #[test]
    fn extended_registry() {
        let custom = Features::from(1u64 << 40);
        let registry = FeatureRegistry::builder().with_feature("custom", custom).build();
        let typer = Typer::new(&DiscoveryConfiguration::default(), registry);

        let process = ProcessInfo::new(1, "/usr/bin/svc");
        let criterion = Criterion::new().with_features(["custom"]);
        let attrs = typer.resolve(&ProcessMatch::new(&process, vec![&criterion]));
        assert_eq!(attrs.features, custom);
    }

    #[test]
    fn invalid_span_metrics_are_kept() {
        let process = ProcessInfo::new(1, "/usr/bin/svc");
        let criterion = Criterion::new().with_features(["application_span", "application_span_otel"]);

        let attrs = typer_with_features(&[]).resolve(&ProcessMatch::new(&process, vec![&criterion]));
        assert!(attrs.features.invalid_span_metrics_config());
        assert!(attrs.features.validate().is_err());
    }

    const FEATURE_NAMES: &[&str] = &[
        "network",
        "application",
        "application_span",
        "application_service_graph",
        "all",
        "bogus",
    ];

    fn arb_exports() -> impl Strategy<Value = ExportModes> {
        prop_oneof![
            Just(ExportModes::UNSET),
            (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(m, t, l)| exports_allowing(m, t, l)),
        ]
    }

    fn arb_criterion() -> impl Strategy<Value = Criterion> {
        (
            prop_oneof![Just(""), Just("a"), Just("b")],
            prop_oneof![Just(""), Just("x"), Just("y")],
            arb_exports(),
            proptest::sample::subsequence(FEATURE_NAMES, 0..=2),
            proptest::option::of(prop_oneof![Just("always_on"), Just("always_off")]),
        )
            .prop_map(|(name, namespace, exports, features, sampler)| {
                let mut criterion = Criterion::new()
                    .with_name(name)
                    .with_namespace(namespace)
                    .with_exports(exports)
                    .with_features(features.into_iter().collect::<FeatureNames>());
                if let Some(sampler) = sampler {
                    criterion = criterion.with_sampler(SamplerConfig::new(sampler, "").unwrap());
                }
                criterion
            })
    }

    proptest! {
        #[test]
        fn property_test_resolution_is_idempotent(criteria in proptest::collection::vec(arb_criterion(), 1..6)) {
            let process = ProcessInfo::new(7, "/usr/bin/fallback");
            let typer = typer_with_features(&["application_span_otel"]);
            let process_match = ProcessMatch::new(&process, criteria.iter().collect());

            let first = typer.resolve(&process_match);
            let second = typer.resolve(&process_match);
            prop_assert_eq!(&first, &second);

            let expected_name = criteria
                .iter()
                .rev()
                .map(Criterion::name)
                .find(|name| !name.is_empty())
                .unwrap_or("fallback");
            prop_assert_eq!(first.uid.name.as_str(), expected_name);

            let expected_sampler = criteria.iter().rev().find_map(Criterion::sampler);
            prop_assert_eq!(first.sampler.as_ref(), expected_sampler);
        }
    }
}
