use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::{FeatureNames, Features};

const ALL_ALIASES: [&str; 2] = ["all", "*"];

/// Maps configuration names to [`Features`] bits.
///
/// A registry is assembled once, during startup, through [`FeatureRegistryBuilder`]. Once built it can no longer be
/// modified, which makes it safe to share between any number of concurrent lookups: cloning only bumps a reference
/// count. Extensions that want to add or remove feature names must do so on the builder, before the registry is handed
/// to the components that resolve configuration.
#[derive(Clone, Debug)]
pub struct FeatureRegistry {
    names: Arc<IndexMap<String, Features>>,
}

impl FeatureRegistry {
    /// Creates a registry with the built-in feature names.
    pub fn builtin() -> Self {
        FeatureRegistryBuilder::builtin().build()
    }

    /// Creates a builder seeded with the built-in feature names.
    pub fn builder() -> FeatureRegistryBuilder {
        FeatureRegistryBuilder::builtin()
    }

    /// Returns the bits registered under the given name, if any.
    pub fn get(&self, name: &str) -> Option<Features> {
        self.names.get(name).copied()
    }

    /// Resolves a list of feature names into a bitmask.
    ///
    /// Unknown names are ignored.
    pub fn load<'a, I>(&self, names: I) -> Features
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().fold(Features::none(), |acc, name| match self.get(name) {
            Some(bits) => acc | bits,
            None => {
                debug!(feature = name, "Ignoring unknown feature name.");
                acc
            }
        })
    }

    /// Resolves configured feature names into a bitmask.
    pub fn load_names(&self, names: &FeatureNames) -> Features {
        self.load(names.iter())
    }

    /// Returns the names describing the given bitmask.
    ///
    /// This is the inverse of [`load`][Self::load]: every registered name (other than the `all` aliases) whose bits are
    /// fully contained in `features` is returned, in registration order. A bitmask with every bit set is described as
    /// `["all"]`.
    pub fn names(&self, features: Features) -> Vec<&str> {
        if features.is_all_bits() {
            return vec![ALL_ALIASES[0]];
        }

        self.names
            .iter()
            .filter(|(name, bits)| {
                !ALL_ALIASES.contains(&name.as_str()) && !bits.is_none() && features.contains(**bits)
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Builder for [`FeatureRegistry`].
#[derive(Clone, Debug)]
pub struct FeatureRegistryBuilder {
    names: IndexMap<String, Features>,
}

impl FeatureRegistryBuilder {
    /// Creates an empty builder.
    pub fn empty() -> Self {
        Self { names: IndexMap::new() }
    }

    /// Creates a builder seeded with the built-in feature names.
    pub fn builtin() -> Self {
        Self::empty()
            .with_feature("network", Features::Network)
            .with_feature("network_inter_zone", Features::NetworkInterZone)
            .with_feature("application", Features::ApplicationRed)
            .with_feature("application_span", Features::SpanLegacy)
            .with_feature("application_span_otel", Features::SpanOTel)
            .with_feature("application_span_sizes", Features::SpanSizes)
            .with_feature("application_service_graph", Features::Graph)
            .with_feature("application_process", Features::Process)
            .with_feature("application_host", Features::ApplicationHost)
            .with_feature("ebpf", Features::Ebpf)
            .with_feature("all", Features::all_bits())
            .with_feature("*", Features::all_bits())
    }

    /// Registers (or replaces) a feature name.
    pub fn with_feature<N: Into<String>>(mut self, name: N, bits: Features) -> Self {
        self.names.insert(name.into(), bits);
        self
    }

    /// Removes a feature name.
    pub fn without_feature(mut self, name: &str) -> Self {
        self.names.shift_remove(name);
        self
    }

    /// Freezes the builder into a registry.
    pub fn build(self) -> FeatureRegistry {
        FeatureRegistry {
            names: Arc::new(self.names),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const SINGLE_FLAGS: [Features; 10] = [
        Features::Network,
        Features::NetworkInterZone,
        Features::ApplicationRed,
        Features::SpanLegacy,
        Features::SpanOTel,
        Features::SpanSizes,
        Features::Graph,
        Features::Process,
        Features::ApplicationHost,
        Features::Ebpf,
    ];

    #[test]
    fn load_builtin_names() {
        let registry = FeatureRegistry::builtin();
        assert_eq!(registry.load(["network"]), Features::Network);
        assert_eq!(
            registry.load(["application", "application_service_graph"]),
            Features::ApplicationRed | Features::Graph
        );
        assert_eq!(registry.load(["all"]), Features::all_bits());
        assert_eq!(registry.load(["*"]), Features::all_bits());
        assert_eq!(registry.load(std::iter::empty()), Features::none());
    }

    #[test]
    fn unknown_names_are_ignored() {
        let registry = FeatureRegistry::builtin();
        assert_eq!(registry.load(["network", "gpu", ""]), Features::Network);
        assert_eq!(registry.load(["Network"]), Features::none());
    }

    #[test]
    fn builder_extends_and_removes() {
        let gpu = Features::from(1u64 << 40);
        let registry = FeatureRegistry::builder()
            .with_feature("gpu", gpu)
            .without_feature("ebpf")
            .build();

        assert_eq!(registry.load(["gpu", "ebpf"]), gpu);
        assert_eq!(registry.names(gpu | Features::Network), vec!["network", "gpu"]);

        // The registry that was already built is unaffected by new builders.
        let builtin = FeatureRegistry::builtin();
        assert_eq!(builtin.get("gpu"), None);
        assert_eq!(builtin.get("ebpf"), Some(Features::Ebpf));
    }

    #[test]
    fn names_of_all_bits_is_all() {
        assert_eq!(FeatureRegistry::builtin().names(Features::all_bits()), vec!["all"]);
        assert!(FeatureRegistry::builtin().names(Features::none()).is_empty());
    }

    fn arb_features() -> impl Strategy<Value = Features> {
        proptest::bits::u16::between(0, SINGLE_FLAGS.len()).prop_map(|mask| {
            SINGLE_FLAGS
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .fold(Features::none(), |acc, (_, flag)| acc | *flag)
        })
    }

    proptest! {
        #[test]
        fn property_test_names_round_trip(features in arb_features()) {
            let registry = FeatureRegistry::builtin();
            let names = registry.names(features);
            prop_assert_eq!(registry.load(names), features);
        }
    }
}
