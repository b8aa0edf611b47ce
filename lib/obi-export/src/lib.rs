//! Export policy primitives: which telemetry features are enabled, and which signals may leave the process.
#![deny(missing_docs)]

mod export_modes;
pub use self::export_modes::ExportModes;

mod features;
pub use self::features::{FeatureError, FeatureNames, Features};

mod registry;
pub use self::registry::{FeatureRegistry, FeatureRegistryBuilder};
