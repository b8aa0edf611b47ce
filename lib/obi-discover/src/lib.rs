//! Service discovery and attribute resolution.
//!
//! Observed processes ([`ProcessInfo`]) are checked against configured [`Criterion`]s by a [`CriteriaEvaluator`]. A
//! selected process, along with every criterion that matched it, is then handed to the [`Typer`], which resolves the
//! service attributes ([`ServiceAttributes`]) that drive how the process is instrumented: its identity, which signals
//! may be exported, which telemetry features are enabled, its sampler, and its custom route templates.
#![deny(missing_docs)]

mod config;
pub use self::config::{DiscoveryConfiguration, MetricsConfiguration};

mod criterion;
pub use self::criterion::{Criterion, CriterionMetrics};

mod matcher;
pub use self::matcher::StringMatcher;

mod ports;
pub use self::ports::{PortEnum, PortEnumError};

mod process;
pub use self::process::ProcessInfo;

mod routes;
pub use self::routes::{CustomRoutesConfig, RouteMatcher};

mod sampler;
pub use self::sampler::{Sampler, SamplerConfig, SamplerError};

mod selector;
pub use self::selector::{CriteriaEvaluator, ProcessMatch};

mod typer;
pub use self::typer::{ServiceAttributes, ServiceUid, Typer};
