use std::fmt;

use serde::Deserialize;
use snafu::Snafu;

/// Error encountered while building a sampler from its configuration.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(context(suffix(false)))]
pub enum SamplerError {
    /// The sampler name isn't known.
    #[snafu(display("unknown sampler '{}'", name))]
    UnknownSampler {
        /// The configured name.
        name: String,
    },

    /// The sampler argument isn't a valid ratio.
    #[snafu(display("invalid sampling ratio '{}': expected a number between 0 and 1", arg))]
    InvalidRatio {
        /// The configured argument.
        arg: String,
    },
}

/// A trace sampling strategy.
///
/// The names follow the OpenTelemetry `OTEL_TRACES_SAMPLER` conventions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Sampler {
    /// Samples every trace.
    AlwaysOn,

    /// Samples no trace.
    AlwaysOff,

    /// Samples the given fraction of traces, based on the trace ID.
    TraceIdRatio(f64),

    /// Follows the parent's decision, sampling every root trace.
    #[default]
    ParentBasedAlwaysOn,

    /// Follows the parent's decision, sampling no root trace.
    ParentBasedAlwaysOff,

    /// Follows the parent's decision, sampling the given fraction of root traces.
    ParentBasedTraceIdRatio(f64),
}

impl fmt::Display for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlwaysOn => f.write_str("always_on"),
            Self::AlwaysOff => f.write_str("always_off"),
            Self::TraceIdRatio(ratio) => write!(f, "traceidratio({})", ratio),
            Self::ParentBasedAlwaysOn => f.write_str("parentbased_always_on"),
            Self::ParentBasedAlwaysOff => f.write_str("parentbased_always_off"),
            Self::ParentBasedTraceIdRatio(ratio) => write!(f, "parentbased_traceidratio({})", ratio),
        }
    }
}

#[derive(Deserialize)]
struct RawSamplerConfig {
    #[serde(default)]
    name: String,

    #[serde(default)]
    arg: String,
}

/// Per-service sampler configuration.
///
/// An empty name selects the default sampler (`parentbased_always_on`). The configuration is validated when it is
/// deserialized, so an unknown sampler name or an invalid ratio rejects the whole configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(try_from = "RawSamplerConfig")]
pub struct SamplerConfig {
    name: String,
    arg: String,
}

impl SamplerConfig {
    /// Creates a new `SamplerConfig`.
    ///
    /// # Errors
    ///
    /// If the name isn't a known sampler, or the argument isn't valid for it, an error is returned.
    pub fn new<N: Into<String>, A: Into<String>>(name: N, arg: A) -> Result<Self, SamplerError> {
        let config = Self {
            name: name.into(),
            arg: arg.into(),
        };
        config.sampler()?;
        Ok(config)
    }

    /// Returns the sampler name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the sampler argument.
    pub fn arg(&self) -> &str {
        &self.arg
    }

    /// Builds the configured sampler.
    pub fn sampler(&self) -> Result<Sampler, SamplerError> {
        match self.name.trim().to_ascii_lowercase().as_str() {
            "" | "parentbased_always_on" => Ok(Sampler::ParentBasedAlwaysOn),
            "parentbased_always_off" => Ok(Sampler::ParentBasedAlwaysOff),
            "parentbased_traceidratio" => self.ratio().map(Sampler::ParentBasedTraceIdRatio),
            "always_on" => Ok(Sampler::AlwaysOn),
            "always_off" => Ok(Sampler::AlwaysOff),
            "traceidratio" => self.ratio().map(Sampler::TraceIdRatio),
            _ => Err(SamplerError::UnknownSampler { name: self.name.clone() }),
        }
    }

    fn ratio(&self) -> Result<f64, SamplerError> {
        let arg = self.arg.trim();
        if arg.is_empty() {
            return Ok(1.0);
        }

        match arg.parse::<f64>() {
            Ok(ratio) if (0.0..=1.0).contains(&ratio) => Ok(ratio),
            _ => Err(SamplerError::InvalidRatio { arg: self.arg.clone() }),
        }
    }
}

impl TryFrom<RawSamplerConfig> for SamplerConfig {
    type Error = SamplerError;

    fn try_from(raw: RawSamplerConfig) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.arg)
    }
}
