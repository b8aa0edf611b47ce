use std::fmt;

use bitmask_enum::bitmask;
use serde::{de, ser::SerializeSeq as _, Deserialize, Deserializer, Serialize, Serializer};

const METRICS: &str = "metrics";
const TRACES: &str = "traces";
const LOGS: &str = "logs";
const EXPORT_MODE_NAMES: &[&str] = &[METRICS, TRACES, LOGS];

/// Signals that are blocked from being exported.
#[bitmask(u8)]
#[bitmask_config(vec_debug)]
enum BlockedSignals {
    Metrics,
    Traces,
    Logs,
}

/// Which signals (metrics, traces, logs) may be exported for a service.
///
/// The bits are stored *inverted*: a set bit means the signal is blocked. This keeps the zero value permissive, so a
/// default-constructed `ExportModes` allows everything and doubles as the "unset" sentinel, meaning "inherit whatever
/// the global default is".
///
/// An explicit configuration starts from "everything blocked" (every bit of the byte set, not just the three signal
/// bits) and clears the bit of each allowed signal. The unused high bits therefore stay set for any explicit value, so
/// an explicit `[metrics, traces, logs]` list remains distinguishable from unset even though both allow everything.
///
/// In YAML, an absent or `null` value is unset, `[]` blocks everything, and a list allows exactly the listed signals.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExportModes {
    blocked: BlockedSignals,
}

impl Default for BlockedSignals {
    fn default() -> Self {
        Self::none()
    }
}

impl ExportModes {
    /// The unset value, inheriting the global default and allowing everything.
    pub const UNSET: ExportModes = ExportModes {
        blocked: BlockedSignals::none(),
    };

    /// Creates an explicit value that blocks every signal.
    ///
    /// Signals can then be allowed one by one.
    pub fn new() -> Self {
        Self {
            blocked: BlockedSignals::all_bits(),
        }
    }

    /// Returns `true` if this is the unset value.
    pub fn is_unset(&self) -> bool {
        self.blocked.is_none()
    }

    /// Allows exporting metrics.
    pub fn allow_metrics(&mut self) {
        self.blocked = self.blocked & !BlockedSignals::Metrics;
    }

    /// Allows exporting traces.
    pub fn allow_traces(&mut self) {
        self.blocked = self.blocked & !BlockedSignals::Traces;
    }

    /// Allows exporting logs.
    pub fn allow_logs(&mut self) {
        self.blocked = self.blocked & !BlockedSignals::Logs;
    }

    /// Returns `true` if metrics may be exported.
    pub fn can_export_metrics(&self) -> bool {
        !self.blocked.intersects(BlockedSignals::Metrics)
    }

    /// Returns `true` if traces may be exported.
    pub fn can_export_traces(&self) -> bool {
        !self.blocked.intersects(BlockedSignals::Traces)
    }

    /// Returns `true` if logs may be exported.
    pub fn can_export_logs(&self) -> bool {
        !self.blocked.intersects(BlockedSignals::Logs)
    }

    fn allowed_names(&self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(EXPORT_MODE_NAMES.len());
        if self.can_export_metrics() {
            names.push(METRICS);
        }
        if self.can_export_traces() {
            names.push(TRACES);
        }
        if self.can_export_logs() {
            names.push(LOGS);
        }
        names
    }

    fn from_names<'a, I, E>(names: I) -> Result<Self, E>
    where
        I: IntoIterator<Item = &'a str>,
        E: de::Error,
    {
        let mut modes = Self::new();
        for name in names {
            match name {
                METRICS => modes.allow_metrics(),
                TRACES => modes.allow_traces(),
                LOGS => modes.allow_logs(),
                other => return Err(E::unknown_variant(other, EXPORT_MODE_NAMES)),
            }
        }
        Ok(modes)
    }
}

impl fmt::Display for ExportModes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_unset() {
            return write!(f, "unset");
        }
        write!(f, "[{}]", self.allowed_names().join(","))
    }
}

impl Serialize for ExportModes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_unset() {
            return serializer.serialize_none();
        }

        let names = self.allowed_names();
        let mut seq = serializer.serialize_seq(Some(names.len()))?;
        for name in names {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for ExportModes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Vec<String>>::deserialize(deserializer)? {
            None => Ok(Self::UNSET),
            Some(names) => Self::from_names(names.iter().map(String::as_str)),
        }
    }
}
