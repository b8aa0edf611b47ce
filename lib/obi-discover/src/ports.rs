use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer};
use snafu::Snafu;

/// Error encountered while parsing a port enumeration.
#[derive(Debug, Eq, PartialEq, Snafu)]
#[snafu(context(suffix(false)))]
pub enum PortEnumError {
    /// The enumeration was empty.
    #[snafu(display("port enumeration must not be empty"))]
    Empty,

    /// A port number could not be parsed.
    #[snafu(display("invalid port '{}'", value))]
    InvalidPort {
        /// The offending value.
        value: String,
    },

    /// A range had its bounds reversed.
    #[snafu(display("invalid port range {}-{}: start is greater than end", start, end))]
    InvalidRange {
        /// Start of the range.
        start: u16,

        /// End of the range.
        end: u16,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct PortRange {
    start: u16,
    end: u16,
}

/// A set of ports, written as a comma-separated list of ports and inclusive ranges.
///
/// For example, `80,443,8000-8999`. A single integer is also accepted when deserializing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PortEnum {
    ranges: Vec<PortRange>,
}

impl PortEnum {
    /// Creates a port enumeration holding a single port.
    pub fn single(port: u16) -> Self {
        Self {
            ranges: vec![PortRange { start: port, end: port }],
        }
    }

    /// Returns `true` if the port is part of the enumeration.
    pub fn contains(&self, port: u16) -> bool {
        self.ranges.iter().any(|range| range.start <= port && port <= range.end)
    }

    /// Returns `true` if any of the given ports is part of the enumeration.
    pub fn contains_any(&self, ports: &[u16]) -> bool {
        ports.iter().any(|port| self.contains(*port))
    }
}

fn parse_port(value: &str) -> Result<u16, PortEnumError> {
    value.trim().parse().map_err(|_| PortEnumError::InvalidPort {
        value: value.trim().to_string(),
    })
}

impl FromStr for PortEnum {
    type Err = PortEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();
        for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let range = match item.split_once('-') {
                Some((start, end)) => {
                    let (start, end) = (parse_port(start)?, parse_port(end)?);
                    if start > end {
                        return Err(PortEnumError::InvalidRange { start, end });
                    }
                    PortRange { start, end }
                }
                None => {
                    let port = parse_port(item)?;
                    PortRange { start: port, end: port }
                }
            };
            ranges.push(range);
        }

        if ranges.is_empty() {
            return Err(PortEnumError::Empty);
        }
        Ok(Self { ranges })
    }
}

impl fmt::Display for PortEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if range.start == range.end {
                write!(f, "{}", range.start)?;
            } else {
                write!(f, "{}-{}", range.start, range.end)?;
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for PortEnum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PortEnumVisitor;

        impl de::Visitor<'_> for PortEnumVisitor {
            type Value = PortEnum;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a port number or a comma-separated list of ports and port ranges")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                u16::try_from(value)
                    .map(PortEnum::single)
                    .map_err(|_| E::custom(PortEnumError::InvalidPort {
                        value: value.to_string(),
                    }))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                u16::try_from(value)
                    .map(PortEnum::single)
                    .map_err(|_| E::custom(PortEnumError::InvalidPort {
                        value: value.to_string(),
                    }))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(PortEnumVisitor)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parse_list() {
        let ports: PortEnum = "80, 443,8000-8999".parse().unwrap();
        assert!(ports.contains(80));
        assert!(ports.contains(443));
        assert!(ports.contains(8000));
        assert!(ports.contains(8500));
        assert!(ports.contains(8999));
        assert!(!ports.contains(81));
        assert!(!ports.contains(9000));
        assert_eq!(ports.to_string(), "80,443,8000-8999");
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<PortEnum>(), Err(PortEnumError::Empty));
        assert_eq!(" , ".parse::<PortEnum>(), Err(PortEnumError::Empty));
        assert_eq!(
            "http".parse::<PortEnum>(),
            Err(PortEnumError::InvalidPort {
                value: "http".to_string()
            })
        );
        assert_eq!(
            "70000".parse::<PortEnum>(),
            Err(PortEnumError::InvalidPort {
                value: "70000".to_string()
            })
        );
        assert_eq!(
            "9000-8000".parse::<PortEnum>(),
            Err(PortEnumError::InvalidRange { start: 9000, end: 8000 })
        );
    }

    #[test]
    fn contains_any() {
        let ports: PortEnum = "8080-8089".parse().unwrap();
        assert!(ports.contains_any(&[22, 8081]));
        assert!(!ports.contains_any(&[22, 443]));
        assert!(!ports.contains_any(&[]));
    }

    #[test]
    fn deserialize() {
        assert_eq!(serde_yaml::from_str::<PortEnum>("8080").unwrap(), PortEnum::single(8080));
        assert_eq!(
            serde_yaml::from_str::<PortEnum>("\"80,443\"").unwrap(),
            "80,443".parse().unwrap()
        );
        assert!(serde_yaml::from_str::<PortEnum>("-1").is_err());
        assert!(serde_yaml::from_str::<PortEnum>("\"abc\"").is_err());
    }

    proptest! {
        #[test]
        fn property_test_range_bounds(start in any::<u16>(), len in 0u16..1000, probe in any::<u16>()) {
            let end = start.saturating_add(len);
            let ports: PortEnum = format!("{}-{}", start, end).parse().unwrap();
            prop_assert_eq!(ports.contains(probe), start <= probe && probe <= end);
        }
    }
}
