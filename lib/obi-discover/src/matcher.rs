use std::fmt;

use globset::{Glob, GlobMatcher};
use regex::Regex;
use serde::{de, Deserialize, Deserializer};

/// Matches string values from process metadata.
///
/// When deserialized, a string matcher is a glob pattern, except for fields that explicitly hold regular expressions.
#[derive(Clone, Debug)]
pub enum StringMatcher {
    /// Matches a single value exactly.
    Exact(String),

    /// Matches values against a glob pattern.
    Glob(GlobMatcher),

    /// Matches values containing a match of a regular expression.
    Regex(Regex),
}

impl StringMatcher {
    /// Creates a matcher for the exact given value.
    pub fn exact<S: Into<String>>(value: S) -> Self {
        Self::Exact(value.into())
    }

    /// Creates a matcher from a glob pattern.
    ///
    /// # Errors
    ///
    /// If the pattern is not a valid glob, an error is returned.
    pub fn glob(pattern: &str) -> Result<Self, globset::Error> {
        Ok(Self::Glob(Glob::new(pattern)?.compile_matcher()))
    }

    /// Creates a matcher from a regular expression.
    ///
    /// The expression is unanchored: it matches any value containing a match.
    ///
    /// # Errors
    ///
    /// If the pattern is not a valid regular expression, an error is returned.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Regex(Regex::new(pattern)?))
    }

    /// Returns `true` if the value matches.
    pub fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == value,
            Self::Glob(glob) => glob.is_match(value),
            Self::Regex(regex) => regex.is_match(value),
        }
    }

    /// Returns the pattern this matcher was built from.
    pub fn pattern(&self) -> &str {
        match self {
            Self::Exact(expected) => expected,
            Self::Glob(glob) => glob.glob().glob(),
            Self::Regex(regex) => regex.as_str(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Exact(_) => "exact",
            Self::Glob(_) => "glob",
            Self::Regex(_) => "regex",
        }
    }
}

impl PartialEq for StringMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.pattern() == other.pattern()
    }
}

impl fmt::Display for StringMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.pattern())
    }
}

impl<'de> Deserialize<'de> for StringMatcher {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pattern = String::deserialize(deserializer)?;
        Self::glob(&pattern).map_err(de::Error::custom)
    }
}

/// Deserializes an optional regular expression matcher.
pub(crate) fn deserialize_regex<'de, D>(deserializer: D) -> Result<Option<StringMatcher>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(pattern) => StringMatcher::regex(&pattern).map(Some).map_err(de::Error::custom),
        None => Ok(None),
    }
}
