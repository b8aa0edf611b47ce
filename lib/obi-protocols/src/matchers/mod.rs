//! Protocol matchers.
//!
//! A matcher inspects one captured request/response exchange and decides whether it speaks the matcher's protocol. If
//! it does, the matcher builds a [`Span`] describing the operation. Matchers are tried in a fixed order by a
//! [`MatcherChain`], with the most specific dialects first and the generic HTTP matcher last.

use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderMap, Request, Response};
use snafu::Snafu;
use tracing::trace;

use crate::{ProtocolsConfiguration, Span};

mod elasticsearch;
pub use self::elasticsearch::ElasticsearchMatcher;

mod http_generic;
pub use self::http_generic::GenericHttpMatcher;

mod sqlpp;
pub use self::sqlpp::SqlppMatcher;

/// Error encountered while decoding a request or response payload.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum ParseError {
    /// The payload was empty.
    #[snafu(display("payload is empty"))]
    EmptyBody,

    /// The payload's content type isn't one the matcher understands.
    #[snafu(display("unsupported content type '{}'", content_type))]
    UnsupportedContentType {
        /// The content type found on the payload.
        content_type: String,
    },

    /// A required field was missing from the payload.
    #[snafu(display("missing required field '{}'", field))]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The payload wasn't valid JSON, or didn't have the expected shape.
    #[snafu(display("invalid JSON payload: {}", source))]
    InvalidJson {
        /// Error source.
        source: serde_json::Error,
    },
}

/// Detects a protocol in a captured HTTP exchange.
pub trait SpanMatcher: Send + Sync {
    /// Name of the matcher, used for diagnostics.
    fn name(&self) -> &'static str;

    /// Attempts to build a span from the exchange.
    ///
    /// `base` carries whatever was already known about the exchange. It is never modified: when the exchange is
    /// detected, a new span derived from `base` is returned, and `None` is returned otherwise. Malformed payloads are
    /// treated as "not detected".
    fn try_match(&self, base: &Span, request: &Request<Bytes>, response: Option<&Response<Bytes>>) -> Option<Span>;
}

/// An ordered list of matchers.
///
/// Matchers are tried in order until one of them detects the exchange.
pub struct MatcherChain {
    matchers: Vec<Box<dyn SpanMatcher>>,
}

impl MatcherChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self { matchers: Vec::new() }
    }

    /// Builds the default chain for the given configuration.
    ///
    /// Enabled dialect matchers come first, in the order SQL++ then Elasticsearch, followed by the generic HTTP
    /// matcher, which detects every exchange.
    pub fn from_configuration(config: &ProtocolsConfiguration) -> Self {
        let mut chain = Self::new();
        if config.sqlpp().enabled() {
            chain = chain.with_matcher(SqlppMatcher::from_configuration(config));
        }
        if config.elasticsearch().enabled() {
            chain = chain.with_matcher(ElasticsearchMatcher::from_configuration(config));
        }
        chain.with_matcher(GenericHttpMatcher::new())
    }

    /// Appends a matcher to the end of the chain.
    pub fn with_matcher<M>(mut self, matcher: M) -> Self
    where
        M: SpanMatcher + 'static,
    {
        self.matchers.push(Box::new(matcher));
        self
    }

    /// Returns the names of the matchers, in the order they are tried.
    pub fn matcher_names(&self) -> Vec<&'static str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    /// Returns the span built by the first matcher that detects the exchange.
    pub fn detect(&self, base: &Span, request: &Request<Bytes>, response: Option<&Response<Bytes>>) -> Option<Span> {
        for matcher in &self.matchers {
            if let Some(span) = matcher.try_match(base, request, response) {
                trace!(matcher = matcher.name(), path = request.uri().path(), "Detected protocol.");
                return Some(span);
            }
        }
        None
    }
}

impl Default for MatcherChain {
    fn default() -> Self {
        Self::from_configuration(&ProtocolsConfiguration::default())
    }
}

/// Returns `true` if the path equals, or ends with, any of the given patterns.
pub(crate) fn matches_endpoint_pattern(path: &str, patterns: &[String]) -> bool {
    !path.is_empty() && patterns.iter().any(|pattern| path == pattern || path.ends_with(pattern.as_str()))
}

/// Returns the media type of the payload (the content type without its parameters), if any.
pub(crate) fn media_type(headers: &HeaderMap) -> Option<&str> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    (!media_type.is_empty()).then_some(media_type)
}

/// Returns the value of the given content type parameter, if present.
pub(crate) fn content_type_parameter<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Truncates a statement to at most `max_len` bytes, on a character boundary.
pub(crate) fn truncate_statement(statement: &str, max_len: usize) -> String {
    if statement.len() <= max_len {
        return statement.to_string();
    }

    let mut end = max_len;
    while !statement.is_char_boundary(end) {
        end -= 1;
    }
    statement[..end].to_string()
}
