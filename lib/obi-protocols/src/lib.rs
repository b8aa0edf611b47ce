//! Protocol detection and span construction.
//!
//! This crate turns captured HTTP exchanges into typed [`Span`]s. Exchanges are handed to a [`MatcherChain`], which
//! tries each [`SpanMatcher`] in turn: dialects carried over HTTP (SQL++ query services, Elasticsearch) are recognized
//! first, and anything else is reported as plain HTTP.
#![deny(missing_docs)]

mod config;
pub use self::config::{ElasticsearchConfiguration, ProtocolsConfiguration, SqlppConfiguration};

pub mod matchers;
pub use self::matchers::{MatcherChain, ParseError, SpanMatcher};

mod span;
pub use self::span::{DbError, HttpSubtype, Span, DB_SYSTEM_COUCHBASE, DB_SYSTEM_ELASTICSEARCH, DB_SYSTEM_OTHER_SQL};

pub mod table_path;
pub use self::table_path::TablePath;
