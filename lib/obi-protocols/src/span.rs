//! Span model.

use std::fmt;

/// Database system tag for Couchbase.
pub const DB_SYSTEM_COUCHBASE: &str = "couchbase";

/// Database system tag for SQL-like query services that couldn't be identified more precisely.
pub const DB_SYSTEM_OTHER_SQL: &str = "other_sql";

/// Database system tag for Elasticsearch.
pub const DB_SYSTEM_ELASTICSEARCH: &str = "elasticsearch";

/// Protocol carried on top of an HTTP exchange.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum HttpSubtype {
    /// Plain HTTP.
    #[default]
    None,

    /// SQL++ (N1QL and compatible query services).
    Sqlpp,

    /// Elasticsearch REST API.
    Elasticsearch,
}

impl HttpSubtype {
    /// Returns the name of the subtype.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "http",
            Self::Sqlpp => "sqlpp",
            Self::Elasticsearch => "elasticsearch",
        }
    }
}

impl fmt::Display for HttpSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error reported by a database in response to a request.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct DbError {
    /// Error code, as reported by the database.
    pub error_code: String,

    /// Human-readable error description.
    pub description: String,
}

/// A single detected operation.
///
/// Spans are built by [`SpanMatcher`][crate::SpanMatcher]s from a base span (carrying whatever the capture layer already
/// knew about the exchange) and are owned by whoever asked for the match.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Span {
    /// Protocol carried by the exchange.
    pub sub_type: HttpSubtype,

    /// Database system tag, or empty if the exchange isn't a database call.
    pub db_system: String,

    /// Method or operation (`GET`, `SELECT`, `search`, ...).
    pub method: String,

    /// Top-level container name (bucket, database).
    pub db_namespace: String,

    /// Route, or nested container path for database calls.
    pub route: String,

    /// Request path.
    pub path: String,

    /// Statement text.
    pub statement: String,

    /// Response status code, or zero if unknown.
    pub status: u16,

    /// Error reported by the database, if any.
    pub db_error: Option<DbError>,
}

impl Span {
    /// Returns `true` if the span describes a database call.
    pub fn is_db(&self) -> bool {
        !self.db_system.is_empty()
    }

    /// Returns `true` if the database reported an error for this operation.
    pub fn has_db_error(&self) -> bool {
        self.db_error.is_some()
    }
}
