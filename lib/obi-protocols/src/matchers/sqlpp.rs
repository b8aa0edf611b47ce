use bytes::Bytes;
use http::{Request, Response};
use serde::{Deserialize, Deserializer};
use snafu::{OptionExt as _, ResultExt as _};
use tracing::trace;

use super::{
    content_type_parameter, matches_endpoint_pattern, media_type, truncate_statement, EmptyBody, InvalidJson,
    MissingField, ParseError, SpanMatcher, UnsupportedContentType,
};
use crate::{
    table_path::{extract_query_context_namespace, find_table_identifier, parse_table_path, unquote_identifier},
    DbError, HttpSubtype, ProtocolsConfiguration, Span, DB_SYSTEM_COUCHBASE, DB_SYSTEM_OTHER_SQL,
};

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
const N1QL_VERSION_SUFFIX: &str = "-N1QL";

#[derive(Debug, Default, Deserialize, Eq, PartialEq)]
struct SqlppRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    statement: String,

    #[serde(default, deserialize_with = "null_as_default")]
    query_context: String,
}

#[derive(Debug, Default, Deserialize)]
struct SqlppResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    errors: Vec<SqlppResponseError>,
}

#[derive(Debug, Deserialize)]
struct SqlppResponseError {
    #[serde(default)]
    code: serde_json::Value,

    #[serde(default, deserialize_with = "null_as_default")]
    msg: String,
}

/// Treats an explicit `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Detects SQL++ queries (Couchbase N1QL, AsterixDB, and other compatible query services).
///
/// Only requests sent to one of the configured query endpoints are considered. The statement is read from either a
/// JSON or a form-encoded request body, and the response content type decides whether the service is reported as
/// Couchbase or as a generic SQL-like database.
pub struct SqlppMatcher {
    endpoint_patterns: Vec<String>,
    max_statement_length: usize,
}

impl SqlppMatcher {
    /// Creates a new `SqlppMatcher` for the given endpoint patterns.
    pub fn new<I, S>(endpoint_patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoint_patterns: endpoint_patterns.into_iter().map(Into::into).collect(),
            max_statement_length: ProtocolsConfiguration::default().max_statement_length(),
        }
    }

    /// Creates a new `SqlppMatcher` from the given configuration.
    pub fn from_configuration(config: &ProtocolsConfiguration) -> Self {
        Self::new(config.sqlpp().endpoint_patterns().iter().cloned())
            .with_max_statement_length(config.max_statement_length())
    }

    /// Sets the maximum length of a recorded statement, in bytes.
    pub fn with_max_statement_length(mut self, max_statement_length: usize) -> Self {
        self.max_statement_length = max_statement_length;
        self
    }
}

impl SpanMatcher for SqlppMatcher {
    fn name(&self) -> &'static str {
        "sqlpp"
    }

    fn try_match(&self, base: &Span, request: &Request<Bytes>, response: Option<&Response<Bytes>>) -> Option<Span> {
        if !matches_endpoint_pattern(request.uri().path(), &self.endpoint_patterns) {
            return None;
        }

        let sqlpp_request = match parse_request(request) {
            Ok(sqlpp_request) => sqlpp_request,
            Err(e) => {
                trace!(error = %e, path = request.uri().path(), "Failed to parse SQL++ request.");
                return None;
            }
        };

        let statement = sqlpp_request.statement.as_str();
        let has_query_context = !sqlpp_request.query_context.is_empty();
        let table = find_table_identifier(statement)
            .map(|identifier| parse_table_path(identifier, has_query_context))
            .unwrap_or_default();

        let mut namespace = unquote_identifier(table.bucket).into_owned();
        if has_query_context {
            let context_namespace = extract_query_context_namespace(&sqlpp_request.query_context);
            if !context_namespace.is_empty() {
                namespace = context_namespace.into_owned();
            }
        }

        let db_system = if response.is_some_and(has_n1ql_version) {
            DB_SYSTEM_COUCHBASE
        } else {
            DB_SYSTEM_OTHER_SQL
        };

        let mut span = base.clone();
        span.sub_type = HttpSubtype::Sqlpp;
        span.db_system = db_system.to_string();
        span.method = statement.split_whitespace().next().unwrap_or_default().to_string();
        span.db_namespace = namespace;
        span.route = unquote_identifier(table.collection).into_owned();
        span.statement = truncate_statement(statement, self.max_statement_length);
        if span.path.is_empty() {
            span.path = request.uri().path().to_string();
        }
        if let Some(response) = response {
            if span.status == 0 {
                span.status = response.status().as_u16();
            }
            span.db_error = parse_response_error(response.body());
        }

        Some(span)
    }
}

fn parse_request(request: &Request<Bytes>) -> Result<SqlppRequest, ParseError> {
    let body = request.body();
    if body.is_empty() {
        return EmptyBody.fail();
    }

    let content_type = media_type(request.headers()).unwrap_or_default();
    let sqlpp_request = if content_type.eq_ignore_ascii_case(CONTENT_TYPE_JSON) {
        serde_json::from_slice::<SqlppRequest>(body).context(InvalidJson)?
    } else if content_type.eq_ignore_ascii_case(CONTENT_TYPE_FORM) {
        parse_form_request(body)
    } else {
        return UnsupportedContentType { content_type }.fail();
    };

    (!sqlpp_request.statement.is_empty())
        .then_some(sqlpp_request)
        .context(MissingField { field: "statement" })
}

fn parse_form_request(body: &[u8]) -> SqlppRequest {
    let mut sqlpp_request = SqlppRequest::default();
    for (key, value) in url::form_urlencoded::parse(body) {
        match key.as_ref() {
            "statement" if sqlpp_request.statement.is_empty() => sqlpp_request.statement = value.into_owned(),
            "query_context" if sqlpp_request.query_context.is_empty() => {
                sqlpp_request.query_context = value.into_owned()
            }
            _ => {}
        }
    }
    sqlpp_request
}

/// Returns the first error reported in a SQL++ response body, if any.
fn parse_response_error(body: &[u8]) -> Option<DbError> {
    if body.is_empty() {
        return None;
    }

    let response = match serde_json::from_slice::<SqlppResponse>(body) {
        Ok(response) => response,
        Err(e) => {
            trace!(error = %e, "Failed to parse SQL++ response.");
            return None;
        }
    };

    let error = response.errors.into_iter().next()?;
    let error_code = match error.code {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(code) => code,
        code => code.to_string(),
    };

    Some(DbError {
        error_code,
        description: error.msg,
    })
}

fn has_n1ql_version(response: &Response<Bytes>) -> bool {
    content_type_parameter(response.headers(), "version").is_some_and(|version| version.ends_with(N1QL_VERSION_SUFFIX))
}
