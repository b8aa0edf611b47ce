use bytes::Bytes;
use http::{HeaderName, Request, Response};
use serde::Deserialize;
use tracing::trace;

use super::{truncate_statement, SpanMatcher};
use crate::{DbError, HttpSubtype, ProtocolsConfiguration, Span, DB_SYSTEM_ELASTICSEARCH};

static ELASTIC_PRODUCT_HEADER: HeaderName = HeaderName::from_static("x-elastic-product");
const ELASTIC_PRODUCT: &str = "Elasticsearch";

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed {
        #[serde(default, rename = "type")]
        kind: String,

        #[serde(default)]
        reason: String,
    },
    Message(String),
}

/// Detects Elasticsearch REST API calls.
///
/// Elasticsearch (7.14 and later) identifies itself with the `X-Elastic-Product` response header, which is what this
/// matcher keys on. The operation is taken from the first underscore-prefixed path segment (`_search`, `_bulk`, ...),
/// and the route is the index the request targets, if any.
pub struct ElasticsearchMatcher {
    max_statement_length: usize,
}

impl ElasticsearchMatcher {
    /// Creates a new `ElasticsearchMatcher`.
    pub fn new() -> Self {
        Self {
            max_statement_length: ProtocolsConfiguration::default().max_statement_length(),
        }
    }

    /// Creates a new `ElasticsearchMatcher` from the given configuration.
    pub fn from_configuration(config: &ProtocolsConfiguration) -> Self {
        Self {
            max_statement_length: config.max_statement_length(),
        }
    }
}

impl Default for ElasticsearchMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanMatcher for ElasticsearchMatcher {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    fn try_match(&self, base: &Span, request: &Request<Bytes>, response: Option<&Response<Bytes>>) -> Option<Span> {
        let response = response?;
        let product = response.headers().get(&ELASTIC_PRODUCT_HEADER)?;
        if product.as_bytes() != ELASTIC_PRODUCT.as_bytes() {
            return None;
        }

        let path = request.uri().path();
        let (index, operation) = split_path(path);

        let mut span = base.clone();
        span.sub_type = HttpSubtype::Elasticsearch;
        span.db_system = DB_SYSTEM_ELASTICSEARCH.to_string();
        span.method = match operation {
            Some(operation) => operation.to_string(),
            None => request.method().as_str().to_string(),
        };
        span.route = index.unwrap_or_default().to_string();
        span.statement = truncate_statement(&String::from_utf8_lossy(request.body()), self.max_statement_length);
        if span.path.is_empty() {
            span.path = path.to_string();
        }
        if span.status == 0 {
            span.status = response.status().as_u16();
        }
        if response.status().as_u16() >= 400 {
            span.db_error = parse_response_error(response.body());
        }

        Some(span)
    }
}

/// Splits a request path into the targeted index (if any) and the API operation (if any).
fn split_path(path: &str) -> (Option<&str>, Option<&str>) {
    let mut segments = path.split('/').filter(|segment| !segment.is_empty());
    let Some(first) = segments.next() else {
        return (None, None);
    };

    if let Some(operation) = first.strip_prefix('_') {
        return (None, Some(operation));
    }

    let operation = segments.find_map(|segment| segment.strip_prefix('_'));
    (Some(first), operation)
}

fn parse_response_error(body: &[u8]) -> Option<DbError> {
    if body.is_empty() {
        return None;
    }

    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error: ErrorBody::Detailed { kind, reason },
        }) => Some(DbError {
            error_code: kind,
            description: reason,
        }),
        Ok(ErrorResponse {
            error: ErrorBody::Message(description),
        }) => Some(DbError {
            error_code: String::new(),
            description,
        }),
        Err(e) => {
            trace!(error = %e, "Failed to parse Elasticsearch error response.");
            None
        }
    }
}
