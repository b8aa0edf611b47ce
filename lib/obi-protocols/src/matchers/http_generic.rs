use bytes::Bytes;
use http::{Request, Response};

use super::SpanMatcher;
use crate::{HttpSubtype, Span};

/// Fallback matcher for plain HTTP.
///
/// Detects every exchange, filling in the method, route, path and status where the base span doesn't already carry
/// them.
#[derive(Default)]
pub struct GenericHttpMatcher;

impl GenericHttpMatcher {
    /// Creates a new `GenericHttpMatcher`.
    pub fn new() -> Self {
        Self
    }
}

impl SpanMatcher for GenericHttpMatcher {
    fn name(&self) -> &'static str {
        "http"
    }

    fn try_match(&self, base: &Span, request: &Request<Bytes>, response: Option<&Response<Bytes>>) -> Option<Span> {
        let mut span = base.clone();
        span.sub_type = HttpSubtype::None;

        let path = request.uri().path();
        if span.method.is_empty() {
            span.method = request.method().as_str().to_string();
        }
        if span.path.is_empty() {
            span.path = path.to_string();
        }
        if span.route.is_empty() {
            span.route = path.to_string();
        }
        if span.status == 0 {
            if let Some(response) = response {
                span.status = response.status().as_u16();
            }
        }

        Some(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_in_missing_fields() {
        let request = Request::delete("/users/42?force=true").body(Bytes::new()).unwrap();
        let response = Response::builder().status(204).body(Bytes::new()).unwrap();

        let span = GenericHttpMatcher::new()
            .try_match(&Span::default(), &request, Some(&response))
            .unwrap();
        assert_eq!(span.sub_type, HttpSubtype::None);
        assert_eq!(span.method, "DELETE");
        assert_eq!(span.path, "/users/42");
        assert_eq!(span.route, "/users/42");
        assert_eq!(span.status, 204);
        assert!(!span.is_db());
    }

    #[test]
    fn keeps_what_the_base_span_knows() {
        let base = Span {
            method: "GET".to_string(),
            route: "/users/{id}".to_string(),
            status: 500,
            ..Default::default()
        };
        let request = Request::post("/users/42").body(Bytes::new()).unwrap();
        let response = Response::builder().status(200).body(Bytes::new()).unwrap();

        let span = GenericHttpMatcher::new().try_match(&base, &request, Some(&response)).unwrap();
        assert_eq!(span.method, "GET");
        assert_eq!(span.route, "/users/{id}");
        assert_eq!(span.path, "/users/42");
        assert_eq!(span.status, 500);
    }

    #[test]
    fn missing_response_leaves_status_unknown() {
        let request = Request::get("/").body(Bytes::new()).unwrap();
        let span = GenericHttpMatcher::new().try_match(&Span::default(), &request, None).unwrap();
        assert_eq!(span.status, 0);
    }
}
