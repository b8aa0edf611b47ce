use serde::Deserialize;

/// Per-service route templates.
///
/// Incoming routes apply to requests the service receives, and outgoing routes to requests it sends. Templates use
/// `{name}` or `:name` for a single path segment and a trailing `*` for any remainder, e.g. `/users/{id}/orders` or
/// `/static/*`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct CustomRoutesConfig {
    /// Route templates for inbound requests.
    pub incoming: Vec<String>,

    /// Route templates for outbound requests.
    pub outgoing: Vec<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Segment {
    Literal(String),
    Parameter,
    Remainder,
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct RouteTemplate {
    template: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut parts = path_segments(template).peekable();
        while let Some(part) = parts.next() {
            let is_last = parts.peek().is_none();
            let segment = if part == "*" && is_last {
                Segment::Remainder
            } else if part.starts_with(':') || (part.starts_with('{') && part.ends_with('}')) {
                Segment::Parameter
            } else {
                Segment::Literal(part.to_string())
            };
            segments.push(segment);
        }

        Self {
            template: template.to_string(),
            segments,
        }
    }

    fn matches(&self, path: &str) -> bool {
        let mut parts = path_segments(path);
        for segment in &self.segments {
            match segment {
                Segment::Remainder => return true,
                Segment::Parameter => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(literal) => {
                    if parts.next() != Some(literal.as_str()) {
                        return false;
                    }
                }
            }
        }
        parts.next().is_none()
    }
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Maps request paths to the route template they belong to.
///
/// Templates are tried in the order they were given; the first one that matches wins. Query strings are ignored.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RouteMatcher {
    routes: Vec<RouteTemplate>,
}

impl RouteMatcher {
    /// Creates a new `RouteMatcher` from the given templates.
    pub fn new<I, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            routes: templates
                .into_iter()
                .map(|template| RouteTemplate::parse(template.as_ref()))
                .collect(),
        }
    }

    /// Returns `true` if the matcher holds no templates.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns the template matching the given path, if any.
    pub fn find(&self, path: &str) -> Option<&str> {
        let path = path.split_once('?').map_or(path, |(path, _)| path);
        self.routes
            .iter()
            .find(|route| route.matches(path))
            .map(|route| route.template.as_str())
    }
}
