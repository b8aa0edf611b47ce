use serde::Deserialize;

const DEFAULT_MAX_STATEMENT_LENGTH: usize = 4096;

fn default_enabled() -> bool {
    true
}

fn default_endpoint_patterns() -> Vec<String> {
    vec!["/query/service".to_string()]
}

fn default_max_statement_length() -> usize {
    DEFAULT_MAX_STATEMENT_LENGTH
}

/// SQL++ detection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct SqlppConfiguration {
    /// Whether SQL++ detection is enabled.
    ///
    /// Defaults to `true`.
    #[serde(default = "default_enabled")]
    enabled: bool,

    /// Request paths that identify a SQL++ query service.
    ///
    /// A request is considered when its path equals, or ends with, one of these patterns.
    ///
    /// Defaults to `["/query/service"]`.
    #[serde(default = "default_endpoint_patterns")]
    endpoint_patterns: Vec<String>,
}

impl SqlppConfiguration {
    /// Returns `true` if SQL++ detection is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the configured endpoint patterns.
    pub fn endpoint_patterns(&self) -> &[String] {
        &self.endpoint_patterns
    }

    /// Sets the endpoint patterns.
    pub fn with_endpoint_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoint_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables SQL++ detection.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for SqlppConfiguration {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint_patterns: default_endpoint_patterns(),
        }
    }
}

/// Elasticsearch detection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct ElasticsearchConfiguration {
    /// Whether Elasticsearch detection is enabled.
    ///
    /// Defaults to `true`.
    #[serde(default = "default_enabled")]
    enabled: bool,
}

impl ElasticsearchConfiguration {
    /// Returns `true` if Elasticsearch detection is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables Elasticsearch detection.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for ElasticsearchConfiguration {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

/// Protocol detection configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ProtocolsConfiguration {
    /// SQL++ detection settings.
    #[serde(default)]
    sqlpp: SqlppConfiguration,

    /// Elasticsearch detection settings.
    #[serde(default)]
    elasticsearch: ElasticsearchConfiguration,

    /// Maximum length of a recorded statement, in bytes.
    ///
    /// Longer statements are truncated on a character boundary.
    ///
    /// Defaults to 4096.
    #[serde(default = "default_max_statement_length")]
    max_statement_length: usize,
}

impl ProtocolsConfiguration {
    /// Returns the SQL++ detection settings.
    pub fn sqlpp(&self) -> &SqlppConfiguration {
        &self.sqlpp
    }

    /// Returns the Elasticsearch detection settings.
    pub fn elasticsearch(&self) -> &ElasticsearchConfiguration {
        &self.elasticsearch
    }

    /// Returns the maximum length of a recorded statement, in bytes.
    pub fn max_statement_length(&self) -> usize {
        self.max_statement_length
    }

    /// Sets the SQL++ detection settings.
    pub fn with_sqlpp(mut self, sqlpp: SqlppConfiguration) -> Self {
        self.sqlpp = sqlpp;
        self
    }

    /// Sets the Elasticsearch detection settings.
    pub fn with_elasticsearch(mut self, elasticsearch: ElasticsearchConfiguration) -> Self {
        self.elasticsearch = elasticsearch;
        self
    }

    /// Sets the maximum length of a recorded statement, in bytes.
    pub fn with_max_statement_length(mut self, max_statement_length: usize) -> Self {
        self.max_statement_length = max_statement_length;
        self
    }
}

impl Default for ProtocolsConfiguration {
    fn default() -> Self {
        Self {
            sqlpp: SqlppConfiguration::default(),
            elasticsearch: ElasticsearchConfiguration::default(),
            max_statement_length: default_max_statement_length(),
        }
    }
}
