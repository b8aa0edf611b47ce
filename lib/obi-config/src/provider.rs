use std::path::Path;

use figment::{
    providers::{Data, Yaml},
    value::{Dict, Map},
    Error, Metadata, Profile, Provider,
};
use obi_error::{ErrorContext as _, GenericError};

/// A YAML document, read and parsed at load time.
///
/// Unlike `figment`'s lazy file providers, a missing or malformed file surfaces as soon as it is added to the loader
/// instead of when the configuration is extracted.
pub struct ResolvedProvider {
    data: Map<Profile, Dict>,
    metadata: Metadata,
}

impl ResolvedProvider {
    pub fn from_yaml<P>(path: P) -> Result<Self, GenericError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_error_context(|| format!("Failed to read configuration file '{}'.", path.display()))?;
        let data = Data::<Yaml>::string(&contents)
            .data()
            .with_error_context(|| format!("Failed to parse configuration file '{}' as YAML.", path.display()))?;

        Ok(Self {
            data,
            metadata: Metadata::from("YAML file", path),
        })
    }
}

impl Provider for ResolvedProvider {
    fn metadata(&self) -> Metadata {
        self.metadata.clone()
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        Ok(self.data.clone())
    }
}
