use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use url::Url;

use super::SourceError;
use crate::config::DestinationConfig;

/// Resolved connection target for a remote source.
#[derive(Clone, PartialEq, Eq)]
pub struct Destination {
    pub name: String,
    pub base_url: Url,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Destination {
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
            username: None,
            password: None,
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("name", &self.name)
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Resolves a destination name to its base URL and credentials.
#[async_trait]
pub trait DestinationLookup: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<Destination, SourceError>;
}

/// Destinations declared in the application configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredDestinations {
    destinations: HashMap<String, Destination>,
}

impl ConfiguredDestinations {
    pub fn from_config(entries: &HashMap<String, DestinationConfig>) -> Result<Self, SourceError> {
        let mut destinations = HashMap::with_capacity(entries.len());
        for (name, entry) in entries {
            let base_url = Url::parse(&entry.base_url).map_err(|e| {
                SourceError::Destination(format!("destination '{name}' has an invalid base_url: {e}"))
            })?;
            destinations.insert(
                name.clone(),
                Destination {
                    name: name.clone(),
                    base_url,
                    username: entry.username.clone(),
                    password: entry.password.clone(),
                },
            );
        }
        Ok(Self { destinations })
    }
}

#[async_trait]
impl DestinationLookup for ConfiguredDestinations {
    async fn resolve(&self, name: &str) -> Result<Destination, SourceError> {
        self.destinations
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::Destination(format!("unknown destination '{name}'")))
    }
}
