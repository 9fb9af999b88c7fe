//! Provider credentials, read from the environment.

use crate::domain::Domain;
use crate::error::{EnrichError, EnrichResult};
use std::path::Path;
use tracing::debug;

pub const TMDB_API_KEY: &str = "TMDB_API_KEY";
pub const DISCOGS_USER_TOKEN: &str = "DISCOGS_USER_TOKEN";
pub const GOOGLE_BOOKS_API_KEY: &str = "GOOGLE_BOOKS_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub tmdb_api_key: Option<String>,
    pub discogs_token: Option<String>,
    pub google_books_api_key: Option<String>,
}

impl Credentials {
    /// Loads `env_file` into the process environment if it exists, then reads
    /// the credential variables. Variables already set are not overridden.
    pub fn from_env(env_file: &Path) -> Self {
        if env_file.is_file() {
            match dotenvy::from_path(env_file) {
                Ok(()) => debug!("Loaded environment from {:?}", env_file),
                Err(e) => debug!("Ignoring {:?}: {}", env_file, e),
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            tmdb_api_key: read(TMDB_API_KEY),
            discogs_token: read(DISCOGS_USER_TOKEN),
            google_books_api_key: read(GOOGLE_BOOKS_API_KEY),
        }
    }

    /// Checks that the mandatory credential for `domain` is present.
    pub fn require(&self, domain: Domain) -> EnrichResult<()> {
        let missing = match domain {
            Domain::Book => None,
            Domain::Movie => self.tmdb_api_key.is_none().then_some(TMDB_API_KEY),
            Domain::Album => self.discogs_token.is_none().then_some(DISCOGS_USER_TOKEN),
        };
        match missing {
            Some(name) => Err(EnrichError::MissingCredential { name }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> Credentials {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Credentials::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let creds = lookup(&[(TMDB_API_KEY, "  "), (DISCOGS_USER_TOKEN, "tok")]);
        assert_eq!(creds.tmdb_api_key, None);
        assert_eq!(creds.discogs_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_require_per_domain() {
        let creds = lookup(&[(DISCOGS_USER_TOKEN, "tok")]);
        assert!(creds.require(Domain::Book).is_ok());
        assert!(creds.require(Domain::Album).is_ok());
        assert!(matches!(
            creds.require(Domain::Movie),
            Err(EnrichError::MissingCredential { name: TMDB_API_KEY })
        ));
    }
}
