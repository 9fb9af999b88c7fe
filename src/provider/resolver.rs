//! Fallback chain over a domain's providers.
//!
//! Providers are tried in order; the first one that returns at least one
//! candidate decides the result. Each request goes through the retry policy.

use super::discogs::DiscogsProvider;
use super::google_books::GoogleBooksProvider;
use super::matching::select_best_match;
use super::openlibrary::OpenLibraryProvider;
use super::tmdb::TmdbProvider;
use super::{CatalogProvider, MetadataResult, RetryPolicy, SearchQuery};
use crate::config::{AppConfig, Credentials};
use crate::domain::{Domain, DomainSpec};
use crate::error::{EnrichError, EnrichResult};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub struct ProviderResolver {
    providers: Vec<Box<dyn CatalogProvider>>,
    retry: RetryPolicy,
}

impl ProviderResolver {
    pub fn new(providers: Vec<Box<dyn CatalogProvider>>, retry: RetryPolicy) -> Self {
        Self { providers, retry }
    }

    /// The production chain for `domain`: Google Books then OpenLibrary for
    /// books, TMDB for movies, Discogs for albums.
    pub fn for_domain(domain: Domain, config: &AppConfig, credentials: &Credentials) -> EnrichResult<Self> {
        credentials.require(domain)?;

        let ua = config.user_agent.as_str();
        let timeout = config.request_timeout;
        let providers: Vec<Box<dyn CatalogProvider>> = match domain {
            Domain::Book => vec![
                Box::new(GoogleBooksProvider::new(
                    ua,
                    timeout,
                    credentials.google_books_api_key.clone(),
                )?),
                Box::new(OpenLibraryProvider::new(ua, timeout)?),
            ],
            Domain::Movie => {
                let key = credentials.tmdb_api_key.clone().unwrap_or_default();
                vec![Box::new(TmdbProvider::new(ua, timeout, key)?)]
            }
            Domain::Album => {
                let token = credentials.discogs_token.as_deref().unwrap_or_default();
                vec![Box::new(DiscogsProvider::new(ua, timeout, token)?)]
            }
        };

        Ok(Self::new(providers, RetryPolicy::new(&config.retry)))
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolves `query` into metadata, or fails with the reason the last
    /// provider gave up. `NoMatchFound` when every provider came back empty.
    pub fn resolve(&self, query: &SearchQuery) -> EnrichResult<MetadataResult> {
        let mut last_error: Option<EnrichError> = None;

        for provider in &self.providers {
            let name = provider.name();

            let candidates = match self
                .retry
                .run(&format!("{} search", name), |_| provider.search(query))
            {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!("{} search for '{}' failed: {}", name, query.title, e);
                    last_error = Some(e);
                    continue;
                }
            };

            let Some(best) = select_best_match(&query.title, &candidates) else {
                debug!("{} has no candidates for '{}'", name, query.title);
                continue;
            };
            info!("{} matched '{}' -> '{}'", name, query.title, best.title);

            let mut result = match self
                .retry
                .run(&format!("{} details", name), |_| provider.fetch_details(best))
            {
                Ok(details) => details,
                Err(e) => {
                    warn!(
                        "{} details for '{}' failed, using search data: {}",
                        name, best.title, e
                    );
                    best.partial.clone()
                }
            };
            result.merge_missing(&best.partial);
            result.source = Some(name);

            return Ok(result);
        }

        Err(last_error.unwrap_or_else(|| EnrichError::NoMatchFound {
            title: query.title.clone(),
        }))
    }
}

/// Overwrites preserved fields with the values the record already has.
pub fn keep_known_fields(result: &mut MetadataResult, spec: &DomainSpec, known: &BTreeMap<String, String>) {
    for (key, value) in known {
        if spec.is_preserved(key) && !value.trim().is_empty() {
            result.values.insert(key.clone(), value.clone());
        }
    }
}
