//! External catalog providers and the resolution pipeline built on them.

pub mod discogs;
pub mod google_books;
pub mod http;
pub mod matching;
pub mod openlibrary;
pub mod resolver;
pub mod retry;
pub mod tmdb;

pub use resolver::ProviderResolver;
pub use retry::RetryPolicy;

use crate::error::EnrichResult;
use std::collections::BTreeMap;

/// What a provider is asked to find.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub title: String,
    pub year: Option<String>,
    pub artist: Option<String>,
    pub director: Option<String>,
}

impl SearchQuery {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Whether the upsert engine should touch the `draft` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DraftDirective {
    #[default]
    Leave,
    Set,
    /// Remove the `draft` line entirely.
    Clear,
}

/// Sparse bag of resolved field values plus artwork artifacts.
///
/// An empty value means "leave the document unchanged for this field".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataResult {
    pub values: BTreeMap<String, String>,
    pub artwork_url: Option<String>,
    /// Site-relative path written to `img` once artwork is stored.
    pub artwork_path: Option<String>,
    pub draft: DraftDirective,
    pub source: Option<&'static str>,
}

impl MetadataResult {
    pub fn from_source(source: &'static str) -> Self {
        Self {
            source: Some(source),
            ..Default::default()
        }
    }

    /// Sets `key` unless `value` is empty or absent.
    pub fn set(&mut self, key: &str, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            let value = value.into();
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                self.values.insert(key.to_string(), trimmed.to_string());
            }
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, Some(value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Fills fields missing here from `fallback`, keeping existing values.
    pub fn merge_missing(&mut self, fallback: &MetadataResult) {
        for (key, value) in &fallback.values {
            if self.get(key).is_none() && !value.is_empty() {
                self.values.insert(key.clone(), value.clone());
            }
        }
        if self.artwork_url.is_none() {
            self.artwork_url = fallback.artwork_url.clone();
        }
    }
}

/// A search hit, carrying whatever the search response already revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    pub partial: MetadataResult,
}

/// A keyed catalog with a search endpoint and a details endpoint.
pub trait CatalogProvider {
    fn name(&self) -> &'static str;

    fn search(&self, query: &SearchQuery) -> EnrichResult<Vec<Candidate>>;

    /// Full record for a candidate. Providers without a details endpoint
    /// return the search-level data.
    fn fetch_details(&self, candidate: &Candidate) -> EnrichResult<MetadataResult> {
        Ok(candidate.partial.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_ignores_empty_values() {
        let mut result = MetadataResult::default();
        result.set("author", Some("  "));
        result.set("year", None::<String>);
        result.set("publisher", Some(" Ace "));

        assert_eq!(result.get("author"), None);
        assert_eq!(result.get("year"), None);
        assert_eq!(result.get("publisher"), Some("Ace"));
    }

    #[test]
    fn test_merge_missing_keeps_existing() {
        let mut details = MetadataResult::from_source("tmdb").with("director", "Villeneuve");
        let partial = MetadataResult::from_source("tmdb")
            .with("director", "Someone Else")
            .with("year", "2021");

        details.merge_missing(&partial);

        assert_eq!(details.get("director"), Some("Villeneuve"));
        assert_eq!(details.get("year"), Some("2021"));
    }
}
