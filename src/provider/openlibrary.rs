//! OpenLibrary search and work lookup.

use super::http::JsonClient;
use super::matching::{first_of, leading_year};
use super::{Candidate, CatalogProvider, MetadataResult, SearchQuery};
use crate::error::EnrichResult;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

const OPENLIBRARY_API_BASE: &str = "https://openlibrary.org";
const COVERS_BASE: &str = "https://covers.openlibrary.org/b/id";
const PROVIDER: &str = "openlibrary";

pub struct OpenLibraryProvider {
    client: JsonClient,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    key: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author_name: Vec<String>,
    first_publish_year: Option<i32>,
    cover_i: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkDetails {
    #[serde(default)]
    authors: Vec<AuthorRef>,
    first_publish_date: Option<String>,
    publish_date: Option<String>,
    #[serde(default)]
    publish_dates: Vec<String>,
    #[serde(default)]
    publishers: Vec<String>,
}

/// Works nest the key under `author`, editions put it at the top level.
#[derive(Debug, Deserialize)]
struct AuthorRef {
    key: Option<String>,
    author: Option<KeyRef>,
}

#[derive(Debug, Deserialize)]
struct KeyRef {
    key: String,
}

#[derive(Debug, Deserialize)]
struct AuthorDetails {
    name: Option<String>,
}

impl AuthorRef {
    fn key(&self) -> Option<&str> {
        self.key
            .as_deref()
            .or_else(|| self.author.as_ref().map(|a| a.key.as_str()))
    }
}

impl WorkDetails {
    fn year(&self) -> Option<String> {
        self.first_publish_date
            .iter()
            .chain(self.publish_date.iter())
            .chain(self.publish_dates.iter())
            .find_map(|date| leading_year(date))
    }
}

impl OpenLibraryProvider {
    pub fn new(user_agent: &str, timeout: Duration) -> EnrichResult<Self> {
        Ok(Self {
            client: JsonClient::new(PROVIDER, user_agent, timeout)?,
        })
    }

    fn author_name(&self, key: &str) -> EnrichResult<Option<String>> {
        let url = format!("{}{}.json", OPENLIBRARY_API_BASE, key);
        let author: AuthorDetails = self.client.get_json(&url, &[])?;
        Ok(author.name)
    }
}

impl CatalogProvider for OpenLibraryProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn search(&self, query: &SearchQuery) -> EnrichResult<Vec<Candidate>> {
        let url = format!(
            "{}/search.json?title={}&limit=5",
            OPENLIBRARY_API_BASE,
            urlencoding::encode(&query.title)
        );
        let response: SearchResponse = self.client.get_json(&url, &[])?;
        Ok(response.docs.into_iter().map(doc_to_candidate).collect())
    }

    fn fetch_details(&self, candidate: &Candidate) -> EnrichResult<MetadataResult> {
        let url = format!("{}{}.json", OPENLIBRARY_API_BASE, candidate.id);
        let details: WorkDetails = self.client.get_json(&url, &[])?;

        let mut result = merge_details(&candidate.partial, &details);

        if result.get("author").is_none() {
            if let Some(key) = details.authors.iter().find_map(|a| a.key()) {
                match self.author_name(key) {
                    Ok(name) => result.set("author", name),
                    Err(e) => warn!("Could not resolve OpenLibrary author {}: {}", key, e),
                }
            }
        }

        Ok(result)
    }
}

fn doc_to_candidate(doc: SearchDoc) -> Candidate {
    let mut partial = MetadataResult::from_source(PROVIDER);
    partial.set("author", first_of(&doc.author_name));
    partial.set("year", doc.first_publish_year.map(|y| y.to_string()));
    partial.set("openlibrary", Some(format!("{}{}", OPENLIBRARY_API_BASE, doc.key)));
    partial.artwork_url = doc
        .cover_i
        .filter(|id| *id > 0)
        .map(|id| format!("{}/{}-L.jpg", COVERS_BASE, id));

    Candidate {
        id: doc.key,
        title: doc.title,
        partial,
    }
}

/// Search-level values win; details fill the gaps.
fn merge_details(partial: &MetadataResult, details: &WorkDetails) -> MetadataResult {
    let mut result = partial.clone();
    if result.get("year").is_none() {
        result.set("year", details.year());
    }
    result.set("publisher", first_of(&details.publishers));
    result
}
