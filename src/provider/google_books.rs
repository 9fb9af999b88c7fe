//! Google Books volume search.
//!
//! The search response already carries everything we use, so there is no
//! separate details request.

use super::http::JsonClient;
use super::matching::{first_of, leading_year};
use super::{Candidate, CatalogProvider, MetadataResult, SearchQuery};
use crate::error::EnrichResult;
use serde::Deserialize;
use std::time::Duration;

const GOOGLE_BOOKS_API_BASE: &str = "https://www.googleapis.com/books/v1";
const PROVIDER: &str = "google_books";

pub struct GoogleBooksProvider {
    client: JsonClient,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    id: String,
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    published_date: Option<String>,
    publisher: Option<String>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
    image_links: Option<ImageLinks>,
    info_link: Option<String>,
    preview_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
    small: Option<String>,
}

impl GoogleBooksProvider {
    pub fn new(user_agent: &str, timeout: Duration, api_key: Option<String>) -> EnrichResult<Self> {
        Ok(Self {
            client: JsonClient::new(PROVIDER, user_agent, timeout)?,
            api_key,
        })
    }

    fn search_url(&self, query: &SearchQuery) -> String {
        let mut url = format!(
            "{}/volumes?q={}&maxResults=5",
            GOOGLE_BOOKS_API_BASE,
            urlencoding::encode(&query.title)
        );
        if let Some(key) = &self.api_key {
            url.push_str(&format!("&key={}", urlencoding::encode(key)));
        }
        url
    }
}

impl CatalogProvider for GoogleBooksProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn search(&self, query: &SearchQuery) -> EnrichResult<Vec<Candidate>> {
        let response: VolumesResponse = self.client.get_json(&self.search_url(query), &[])?;
        Ok(response.items.into_iter().map(volume_to_candidate).collect())
    }
}

fn volume_to_candidate(volume: Volume) -> Candidate {
    let info = volume.volume_info;

    let mut partial = MetadataResult::from_source(PROVIDER);
    partial.set("author", first_of(&info.authors));
    partial.set("year", info.published_date.as_deref().and_then(leading_year));
    partial.set("publisher", info.publisher.clone());
    partial.set("openlibrary", catalog_link(&info));
    partial.artwork_url = cover_url(&info);

    Candidate {
        id: volume.id,
        title: info.title,
        partial,
    }
}

/// OpenLibrary ISBN page when an ISBN is known, else the Google Books pages.
fn catalog_link(info: &VolumeInfo) -> Option<String> {
    info.industry_identifiers
        .iter()
        .find(|id| id.kind == "ISBN_13" || id.kind == "ISBN_10")
        .map(|id| format!("https://openlibrary.org/isbn/{}", id.identifier))
        .or_else(|| info.info_link.clone().filter(|l| !l.is_empty()))
        .or_else(|| info.preview_link.clone().filter(|l| !l.is_empty()))
}

fn cover_url(info: &VolumeInfo) -> Option<String> {
    let links = info.image_links.as_ref()?;
    let raw = links
        .thumbnail
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| links.small.as_deref().filter(|s| !s.is_empty()))?;

    Some(raw.replace("http://", "https://").replace("&edge=curl", ""))
}
