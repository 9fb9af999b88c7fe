//! Discogs release search and release details.
//!
//! Requests are authenticated with a personal user token.

use super::http::JsonClient;
use super::matching::first_of;
use super::{Candidate, CatalogProvider, MetadataResult, SearchQuery};
use crate::error::EnrichResult;
use serde::Deserialize;
use std::time::Duration;

const DISCOGS_API_BASE: &str = "https://api.discogs.com";
const DISCOGS_SITE: &str = "https://www.discogs.com";
const PROVIDER: &str = "discogs";

pub struct DiscogsProvider {
    client: JsonClient,
    auth_header: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ReleaseResult>,
}

#[derive(Debug, Deserialize)]
struct ReleaseResult {
    id: u64,
    #[serde(default)]
    title: String,
    year: Option<String>,
    cover_image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDetails {
    id: u64,
    #[serde(default)]
    year: u32,
    #[serde(default)]
    artists: Vec<Artist>,
    #[serde(default)]
    labels: Vec<Label>,
    uri: Option<String>,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Label {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    name: String,
    resource_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Image {
    #[serde(rename = "type")]
    kind: Option<String>,
    uri: Option<String>,
    resource_url: Option<String>,
}

impl Image {
    fn url(&self) -> Option<String> {
        self.resource_url
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| self.uri.clone().filter(|u| !u.is_empty()))
    }
}

impl Label {
    /// Site URL of the label, from its id or its API resource URL.
    fn site_url(&self) -> Option<String> {
        if self.id > 0 {
            return Some(format!("{}/label/{}", DISCOGS_SITE, self.id));
        }
        let resource = self.resource_url.as_deref()?;
        let (_, id) = resource.split_once("/labels/")?;
        let id = id.trim_end_matches('/');
        (!id.is_empty()).then(|| format!("{}/label/{}", DISCOGS_SITE, id))
    }
}

impl DiscogsProvider {
    pub fn new(user_agent: &str, timeout: Duration, token: &str) -> EnrichResult<Self> {
        Ok(Self {
            client: JsonClient::new(PROVIDER, user_agent, timeout)?,
            auth_header: format!("Discogs token={}", token),
        })
    }

    fn headers(&self) -> [(&str, &str); 1] {
        [("Authorization", self.auth_header.as_str())]
    }
}

/// Free-text query, prefixed with the artist when it is already known.
fn search_terms(query: &SearchQuery) -> String {
    match query.artist.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        Some(artist) => format!("{} {}", artist, query.title),
        None => query.title.clone(),
    }
}

impl CatalogProvider for DiscogsProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn search(&self, query: &SearchQuery) -> EnrichResult<Vec<Candidate>> {
        let url = format!(
            "{}/database/search?q={}&type=release&per_page=25",
            DISCOGS_API_BASE,
            urlencoding::encode(&search_terms(query))
        );
        let response: SearchResponse = self.client.get_json(&url, &self.headers())?;
        Ok(response.results.into_iter().map(release_to_candidate).collect())
    }

    fn fetch_details(&self, candidate: &Candidate) -> EnrichResult<MetadataResult> {
        let url = format!("{}/releases/{}", DISCOGS_API_BASE, candidate.id);
        let details: ReleaseDetails = self.client.get_json(&url, &self.headers())?;
        Ok(details_to_result(&details))
    }
}

fn release_to_candidate(release: ReleaseResult) -> Candidate {
    let mut partial = MetadataResult::from_source(PROVIDER);
    partial.set("year", release.year.filter(|y| y != "0"));
    partial.set("discogs", Some(format!("{}/release/{}", DISCOGS_SITE, release.id)));
    partial.artwork_url = release.cover_image.filter(|u| !u.is_empty());

    Candidate {
        id: release.id.to_string(),
        title: release.title,
        partial,
    }
}

fn details_to_result(details: &ReleaseDetails) -> MetadataResult {
    let mut result = MetadataResult::from_source(PROVIDER);

    let artists: Vec<&str> = details.artists.iter().map(|a| a.name.as_str()).collect();
    result.set("artist", first_of(&artists));
    result.set("year", (details.year > 0).then(|| details.year.to_string()));

    if let Some(label) = details.labels.first() {
        result.set("label", Some(label.name.as_str()));
        result.set("discogsLabel", label.site_url());
    }

    let link = details
        .uri
        .clone()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| format!("{}/release/{}", DISCOGS_SITE, details.id));
    result.set("discogs", Some(link));

    result.artwork_url = details
        .images
        .iter()
        .find(|img| img.kind.as_deref() == Some("primary"))
        .and_then(Image::url)
        .or_else(|| details.images.first().and_then(Image::url));

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_details_mapping() {
        let details: ReleaseDetails = serde_json::from_str(
            r#"{"id": 1405862, "title": "Blue", "year": 1971,
                "artists": [{"name": "Joni Mitchell"}],
                "labels": [{"id": 1234, "name": "Reprise Records",
                            "resource_url": "https://api.discogs.com/labels/1234"}],
                "uri": "https://www.discogs.com/release/1405862-Joni-Mitchell-Blue",
                "images": [
                    {"type": "secondary", "uri": "https://i/2.jpg", "resource_url": "https://r/2.jpg"},
                    {"type": "primary", "uri": "https://i/1.jpg", "resource_url": ""}
                ]}"#,
        )
        .unwrap();

        let result = details_to_result(&details);

        assert_eq!(result.get("artist"), Some("Joni Mitchell"));
        assert_eq!(result.get("year"), Some("1971"));
        assert_eq!(result.get("label"), Some("Reprise Records"));
        assert_eq!(result.get("discogsLabel"), Some("https://www.discogs.com/label/1234"));
        assert_eq!(
            result.get("discogs"),
            Some("https://www.discogs.com/release/1405862-Joni-Mitchell-Blue")
        );
        assert_eq!(result.artwork_url.as_deref(), Some("https://i/1.jpg"));
    }

    #[test]
    fn test_sparse_release_details() {
        let details: ReleaseDetails = serde_json::from_str(
            r#"{"id": 7, "year": 0,
                "labels": [{"id": 0, "name": "Self-released",
                            "resource_url": "https://api.discogs.com/labels/99/"}],
                "images": [{"type": "secondary", "uri": "https://i/2.jpg"}]}"#,
        )
        .unwrap();

        let result = details_to_result(&details);

        assert_eq!(result.get("artist"), None);
        assert_eq!(result.get("year"), None);
        assert_eq!(result.get("discogsLabel"), Some("https://www.discogs.com/label/99"));
        assert_eq!(result.get("discogs"), Some("https://www.discogs.com/release/7"));
        assert_eq!(result.artwork_url.as_deref(), Some("https://i/2.jpg"));
    }

    #[test]
    fn test_search_result_to_candidate() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"results": [{"id": 5, "title": "Joni Mitchell - Blue", "year": "1971",
                             "cover_image": "https://i/c.jpg"}]}"#,
        )
        .unwrap();
        let candidate = release_to_candidate(response.results.into_iter().next().unwrap());

        assert_eq!(candidate.id, "5");
        assert_eq!(candidate.title, "Joni Mitchell - Blue");
        assert_eq!(candidate.partial.get("year"), Some("1971"));
        assert_eq!(candidate.partial.get("discogs"), Some("https://www.discogs.com/release/5"));
        assert_eq!(candidate.partial.artwork_url.as_deref(), Some("https://i/c.jpg"));
    }

    #[test]
    fn test_search_terms_prefix_artist() {
        let mut query = SearchQuery::new("Blue");
        assert_eq!(search_terms(&query), "Blue");

        query.artist = Some("Joni Mitchell".to_string());
        assert_eq!(search_terms(&query), "Joni Mitchell Blue");
    }
}
