//! TMDB movie search and details (credits and videos appended).

use super::http::JsonClient;
use super::matching::{crew_member_with_role, leading_year};
use super::{Candidate, CatalogProvider, MetadataResult, SearchQuery};
use crate::error::EnrichResult;
use serde::Deserialize;
use std::time::Duration;

const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
const PROVIDER: &str = "tmdb";

pub struct TmdbProvider {
    client: JsonClient,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<MovieResult>,
}

#[derive(Debug, Deserialize)]
struct MovieResult {
    id: u64,
    #[serde(default)]
    title: String,
    release_date: Option<String>,
    poster_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MovieDetails {
    #[serde(default)]
    credits: Credits,
    #[serde(default)]
    videos: Videos,
}

#[derive(Debug, Default, Deserialize)]
struct Credits {
    #[serde(default)]
    crew: Vec<CrewMember>,
}

#[derive(Debug, Deserialize)]
struct CrewMember {
    job: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Videos {
    #[serde(default)]
    results: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    key: Option<String>,
    site: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl TmdbProvider {
    pub fn new(user_agent: &str, timeout: Duration, api_key: String) -> EnrichResult<Self> {
        Ok(Self {
            client: JsonClient::new(PROVIDER, user_agent, timeout)?,
            api_key,
        })
    }

    fn search_url(&self, query: &SearchQuery) -> String {
        let mut url = format!(
            "{}/search/movie?api_key={}&query={}&language=en-US",
            TMDB_API_BASE,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&query.title)
        );
        if let Some(year) = query.year.as_deref().filter(|y| !y.is_empty()) {
            url.push_str(&format!("&year={}", urlencoding::encode(year)));
        }
        url
    }
}

impl CatalogProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn search(&self, query: &SearchQuery) -> EnrichResult<Vec<Candidate>> {
        let response: SearchResponse = self.client.get_json(&self.search_url(query), &[])?;
        Ok(response.results.into_iter().map(movie_to_candidate).collect())
    }

    fn fetch_details(&self, candidate: &Candidate) -> EnrichResult<MetadataResult> {
        let url = format!(
            "{}/movie/{}?api_key={}&append_to_response=credits,videos",
            TMDB_API_BASE,
            candidate.id,
            urlencoding::encode(&self.api_key)
        );
        let details: MovieDetails = self.client.get_json(&url, &[])?;
        Ok(merge_details(&candidate.partial, &details))
    }
}

fn movie_to_candidate(movie: MovieResult) -> Candidate {
    let mut partial = MetadataResult::from_source(PROVIDER);
    partial.set("year", movie.release_date.as_deref().and_then(leading_year));
    partial.set("tmdb", Some(format!("https://www.themoviedb.org/movie/{}", movie.id)));
    partial.artwork_url = movie
        .poster_path
        .filter(|p| !p.is_empty())
        .map(|p| format!("{}{}", TMDB_IMAGE_BASE, p));

    Candidate {
        id: movie.id.to_string(),
        title: movie.title,
        partial,
    }
}

fn merge_details(partial: &MetadataResult, details: &MovieDetails) -> MetadataResult {
    let mut result = partial.clone();
    result.set(
        "director",
        crew_member_with_role(
            &details.credits.crew,
            "Director",
            |m| m.job.as_deref(),
            |m| m.name.as_deref(),
        ),
    );
    result.set("trailer", trailer_url(&details.videos));
    result
}

/// First YouTube video typed as a trailer.
fn trailer_url(videos: &Videos) -> Option<String> {
    videos
        .results
        .iter()
        .find(|v| v.site.as_deref() == Some("YouTube") && v.kind.as_deref() == Some("Trailer"))
        .and_then(|v| v.key.as_deref())
        .filter(|k| !k.is_empty())
        .map(|k| format!("https://www.youtube.com/watch?v={}", k))
}
