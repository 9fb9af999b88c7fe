//! Cover and poster artwork: deterministic local paths and downloads.

use crate::domain::DomainSpec;
use crate::error::{EnrichError, EnrichResult};
use crate::provider::http::status_error;
use crate::provider::RetryPolicy;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const FETCHER: &str = "artwork";

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s-]").expect("valid slug regex");
    static ref SEPARATORS: Regex = Regex::new(r"[-\s]+").expect("valid slug regex");
}

/// Lowercase, punctuation stripped, runs of spaces and hyphens collapsed to
/// one underscore, no leading or trailing underscores.
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    let stripped = NON_WORD.replace_all(&lower, "");
    let joined = SEPARATORS.replace_all(&stripped, "_");
    joined.trim_matches('_').to_string()
}

pub fn artwork_file_name(spec: &DomainSpec, title: &str) -> String {
    format!("{}{}", slugify(title), spec.artwork_suffix)
}

/// Where artwork lives on disk and how pages refer to it.
#[derive(Debug, Clone)]
pub struct ArtworkStore {
    static_dir: PathBuf,
}

impl ArtworkStore {
    pub fn new(static_dir: impl Into<PathBuf>) -> Self {
        Self {
            static_dir: static_dir.into(),
        }
    }

    pub fn local_path(&self, spec: &DomainSpec, title: &str) -> PathBuf {
        self.static_dir
            .join("images")
            .join(spec.image_dir)
            .join(artwork_file_name(spec, title))
    }

    /// Site-relative path written into the record's `img` field.
    pub fn site_path(&self, spec: &DomainSpec, title: &str) -> String {
        format!("/images/{}/{}", spec.image_dir, artwork_file_name(spec, title))
    }

    pub fn exists(&self, spec: &DomainSpec, title: &str) -> bool {
        self.local_path(spec, title).is_file()
    }
}

pub trait ArtworkFetcher {
    /// Downloads `url` into `dest`, creating parent directories.
    fn fetch(&self, url: &str, dest: &Path) -> EnrichResult<()>;
}

pub struct HttpArtworkFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpArtworkFetcher {
    pub fn new(user_agent: &str, timeout: Duration, retry: RetryPolicy) -> EnrichResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| EnrichError::NetworkFailure {
                provider: FETCHER,
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client, retry })
    }

    fn download(&self, url: &str) -> EnrichResult<Vec<u8>> {
        let network = |e: reqwest::Error| EnrichError::NetworkFailure {
            provider: FETCHER,
            message: e.without_url().to_string(),
        };

        let response = self.client.get(url).send().map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(status_error(FETCHER, status, &body));
        }
        Ok(response.bytes().map_err(network)?.to_vec())
    }
}

impl ArtworkFetcher for HttpArtworkFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> EnrichResult<()> {
        let bytes = self.retry.run("artwork download", |_| self.download(url))?;
        ensure_image(&bytes)?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest, &bytes)?;
        debug!("Stored {} bytes of artwork at {:?}", bytes.len(), dest);
        Ok(())
    }
}

/// Rejects payloads that are not recognizably an image.
pub fn ensure_image(bytes: &[u8]) -> EnrichResult<()> {
    match infer::get(bytes) {
        Some(kind) if kind.mime_type().starts_with("image/") => Ok(()),
        Some(kind) => Err(EnrichError::InvalidResponse {
            provider: FETCHER,
            message: format!("expected an image, got {}", kind.mime_type()),
        }),
        None => Err(EnrichError::InvalidResponse {
            provider: FETCHER,
            message: "unrecognized artwork payload".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use tempfile::TempDir;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Dune"), "dune");
        assert_eq!(slugify("Thinking, Fast and Slow"), "thinking_fast_and_slow");
        assert_eq!(slugify("  Spider-Man: No Way Home "), "spider_man_no_way_home");
        assert_eq!(slugify("--Hello -- World--"), "hello_world");
        assert_eq!(slugify("AC/DC's \"Back in Black\""), "acdcs_back_in_black");
        assert_eq!(slugify("Amélie"), "amélie");
    }

    #[test]
    fn test_file_names_use_domain_suffix() {
        assert_eq!(artwork_file_name(Domain::Book.spec(), "Dune"), "dune_cover.jpg");
        assert_eq!(artwork_file_name(Domain::Movie.spec(), "Heat"), "heat_poster.jpg");
        assert_eq!(artwork_file_name(Domain::Album.spec(), "Blue"), "blue_cover.jpg");
    }

    #[test]
    fn test_store_paths() {
        let store = ArtworkStore::new("/site/static");
        assert_eq!(
            store.local_path(Domain::Movie.spec(), "Heat"),
            PathBuf::from("/site/static/images/movies/heat_poster.jpg")
        );
        assert_eq!(
            store.site_path(Domain::Album.spec(), "Blue"),
            "/images/music/blue_cover.jpg"
        );
    }

    #[test]
    fn test_exists_checks_disk() {
        let dir = TempDir::new().unwrap();
        let store = ArtworkStore::new(dir.path());
        let spec = Domain::Movie.spec();
        assert!(!store.exists(spec, "Heat"));

        let path = store.local_path(spec, "Heat");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"x").unwrap();
        assert!(store.exists(spec, "Heat"));
    }

    #[test]
    fn test_ensure_image() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0];
        assert!(ensure_image(&png).is_ok());
        assert!(ensure_image(&jpeg).is_ok());
        assert!(ensure_image(b"<html>nope</html>").is_err());
        assert!(ensure_image(&[]).is_err());
    }
}
