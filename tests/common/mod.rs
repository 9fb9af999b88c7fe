//! Common test infrastructure
//!
//! A throwaway site layout on disk plus scripted providers and artwork
//! fetchers, so enrichment runs end to end without touching the network.

#![allow(dead_code)]

use consumed_enricher::artwork::{ArtworkFetcher, ArtworkStore};
use consumed_enricher::error::{EnrichError, EnrichResult};
use consumed_enricher::provider::{
    Candidate, CatalogProvider, MetadataResult, ProviderResolver, RetryPolicy, SearchQuery,
};
use consumed_enricher::records::{RecordFilter, RecordSource};
use consumed_enricher::{Domain, EnrichOptions, Enricher};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

/// Bytes that sniff as a PNG image.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

pub type CallLog = Rc<RefCell<Vec<String>>>;

pub struct TestSite {
    pub dir: TempDir,
}

impl TestSite {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        for sub in ["book", "movie", "music"] {
            fs::create_dir_all(dir.path().join("content/consumed").join(sub)).unwrap();
        }
        fs::create_dir_all(dir.path().join("data/books")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root().join("content")
    }

    pub fn static_dir(&self) -> PathBuf {
        self.root().join("static")
    }

    pub fn collection_path(&self) -> PathBuf {
        self.root().join("data/books/books.toml")
    }

    /// Writes `content/consumed/<subdir>/<name>` and returns its path.
    pub fn write_page(&self, domain: Domain, name: &str, text: &str) -> PathBuf {
        let path = self
            .content_dir()
            .join("consumed")
            .join(domain.spec().content_subdir)
            .join(name);
        fs::write(&path, text).unwrap();
        path
    }

    pub fn write_collection(&self, text: &str) -> PathBuf {
        let path = self.collection_path();
        fs::write(&path, text).unwrap();
        path
    }

    pub fn artwork(&self) -> ArtworkStore {
        ArtworkStore::new(self.static_dir())
    }

    pub fn source(&self) -> RecordSource {
        RecordSource::new(self.content_dir(), vec![(Domain::Book, self.collection_path())])
    }

    pub fn enricher(&self, fetcher: Option<Box<dyn ArtworkFetcher>>, options: EnrichOptions) -> Enricher {
        Enricher::new(self.source(), self.artwork(), fetcher, options)
    }

    pub fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }
}

pub fn options() -> EnrichOptions {
    EnrichOptions {
        dry_run: false,
        rate_limit: Duration::ZERO,
        filter: RecordFilter::default(),
    }
}

/// Provider answering from a fixed title -> metadata table.
pub struct ScriptedProvider {
    pub name: &'static str,
    pub hits: HashMap<String, MetadataResult>,
    pub log: CallLog,
}

impl ScriptedProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            hits: HashMap::new(),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn hit(mut self, title: &str, result: MetadataResult) -> Self {
        self.hits.insert(title.to_string(), result);
        self
    }

    pub fn into_resolver(self) -> ProviderResolver {
        ProviderResolver::new(vec![Box::new(self)], RetryPolicy::immediate(1))
    }
}

impl CatalogProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn search(&self, query: &SearchQuery) -> EnrichResult<Vec<Candidate>> {
        self.log.borrow_mut().push(query.title.clone());
        Ok(self
            .hits
            .get(&query.title)
            .map(|partial| Candidate {
                id: query.title.clone(),
                title: query.title.clone(),
                partial: partial.clone(),
            })
            .into_iter()
            .collect())
    }
}

/// Provider whose every search is rejected.
pub struct RejectingProvider;

impl CatalogProvider for RejectingProvider {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    fn search(&self, _query: &SearchQuery) -> EnrichResult<Vec<Candidate>> {
        Err(EnrichError::ProviderRejected {
            provider: "rejecting",
            status: 401,
            message: "invalid key".to_string(),
        })
    }
}

/// Artwork fetcher that writes a tiny PNG, or fails for listed URLs.
#[derive(Default)]
pub struct FakeFetcher {
    pub failing_urls: Vec<String>,
    pub fetched: CallLog,
}

impl FakeFetcher {
    pub fn failing(url: &str) -> Self {
        Self {
            failing_urls: vec![url.to_string()],
            ..Default::default()
        }
    }
}

impl ArtworkFetcher for FakeFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> EnrichResult<()> {
        self.fetched.borrow_mut().push(url.to_string());
        if self.failing_urls.iter().any(|u| u == url) {
            return Err(EnrichError::NetworkFailure {
                provider: "artwork",
                message: "connection reset".to_string(),
            });
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest, PNG_BYTES)?;
        Ok(())
    }
}
