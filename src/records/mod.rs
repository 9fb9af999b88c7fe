//! Record discovery and selection.
//!
//! Records are discovered fresh on every run from per-record pages and
//! collection files. A record is reselected while it is unprocessed or any of
//! its domain's required fields is still empty.

use crate::artwork::ArtworkStore;
use crate::document::locator::{locate_frontmatter, segment_collection};
use crate::document::scanner::{self, Entry, Value};
use crate::document::DocumentLayout;
use crate::domain::{Domain, CATEGORY, DRAFT, PROCESSED, TITLE};
use crate::provider::SearchQuery;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocation {
    pub path: PathBuf,
    pub layout: DocumentLayout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub domain: Domain,
    pub title: String,
    /// Every assignment in the block, first occurrence wins.
    pub fields: BTreeMap<String, String>,
    pub processed: bool,
    pub draft: bool,
    pub location: RecordLocation,
}

impl Record {
    /// Builds a record from a block, or `None` if the block has no title.
    pub fn from_block(domain: Domain, block: &str, location: RecordLocation) -> Option<Self> {
        let entries = scanner::scan(block);
        let title = scanner::find(&entries, TITLE)
            .map(|e| e.value.as_text().into_owned())
            .filter(|t| !t.trim().is_empty())?;

        let mut fields = BTreeMap::new();
        for entry in &entries {
            fields
                .entry(entry.key.clone())
                .or_insert_with(|| entry.value.as_text().into_owned());
        }

        Some(Self {
            domain,
            title,
            fields,
            processed: flag(&entries, PROCESSED),
            draft: flag(&entries, DRAFT),
            location,
        })
    }

    /// Non-empty value of `key`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        self.domain
            .spec()
            .required
            .iter()
            .copied()
            .filter(|key| self.field(key).is_none())
            .collect()
    }

    /// Unprocessed, or processed with required fields still empty.
    pub fn needs_processing(&self) -> bool {
        !self.processed || !self.missing_required().is_empty()
    }

    pub fn query(&self) -> SearchQuery {
        let known = |key: &str| self.field(key).map(str::to_string);
        SearchQuery {
            title: self.title.clone(),
            year: known("year"),
            artist: known("artist"),
            director: known("director"),
        }
    }
}

/// `true`, or the legacy `"true"` / `yes` spellings.
fn flag(entries: &[Entry], key: &str) -> bool {
    match scanner::find(entries, key).map(|e| &e.value) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Str(s)) | Some(Value::Raw(s)) => s == "true" || s == "yes",
        None => false,
    }
}

/// Where records of each domain are found.
#[derive(Debug, Clone)]
pub struct RecordSource {
    content_dir: PathBuf,
    collection_files: Vec<(Domain, PathBuf)>,
}

impl RecordSource {
    pub fn new(content_dir: impl Into<PathBuf>, collection_files: Vec<(Domain, PathBuf)>) -> Self {
        Self {
            content_dir: content_dir.into(),
            collection_files,
        }
    }

    pub fn pages_dir(&self, domain: Domain) -> PathBuf {
        self.content_dir
            .join("consumed")
            .join(domain.spec().content_subdir)
    }

    /// All records of `domain`, pages first (sorted by file name), then
    /// collection blocks in file order.
    pub fn discover(&self, domain: Domain) -> Vec<Record> {
        let mut records = self.discover_pages(domain);
        for (_, path) in self.collection_files.iter().filter(|(d, _)| *d == domain) {
            records.extend(discover_collection(domain, path));
        }
        records
    }

    fn discover_pages(&self, domain: Domain) -> Vec<Record> {
        let dir = self.pages_dir(domain);
        if !dir.is_dir() {
            debug!("No {} pages at {:?}", domain, dir);
            return Vec::new();
        }

        let page_category = domain.spec().page_category;
        let mut records = Vec::new();

        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read entry in {:?}: {}", dir, e);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "md") {
                continue;
            }

            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to read {:?}: {}", path, e);
                    continue;
                }
            };
            let Some(span) = locate_frontmatter(&text) else {
                warn!("Skipping {:?}: frontmatter markers not found", path);
                continue;
            };

            let block = &text[span];
            let entries = scanner::scan(block);
            let category = scanner::find(&entries, CATEGORY).map(|e| e.value.as_text().into_owned());
            if category.as_deref() != Some(page_category) {
                debug!("Skipping {:?}: category is not '{}'", path, page_category);
                continue;
            }

            let location = RecordLocation {
                path: path.to_path_buf(),
                layout: DocumentLayout::Frontmatter,
            };
            match Record::from_block(domain, block, location) {
                Some(record) => records.push(record),
                None => debug!("Skipping {:?}: no title", path),
            }
        }

        records
    }
}

fn discover_collection(domain: Domain, path: &Path) -> Vec<Record> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to read collection {:?}: {}", path, e);
            return Vec::new();
        }
    };

    let spec = domain.spec();
    segment_collection(&text)
        .into_iter()
        .filter_map(|span| {
            let block = &text[span];
            let entries = scanner::scan(block);
            let tagged = scanner::find(&entries, CATEGORY)
                .is_some_and(|e| spec.accepts_collection_tag(&e.value.as_text()));
            if !tagged {
                return None;
            }
            let location = RecordLocation {
                path: path.to_path_buf(),
                layout: DocumentLayout::Collection,
            };
            Record::from_block(domain, block, location)
        })
        .collect()
}

/// Why a discovered record is not worked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Draft,
    Complete,
    HasMetadata,
    FilteredOut,
}

impl SkipReason {
    pub fn describe(&self) -> &'static str {
        match self {
            SkipReason::Draft => "draft",
            SkipReason::Complete => "already processed",
            SkipReason::HasMetadata => "already has metadata",
            SkipReason::FilteredOut => "not selected",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub include_drafts: bool,
    pub skip_existing: bool,
    /// Case-insensitive substrings; empty selects everything.
    pub titles: Vec<String>,
}

impl RecordFilter {
    pub fn matches_title(&self, title: &str) -> bool {
        if self.titles.is_empty() {
            return true;
        }
        let title = title.to_lowercase();
        self.titles
            .iter()
            .any(|needle| title.contains(&needle.to_lowercase()))
    }

    /// `Ok(())` if the record should be enriched.
    pub fn select(&self, record: &Record, artwork: &ArtworkStore) -> Result<(), SkipReason> {
        if !self.matches_title(&record.title) {
            return Err(SkipReason::FilteredOut);
        }
        if record.draft && !self.include_drafts {
            return Err(SkipReason::Draft);
        }
        if !record.needs_processing() {
            return Err(SkipReason::Complete);
        }
        if self.skip_existing && has_existing_metadata(record, artwork) {
            return Err(SkipReason::HasMetadata);
        }
        Ok(())
    }
}

fn has_existing_metadata(record: &Record, artwork: &ArtworkStore) -> bool {
    let spec = record.domain.spec();
    let fields_present = spec.skip_existing.iter().all(|key| record.field(key).is_some());
    fields_present && (!spec.skip_existing_needs_artwork || artwork.exists(spec, &record.title))
}
