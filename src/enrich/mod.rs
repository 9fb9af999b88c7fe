//! The enrichment run loop.
//!
//! Records are handled strictly one at a time: resolve, fetch artwork, patch
//! the backing document. A fixed pause follows every attempted resolution,
//! whether it succeeded or not. Failures never abort the run.

pub mod summary;

pub use summary::{DomainSummary, RecordOutcome, RunSummary};

use crate::artwork::{ArtworkFetcher, ArtworkStore};
use crate::document::{self, PatchOutcome};
use crate::domain::{Domain, DomainSpec, IMG};
use crate::error::EnrichError;
use crate::provider::resolver::keep_known_fields;
use crate::provider::{DraftDirective, MetadataResult, ProviderResolver};
use crate::records::{Record, RecordFilter, RecordSource};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default)]
pub struct EnrichOptions {
    /// Resolve and report, but leave documents and artwork untouched.
    pub dry_run: bool,
    pub rate_limit: Duration,
    pub filter: RecordFilter,
}

/// Sleeps a fixed interval between resolutions and counts the pauses.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    pauses: u32,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, pauses: 0 }
    }

    pub fn pause(&mut self) {
        self.pauses += 1;
        if !self.interval.is_zero() {
            thread::sleep(self.interval);
        }
    }

    pub fn pauses(&self) -> u32 {
        self.pauses
    }
}

pub struct Enricher {
    source: RecordSource,
    artwork: ArtworkStore,
    /// `None` disables artwork entirely: no downloads, no draft changes.
    fetcher: Option<Box<dyn ArtworkFetcher>>,
    resolvers: Vec<(Domain, ProviderResolver)>,
    options: EnrichOptions,
    pacer: Pacer,
}

impl Enricher {
    pub fn new(
        source: RecordSource,
        artwork: ArtworkStore,
        fetcher: Option<Box<dyn ArtworkFetcher>>,
        options: EnrichOptions,
    ) -> Self {
        let pacer = Pacer::new(options.rate_limit);
        Self {
            source,
            artwork,
            fetcher,
            resolvers: Vec::new(),
            options,
            pacer,
        }
    }

    /// Registers the provider chain for a domain. Domains are run in
    /// registration order.
    pub fn with_resolver(mut self, domain: Domain, resolver: ProviderResolver) -> Self {
        self.resolvers.push((domain, resolver));
        self
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn run(&mut self) -> RunSummary {
        let mut summary = RunSummary::default();

        for idx in 0..self.resolvers.len() {
            let domain = self.resolvers[idx].0;
            summary.touch(domain);

            let records = self.source.discover(domain);
            info!("Found {} {} record(s)", records.len(), domain);

            for record in &records {
                let outcome = match self.options.filter.select(record, &self.artwork) {
                    Ok(()) => self.process(idx, record),
                    Err(reason) => {
                        info!("Skipping {} ({})", record.title, reason.describe());
                        RecordOutcome::Skipped(reason)
                    }
                };
                summary.record(domain, &outcome);
            }
        }

        summary.log();
        summary
    }

    fn process(&mut self, resolver_idx: usize, record: &Record) -> RecordOutcome {
        let spec = record.domain.spec();
        let missing = record.missing_required();
        if missing.is_empty() {
            info!("Processing: {}", record.title);
        } else {
            info!("Processing: {} (missing: {})", record.title, missing.join(", "));
        }

        let resolved = self.resolvers[resolver_idx].1.resolve(&record.query());
        self.pacer.pause();

        let mut result = match resolved {
            Ok(result) => result,
            Err(e) => return self.handle_unresolved(record, e),
        };

        keep_known_fields(&mut result, spec, &record.fields);
        self.attach_artwork(record, &mut result);

        match self.patch(record, &result) {
            Ok(PatchOutcome::Updated { changed }) => {
                let populated = populated_fields(spec, &changed);
                for key in &populated {
                    let value = if *key == IMG {
                        result.artwork_path.as_deref().or_else(|| result.get(IMG))
                    } else {
                        result.get(key)
                    };
                    if let Some(value) = value {
                        info!("  {}: {}", key, value);
                    }
                }
                info!("  Updated {:?}", record.location.path);
                RecordOutcome::Enriched {
                    source: result.source,
                    populated,
                    changed: true,
                }
            }
            Ok(PatchOutcome::Unchanged) => RecordOutcome::Enriched {
                source: result.source,
                populated: Vec::new(),
                changed: false,
            },
            Ok(PatchOutcome::BlockMissing) => {
                warn!("  {} no longer present in {:?}", record.title, record.location.path);
                RecordOutcome::Vanished
            }
            Err(e) => {
                error!("  Failed to update {:?} [{}]: {}", record.location.path, e.kind(), e);
                RecordOutcome::Failed(e)
            }
        }
    }

    /// Domains that track drafts mark unresolvable records as drafts.
    fn handle_unresolved(&self, record: &Record, err: EnrichError) -> RecordOutcome {
        let spec = record.domain.spec();
        let not_found = matches!(err, EnrichError::NoMatchFound { .. });
        if not_found {
            info!("  Not found: {}", record.title);
        } else {
            warn!("  Resolution failed for {} [{}]: {}", record.title, err.kind(), err);
        }

        if !spec.tracks_draft() {
            return if not_found {
                RecordOutcome::NotFound { drafted: false }
            } else {
                RecordOutcome::Failed(err)
            };
        }

        let draft = MetadataResult {
            draft: DraftDirective::Set,
            ..Default::default()
        };
        match self.patch(record, &draft) {
            Ok(_) => {
                info!("  Marked {} as draft", record.title);
                if not_found {
                    RecordOutcome::NotFound { drafted: true }
                } else {
                    RecordOutcome::Failed(err)
                }
            }
            Err(e) => {
                error!("  Failed to mark {} as draft [{}]: {}", record.title, e.kind(), e);
                RecordOutcome::Failed(e)
            }
        }
    }

    /// Stores artwork locally and decides the draft directive.
    fn attach_artwork(&self, record: &Record, result: &mut MetadataResult) {
        let Some(fetcher) = self.fetcher.as_ref() else {
            return;
        };
        let spec = record.domain.spec();

        if self.artwork.exists(spec, &record.title) {
            result.artwork_path = Some(self.artwork.site_path(spec, &record.title));
            result.draft = DraftDirective::Clear;
            return;
        }

        let Some(url) = result.artwork_url.clone() else {
            warn!("  No artwork available for {}", record.title);
            result.draft = DraftDirective::Set;
            return;
        };

        if self.options.dry_run {
            info!("  Would download artwork from {}", url);
            return;
        }

        let dest = self.artwork.local_path(spec, &record.title);
        match fetcher.fetch(&url, &dest) {
            Ok(()) => {
                info!("  Downloaded artwork to {:?}", dest);
                result.artwork_path = Some(self.artwork.site_path(spec, &record.title));
                result.draft = DraftDirective::Clear;
            }
            Err(e) => {
                warn!("  Failed to download artwork for {}: {}", record.title, e);
                result.draft = DraftDirective::Set;
            }
        }
    }

    fn patch(&self, record: &Record, result: &MetadataResult) -> Result<PatchOutcome, EnrichError> {
        document::patch_file(
            &record.location.path,
            record.location.layout,
            record.domain.spec(),
            &record.title,
            result,
            self.options.dry_run,
        )
    }
}

/// Resolved fields among the keys a patch changed, in field-table order.
fn populated_fields(spec: &DomainSpec, changed: &[&'static str]) -> Vec<&'static str> {
    spec.fields
        .iter()
        .map(|f| f.key)
        .filter(|key| changed.contains(key))
        .collect()
}
