//! Per-run counters, aggregated in record order.

use crate::domain::Domain;
use crate::error::EnrichError;
use crate::records::SkipReason;
use tracing::info;

/// What happened to a single record.
#[derive(Debug)]
pub enum RecordOutcome {
    /// Metadata resolved and applied (or computed, in a dry run).
    Enriched {
        /// Provider that answered.
        source: Option<&'static str>,
        /// Resolved fields the patch inserted or rewrote, in field-table order.
        populated: Vec<&'static str>,
        changed: bool,
    },
    NotFound {
        /// The record was marked as a draft.
        drafted: bool,
    },
    /// The record's block disappeared between discovery and patching.
    Vanished,
    Failed(EnrichError),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSummary {
    pub domain: Domain,
    pub enriched: u32,
    pub updated: u32,
    pub not_found: u32,
    pub failed: u32,
    pub skipped: u32,
    /// Not-found records that were marked as drafts.
    pub drafted: u32,
    /// Populated counts per field, in field-table order.
    pub fields: Vec<(&'static str, u32)>,
    /// Enriched records per answering provider, first seen first.
    pub sources: Vec<(&'static str, u32)>,
    /// Failed records per error kind, first seen first.
    pub failures: Vec<(&'static str, u32)>,
}

fn bump(counts: &mut Vec<(&'static str, u32)>, key: &'static str) {
    match counts.iter_mut().find(|(k, _)| *k == key) {
        Some((_, count)) => *count += 1,
        None => counts.push((key, 1)),
    }
}

fn count_of(counts: &[(&'static str, u32)], key: &str) -> u32 {
    counts
        .iter()
        .find(|(k, _)| *k == key)
        .map_or(0, |(_, count)| *count)
}

impl DomainSummary {
    pub fn new(domain: Domain) -> Self {
        let fields = domain.spec().fields.iter().map(|f| (f.key, 0)).collect();
        Self {
            domain,
            enriched: 0,
            updated: 0,
            not_found: 0,
            failed: 0,
            skipped: 0,
            drafted: 0,
            fields,
            sources: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Enriched {
                source,
                populated,
                changed,
            } => {
                self.enriched += 1;
                if *changed {
                    self.updated += 1;
                }
                if let Some(source) = source {
                    bump(&mut self.sources, *source);
                }
                for key in populated {
                    if let Some((_, count)) = self.fields.iter_mut().find(|(k, _)| k == key) {
                        *count += 1;
                    }
                }
            }
            RecordOutcome::NotFound { drafted } => {
                self.not_found += 1;
                if *drafted {
                    self.drafted += 1;
                }
            }
            RecordOutcome::Vanished => {
                self.failed += 1;
                bump(&mut self.failures, "vanished");
            }
            RecordOutcome::Failed(e) => {
                self.failed += 1;
                bump(&mut self.failures, e.kind());
            }
            RecordOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn populated(&self, key: &str) -> u32 {
        count_of(&self.fields, key)
    }

    pub fn from_source(&self, provider: &str) -> u32 {
        count_of(&self.sources, provider)
    }

    pub fn failures_of(&self, kind: &str) -> u32 {
        count_of(&self.failures, kind)
    }

    pub fn log(&self) {
        info!(
            "{}: {} enriched ({} updated), {} not found ({} drafted), {} failed, {} skipped",
            self.domain,
            self.enriched,
            self.updated,
            self.not_found,
            self.drafted,
            self.failed,
            self.skipped
        );
        for (provider, count) in &self.sources {
            info!("  via {}: {}", provider, count);
        }
        for (key, count) in &self.fields {
            info!("  {}: {} populated", key, count);
        }
        for (kind, count) in &self.failures {
            info!("  {}: {} failed", kind, count);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub domains: Vec<DomainSummary>,
}

impl RunSummary {
    pub fn record(&mut self, domain: Domain, outcome: &RecordOutcome) {
        self.domain_mut(domain).record(outcome);
    }

    /// Makes `domain` appear in the summary even if it had no records.
    pub fn touch(&mut self, domain: Domain) {
        self.domain_mut(domain);
    }

    pub fn domain(&self, domain: Domain) -> Option<&DomainSummary> {
        self.domains.iter().find(|d| d.domain == domain)
    }

    fn domain_mut(&mut self, domain: Domain) -> &mut DomainSummary {
        let idx = match self.domains.iter().position(|d| d.domain == domain) {
            Some(idx) => idx,
            None => {
                self.domains.push(DomainSummary::new(domain));
                self.domains.len() - 1
            }
        };
        &mut self.domains[idx]
    }

    pub fn total_failed(&self) -> u32 {
        self.domains.iter().map(|d| d.failed).sum()
    }

    pub fn log(&self) {
        info!("Summary:");
        for domain in &self.domains {
            domain.log();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_follow_outcomes() {
        let mut summary = RunSummary::default();
        summary.record(
            Domain::Movie,
            &RecordOutcome::Enriched {
                source: Some("tmdb"),
                populated: vec!["year", "director", "img"],
                changed: true,
            },
        );
        summary.record(
            Domain::Movie,
            &RecordOutcome::Enriched {
                source: Some("tmdb"),
                populated: vec!["director"],
                changed: false,
            },
        );
        summary.record(Domain::Movie, &RecordOutcome::NotFound { drafted: true });
        summary.record(Domain::Movie, &RecordOutcome::NotFound { drafted: false });
        summary.record(Domain::Movie, &RecordOutcome::Skipped(SkipReason::Draft));
        summary.record(Domain::Movie, &RecordOutcome::Vanished);

        let movies = summary.domain(Domain::Movie).unwrap();
        assert_eq!(movies.enriched, 2);
        assert_eq!(movies.updated, 1);
        assert_eq!(movies.not_found, 2);
        assert_eq!(movies.drafted, 1);
        assert_eq!(movies.skipped, 1);
        assert_eq!(movies.failed, 1);
        assert_eq!(movies.populated("director"), 2);
        assert_eq!(movies.populated("img"), 1);
        assert_eq!(movies.populated("trailer"), 0);
        assert_eq!(summary.total_failed(), 1);
        assert_eq!(movies.failures_of("vanished"), 1);
    }

    #[test]
    fn test_sources_and_failure_kinds_are_tallied() {
        let mut books = DomainSummary::new(Domain::Book);
        for source in [Some("openlibrary"), Some("google_books"), Some("openlibrary"), None] {
            books.record(&RecordOutcome::Enriched {
                source,
                populated: vec![],
                changed: false,
            });
        }
        books.record(&RecordOutcome::Failed(EnrichError::NetworkFailure {
            provider: "openlibrary",
            message: "timed out".to_string(),
        }));
        books.record(&RecordOutcome::Failed(EnrichError::malformed("book/x.md", "no markers")));
        books.record(&RecordOutcome::Failed(EnrichError::NetworkFailure {
            provider: "google_books",
            message: "connection reset".to_string(),
        }));

        assert_eq!(books.sources, vec![("openlibrary", 2), ("google_books", 1)]);
        assert_eq!(books.from_source("openlibrary"), 2);
        assert_eq!(books.from_source("tmdb"), 0);
        assert_eq!(books.failed, 3);
        assert_eq!(
            books.failures,
            vec![("network_failure", 2), ("malformed_document", 1)]
        );
        assert_eq!(books.failures_of("io_failure"), 0);
    }

    #[test]
    fn test_domains_keep_first_seen_order() {
        let mut summary = RunSummary::default();
        summary.touch(Domain::Album);
        summary.record(Domain::Book, &RecordOutcome::NotFound { drafted: false });
        summary.touch(Domain::Album);

        let order: Vec<Domain> = summary.domains.iter().map(|d| d.domain).collect();
        assert_eq!(order, vec![Domain::Album, Domain::Book]);
    }

    #[test]
    fn test_field_order_follows_table() {
        let keys: Vec<&str> = DomainSummary::new(Domain::Album)
            .fields
            .iter()
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(keys, vec!["artist", "year", "label", "discogs", "discogsLabel", "img"]);
    }
}
