//! Enriches a static site's catalog of consumed media (books, movies, albums)
//! with metadata and artwork from public catalog services.

pub mod artwork;
pub mod config;
pub mod document;
pub mod domain;
pub mod enrich;
pub mod error;
pub mod provider;
pub mod records;

pub use domain::Domain;
pub use enrich::{EnrichOptions, Enricher, RunSummary};
pub use error::{EnrichError, EnrichResult};
