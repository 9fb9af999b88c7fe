//! Document patching: locate a record's block, upsert into it, and write the
//! whole file back with everything outside the block untouched.

pub mod locator;
pub mod scanner;
pub mod upsert;

pub use upsert::{upsert_fields, Upserted};

use crate::domain::DomainSpec;
use crate::error::{EnrichError, EnrichResult};
use crate::provider::MetadataResult;
use std::fs;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentLayout {
    /// One `+++` block per file, followed by a free-form body.
    Frontmatter,
    /// Repeated `[[collection]]` blocks tagged by `category`.
    Collection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// No block carries the record's title any more.
    BlockMissing,
    Unchanged,
    /// Keys inserted, rewritten or removed in the block.
    Updated { changed: Vec<&'static str> },
}

/// Span of the block for `title`, or `None` if it has gone away.
pub fn locate_block(
    text: &str,
    layout: DocumentLayout,
    spec: &DomainSpec,
    title: &str,
    path: &Path,
) -> EnrichResult<Option<Range<usize>>> {
    match layout {
        DocumentLayout::Frontmatter => {
            let span = locator::locate_frontmatter(text)
                .ok_or_else(|| EnrichError::malformed(path, "frontmatter markers not found"))?;
            Ok(locator::block_has_title(&text[span.clone()], title).then_some(span))
        }
        DocumentLayout::Collection => {
            if locator::segment_collection(text).is_empty() {
                return Err(EnrichError::malformed(path, "no collection blocks"));
            }
            Ok(locator::locate_collection_block(text, spec, title))
        }
    }
}

/// Returns the patched document text with the keys that changed, or `None`
/// when the block is missing.
pub fn patch_text(
    text: &str,
    layout: DocumentLayout,
    spec: &DomainSpec,
    title: &str,
    result: &MetadataResult,
    path: &Path,
) -> EnrichResult<Option<Upserted>> {
    let Some(span) = locate_block(text, layout, spec, title, path)? else {
        return Ok(None);
    };

    let block = upsert_fields(&text[span.clone()], spec, result)?;

    let mut out = String::with_capacity(text.len() + block.text.len());
    out.push_str(&text[..span.start]);
    out.push_str(&block.text);
    out.push_str(&text[span.end..]);
    Ok(Some(Upserted {
        text: out,
        changed: block.changed,
    }))
}

/// Reads the whole file, patches the record's block and writes it back.
///
/// Nothing else may write the same file during a run.
pub fn patch_file(
    path: &Path,
    layout: DocumentLayout,
    spec: &DomainSpec,
    title: &str,
    result: &MetadataResult,
    dry_run: bool,
) -> EnrichResult<PatchOutcome> {
    let text = fs::read_to_string(path)?;

    let Some(patched) = patch_text(&text, layout, spec, title, result, path)? else {
        debug!("No block for '{}' in {:?}", title, path);
        return Ok(PatchOutcome::BlockMissing);
    };

    if patched.changed.is_empty() {
        return Ok(PatchOutcome::Unchanged);
    }

    if !dry_run {
        fs::write(path, &patched.text)?;
    }
    Ok(PatchOutcome::Updated {
        changed: patched.changed,
    })
}
