//! Field upsert engine.
//!
//! Merges a [`MetadataResult`] into a block in place. Existing keys get their
//! value token replaced, missing keys are inserted after the first anchor that
//! carries a value, and `processed = true` is forced last. Applying the same
//! result twice leaves the block unchanged.

use super::scanner::{self, Entry, Value};
use crate::domain::{DomainSpec, DRAFT, IMG, PROCESSED, TITLE};
use crate::error::{EnrichError, EnrichResult};
use crate::provider::{DraftDirective, MetadataResult};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
enum Incoming<'a> {
    Text(&'a str),
    True,
}

impl Incoming<'_> {
    fn matches(&self, existing: &Value) -> bool {
        match self {
            Incoming::Text(text) => existing.as_text() == *text,
            Incoming::True => existing.is_true(),
        }
    }

    fn render(&self) -> String {
        match self {
            Incoming::Text(text) => scanner::quote(text),
            Incoming::True => "true".to_string(),
        }
    }
}

/// A patched block and the keys the patch inserted, rewrote or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub text: String,
    /// In application order.
    pub changed: Vec<&'static str>,
}

/// Applies `result` to `block` following the field table of `spec`.
pub fn upsert_fields(block: &str, spec: &DomainSpec, result: &MetadataResult) -> EnrichResult<Upserted> {
    let mut text = block.to_string();
    let mut changed = Vec::new();

    if scanner::find(&scanner::scan(&text), TITLE).is_none() {
        return Err(EnrichError::MissingRequiredField {
            field: TITLE.to_string(),
        });
    }

    for field in spec.fields {
        let incoming = if field.key == IMG {
            result.artwork_path.as_deref().or_else(|| result.get(IMG))
        } else {
            result.get(field.key)
        };

        if let Some(value) = incoming.filter(|v| !v.is_empty()) {
            if put(&mut text, field.key, Incoming::Text(value), field.anchors) {
                changed.push(field.key);
            }
        }
    }

    if let Some(anchors) = spec.draft_anchors {
        let touched = match result.draft {
            DraftDirective::Set => put(&mut text, DRAFT, Incoming::True, anchors),
            DraftDirective::Clear => remove(&mut text, DRAFT),
            DraftDirective::Leave => false,
        };
        if touched {
            changed.push(DRAFT);
        }
    }

    if put(&mut text, PROCESSED, Incoming::True, spec.processed_anchors) {
        changed.push(PROCESSED);
    }

    Ok(Upserted { text, changed })
}

/// Writes `key`, returning whether the block changed.
fn put(text: &mut String, key: &str, incoming: Incoming<'_>, anchors: &[&str]) -> bool {
    let entries = scanner::scan(text);

    if let Some(entry) = scanner::find(&entries, key) {
        if incoming.matches(&entry.value) {
            return false;
        }
        debug!("Updating '{}' in place", key);
        text.replace_range(entry.value_span(), &incoming.render());
        return true;
    }

    let (at, newline) = insertion_point(text, &entries, anchors);
    debug!("Inserting '{}' at byte {}", key, at);
    text.insert_str(at, &format!("{}{} = {}", newline, key, incoming.render()));
    true
}

/// Where a new line goes and the line break that introduces it: the end of
/// the first anchor line with a non-empty value, else the end of the block's
/// content before its trailing newlines.
fn insertion_point(text: &str, entries: &[Entry], anchors: &[&str]) -> (usize, &'static str) {
    let anchor = anchors.iter().find_map(|anchor| {
        scanner::find(entries, anchor).filter(|e| !e.value.is_empty())
    });

    match anchor {
        Some(entry) if text[entry.line_start..entry.line_end].ends_with('\r') => {
            (entry.line_end - 1, "\r\n")
        }
        Some(entry) if entry.line_end < text.len() => (entry.line_end, "\n"),
        Some(entry) => (entry.line_end, line_break(text)),
        None => (
            text.trim_end_matches(|c| c == '\n' || c == '\r').len(),
            line_break(text),
        ),
    }
}

/// The block's own line break, CRLF if it uses any.
fn line_break(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Deletes the whole line holding `key`, line break included.
fn remove(text: &mut String, key: &str) -> bool {
    let entries = scanner::scan(text);
    let Some(entry) = scanner::find(&entries, key) else {
        return false;
    };

    let range = if entry.line_end < text.len() {
        entry.line_start..entry.line_end + 1
    } else if entry.line_start > 0 {
        let mut start = entry.line_start - 1;
        if text[..start].ends_with('\r') {
            start -= 1;
        }
        start..entry.line_end
    } else {
        entry.line_start..entry.line_end
    };
    debug!("Removing '{}'", key);
    text.replace_range(range, "");
    true
}
