//! Finds record blocks inside documents.
//!
//! Two layouts are supported: a single `+++` frontmatter block at the top of a
//! per-record page, and a collection file of repeated `[[collection]]` blocks.

use super::scanner;
use crate::domain::{DomainSpec, CATEGORY, TITLE};
use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

pub const FRONTMATTER_MARKER: &str = "+++";

lazy_static! {
    static ref COLLECTION_MARKER: Regex =
        Regex::new(r"(?m)^[ \t]*\[\[collection\]\][ \t]*\r?\n").expect("valid collection marker regex");
}

/// Span between the two `+++` lines, exclusive of the markers themselves.
///
/// Markers only count at the start of a line.
pub fn locate_frontmatter(text: &str) -> Option<Range<usize>> {
    let open = marker_at_line_start(text, 0)?;
    let start = open + FRONTMATTER_MARKER.len();
    let close = marker_at_line_start(text, start)?;
    Some(start..close)
}

fn marker_at_line_start(text: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(offset) = text[search..].find(FRONTMATTER_MARKER) {
        let pos = search + offset;
        if pos == 0 || text.as_bytes()[pos - 1] == b'\n' {
            return Some(pos);
        }
        search = pos + FRONTMATTER_MARKER.len();
    }
    None
}

/// Every block of a collection file: from the end of its marker line to the
/// next marker or end of file.
pub fn segment_collection(text: &str) -> Vec<Range<usize>> {
    let markers: Vec<_> = COLLECTION_MARKER.find_iter(text).collect();
    markers
        .iter()
        .enumerate()
        .map(|(idx, m)| {
            let end = markers.get(idx + 1).map_or(text.len(), |next| next.start());
            m.end()..end
        })
        .collect()
}

/// True when `block` has a `title` equal to `title` after unescaping.
pub fn block_has_title(block: &str, title: &str) -> bool {
    let entries = scanner::scan(block);
    scanner::find(&entries, TITLE).is_some_and(|e| e.value.as_text() == title)
}

/// First collection block tagged for `spec` whose title equals `title`.
pub fn locate_collection_block(text: &str, spec: &DomainSpec, title: &str) -> Option<Range<usize>> {
    segment_collection(text).into_iter().find(|span| {
        let entries = scanner::scan(&text[span.clone()]);
        let tagged = scanner::find(&entries, CATEGORY)
            .is_some_and(|e| spec.accepts_collection_tag(&e.value.as_text()));
        let titled = scanner::find(&entries, TITLE).is_some_and(|e| e.value.as_text() == title);
        tagged && titled
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;

    #[test]
    fn test_frontmatter_span_excludes_markers() {
        let text = "+++\ntitle = \"Dune\"\n+++\n\nBody text.\n";
        let span = locate_frontmatter(text).unwrap();
        assert_eq!(&text[span.clone()], "\ntitle = \"Dune\"\n");
        assert_eq!(&text[span.end..], "+++\n\nBody text.\n");
    }

    #[test]
    fn test_frontmatter_ignores_markers_mid_line() {
        let text = "+++\ntitle = \"a+++b\"\n+++\nsee x+++y\n";
        let span = locate_frontmatter(text).unwrap();
        assert_eq!(&text[span], "\ntitle = \"a+++b\"\n");
    }

    #[test]
    fn test_frontmatter_missing_close() {
        assert!(locate_frontmatter("+++\ntitle = \"Dune\"\n").is_none());
        assert!(locate_frontmatter("no markers here").is_none());
    }

    #[test]
    fn test_segments_collection_blocks() {
        let text = "# books\n\n[[collection]]\ntitle = \"A\"\n\n[[collection]]  \ntitle = \"B\"\n";
        let spans = segment_collection(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(&text[spans[0].clone()], "title = \"A\"\n\n");
        assert_eq!(&text[spans[1].clone()], "title = \"B\"\n");
    }

    #[test]
    fn test_marker_only_counts_at_line_start() {
        let text = "[[collection]]\ntitle = \"A\"\n# split from [[collection]]\nyear = \"1965\"\n\r\n  [[collection]]\r\ntitle = \"B\"\r\n";
        let spans = segment_collection(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(
            &text[spans[0].clone()],
            "title = \"A\"\n# split from [[collection]]\nyear = \"1965\"\n\r\n"
        );
        assert_eq!(&text[spans[1].clone()], "title = \"B\"\r\n");
    }

    #[test]
    fn test_locates_by_tag_and_exact_title() {
        let text = concat!(
            "[[collection]]\ntitle = \"Dune Messiah\"\ncategory = \"books\"\n\n",
            "[[collection]]\ntitle = \"Dune\"\ncategory = \"movies\"\n\n",
            "[[collection]]\ntitle = \"Dune\"\ncategory = \"books\"\n",
        );
        let span = locate_collection_block(text, Domain::Book.spec(), "Dune").unwrap();
        assert_eq!(&text[span], "title = \"Dune\"\ncategory = \"books\"\n");
    }

    #[test]
    fn test_title_with_metacharacters_matches_literally() {
        let text = "[[collection]]\ntitle = \"C++ (3rd ed.) \\\"Annotated\\\"\"\ncategory = \"books\"\n";
        let span = locate_collection_block(text, Domain::Book.spec(), "C++ (3rd ed.) \"Annotated\"");
        assert!(span.is_some());
        assert!(locate_collection_block(text, Domain::Book.spec(), "C+ (3rd ed.)").is_none());
    }

    #[test]
    fn test_missing_title_is_not_found() {
        let text = "[[collection]]\ncategory = \"books\"\n";
        assert!(locate_collection_block(text, Domain::Book.spec(), "Dune").is_none());
    }

    #[test]
    fn test_block_has_title() {
        assert!(block_has_title("\ntitle = \"Heat\"\n", "Heat"));
        assert!(!block_has_title("\ntitle = \"Heat\"\n", "heat"));
        assert!(!block_has_title("\ncategory = \"movie\"\n", "Heat"));
    }
}
