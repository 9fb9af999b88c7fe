//! Per-domain field tables.
//!
//! Each domain owns a fixed, ordered list of fields together with the anchor
//! fields used to place a field that is not yet present. Insertion placement
//! is fully data driven from these tables.

use clap::ValueEnum;
use std::fmt;

pub const TITLE: &str = "title";
pub const CATEGORY: &str = "category";
pub const PROCESSED: &str = "processed";
pub const DRAFT: &str = "draft";
pub const IMG: &str = "img";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum Domain {
    Book,
    Movie,
    Album,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Book, Domain::Movie, Domain::Album];

    pub fn spec(&self) -> &'static DomainSpec {
        match self {
            Domain::Book => &BOOK_SPEC,
            Domain::Movie => &MOVIE_SPEC,
            Domain::Album => &ALBUM_SPEC,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Book => "book",
            Domain::Movie => "movie",
            Domain::Album => "album",
        }
    }

    /// Domain selected by a per-record page `category` value.
    pub fn from_page_category(category: &str) -> Option<Self> {
        Domain::ALL
            .into_iter()
            .find(|d| d.spec().page_category == category)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field that may be written by the upsert engine.
#[derive(Debug)]
pub struct FieldSpec {
    pub key: &'static str,
    /// Fields after which this one is inserted when absent, highest priority first.
    pub anchors: &'static [&'static str],
}

#[derive(Debug)]
pub struct DomainSpec {
    pub domain: Domain,
    /// Resolved fields, in the order they are applied.
    pub fields: &'static [FieldSpec],
    pub processed_anchors: &'static [&'static str],
    /// Present only for domains that track draft state.
    pub draft_anchors: Option<&'static [&'static str]>,
    /// Fields that must be non-empty for a processed record to stay closed.
    pub required: &'static [&'static str],
    /// Already-known values that win over provider values.
    pub preserved: &'static [&'static str],
    /// Fields whose presence lets `--skip-existing` pass over a record.
    pub skip_existing: &'static [&'static str],
    /// `--skip-existing` additionally requires the artwork file on disk.
    pub skip_existing_needs_artwork: bool,
    /// Value of `category` in per-record pages.
    pub page_category: &'static str,
    /// Accepted `category` values in collection files.
    pub collection_tags: &'static [&'static str],
    /// Per-record pages live in `<content>/consumed/<subdir>`.
    pub content_subdir: &'static str,
    /// Artwork lives in `<static>/images/<image_dir>`.
    pub image_dir: &'static str,
    pub artwork_suffix: &'static str,
}

impl DomainSpec {
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn tracks_draft(&self) -> bool {
        self.draft_anchors.is_some()
    }

    pub fn is_preserved(&self, key: &str) -> bool {
        self.preserved.contains(&key)
    }

    pub fn accepts_collection_tag(&self, tag: &str) -> bool {
        self.collection_tags.contains(&tag)
    }
}

static BOOK_SPEC: DomainSpec = DomainSpec {
    domain: Domain::Book,
    fields: &[
        FieldSpec {
            key: "author",
            anchors: &[TITLE],
        },
        FieldSpec {
            key: "year",
            anchors: &["author", TITLE],
        },
        FieldSpec {
            key: "publisher",
            anchors: &["year", "author", TITLE],
        },
        FieldSpec {
            key: "openlibrary",
            anchors: &["publisher", "year", "author", TITLE],
        },
        FieldSpec {
            key: IMG,
            anchors: &[CATEGORY, TITLE],
        },
    ],
    processed_anchors: &[IMG, "openlibrary", "publisher", "year", "author", TITLE],
    draft_anchors: None,
    required: &["author", "year", "publisher", "openlibrary", IMG],
    preserved: &[],
    skip_existing: &["author", "year"],
    skip_existing_needs_artwork: false,
    page_category: "book",
    collection_tags: &["books", "book"],
    content_subdir: "book",
    image_dir: "books",
    artwork_suffix: "_cover.jpg",
};

static MOVIE_SPEC: DomainSpec = DomainSpec {
    domain: Domain::Movie,
    fields: &[
        FieldSpec {
            key: "year",
            anchors: &[TITLE],
        },
        FieldSpec {
            key: "director",
            anchors: &["year", TITLE],
        },
        FieldSpec {
            key: "tmdb",
            anchors: &["director", "rating", TITLE],
        },
        FieldSpec {
            key: IMG,
            anchors: &[CATEGORY, TITLE],
        },
        FieldSpec {
            key: "trailer",
            anchors: &["tmdb", IMG, "director", TITLE],
        },
    ],
    processed_anchors: &[IMG, "director", "year", TITLE],
    draft_anchors: Some(&[CATEGORY, TITLE]),
    required: &["director", "year", "tmdb", IMG],
    preserved: &["year", "director"],
    skip_existing: &["director"],
    skip_existing_needs_artwork: true,
    page_category: "movie",
    collection_tags: &["movies", "movie"],
    content_subdir: "movie",
    image_dir: "movies",
    artwork_suffix: "_poster.jpg",
};

static ALBUM_SPEC: DomainSpec = DomainSpec {
    domain: Domain::Album,
    fields: &[
        FieldSpec {
            key: "artist",
            anchors: &[TITLE],
        },
        FieldSpec {
            key: "year",
            anchors: &["artist", TITLE],
        },
        FieldSpec {
            key: "label",
            anchors: &["year", "artist", TITLE],
        },
        FieldSpec {
            key: "discogs",
            anchors: &["label", "year", TITLE],
        },
        FieldSpec {
            key: "discogsLabel",
            anchors: &["discogs", "label", TITLE],
        },
        FieldSpec {
            key: IMG,
            anchors: &[CATEGORY, TITLE],
        },
    ],
    processed_anchors: &[IMG, "discogs", "label", TITLE],
    draft_anchors: None,
    required: &["artist", "year", "label", "discogs", IMG],
    preserved: &["artist", "year"],
    skip_existing: &["artist", "year", "label"],
    skip_existing_needs_artwork: false,
    page_category: "music",
    collection_tags: &["music", "albums", "album"],
    content_subdir: "music",
    image_dir: "music",
    artwork_suffix: "_cover.jpg",
};
