pub mod arxiv;
pub mod nature;
pub mod phys_rev;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the three origin systems papers are fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Source {
    PhysRevB,
    Nature,
    Arxiv,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::PhysRevB, Source::Nature, Source::Arxiv];

    /// Stable lowercase name used in configuration and the saved-papers file.
    pub fn name(&self) -> &'static str {
        match self {
            Source::PhysRevB => "physrevb",
            Source::Nature => "nature",
            Source::Arxiv => "arxiv",
        }
    }

    pub fn from_name(name: &str) -> Option<Source> {
        match name {
            "physrevb" => Some(Source::PhysRevB),
            "nature" => Some(Source::Nature),
            "arxiv" => Some(Source::Arxiv),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A normalized paper record, the canonical unit across all sources.
///
/// `title` is the unique key within one source's collection; the same paper
/// listed by two sources yields two independent records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    /// Comma-joined author list with `and` before the final name. May be
    /// empty when the source omits it.
    pub authors: String,
    /// Absolute URL of the detail page.
    pub link: String,
    /// Free-text venue/date annotation in the source's own format.
    pub pub_info: String,
    /// `None` until the detail page has been fetched; `Some("")` means the
    /// detail page genuinely carried no abstract.
    pub abstract_text: Option<String>,
    pub source: Source,
}

/// Fields for one paper as extracted from a listing page, before
/// normalization. `authors` holds the raw fragments (a single pre-joined
/// string for sources that list authors in one block, one fragment per name
/// otherwise) and `link` may still be host-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    pub authors: Vec<String>,
    pub link: String,
    pub pub_info: String,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("extraction failed: {0}")]
    Extraction(String),
}

/// Per-source fetching and extraction rules.
///
/// Listing pages have no structured schema, so `fetch_listing` relies on
/// positional and textual heuristics. Implementations must validate that
/// parallel field sequences line up before pairing them and skip a page (or
/// record) that does not, rather than mis-pairing fields.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    /// Fetch listing pages `1..=depth` and extract one `RawEntry` per paper.
    /// Any transport failure or non-2xx response is an error; a page whose
    /// markup no longer matches the expected shape is skipped with a warning.
    async fn fetch_listing(&self, depth: u32) -> Result<Vec<RawEntry>, SourceError>;

    /// Fetch a paper's detail page.
    async fn fetch_detail(&self, link: &str) -> Result<String, SourceError>;

    /// Pull the abstract out of a detail page using this source's rule.
    fn extract_abstract(&self, html: &str) -> Result<String, SourceError>;
}

/// Collapse runs of whitespace in element text down to single spaces.
pub(crate) fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
