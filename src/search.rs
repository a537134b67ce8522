//! Free-text filtering over the most recent aggregation snapshot.

use std::collections::BTreeMap;

use crate::aggregate::Snapshot;
use crate::sources::{Paper, Source};

/// Per-source enable toggles, owned by the caller (the presentation layer
/// keeps the checkboxes; the core just honors them). All sources are enabled
/// by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFlags {
    pub phys_rev_b: bool,
    pub nature: bool,
    pub arxiv: bool,
}

impl Default for SourceFlags {
    fn default() -> Self {
        Self {
            phys_rev_b: true,
            nature: true,
            arxiv: true,
        }
    }
}

impl SourceFlags {
    pub fn only(source: Source) -> Self {
        let mut flags = Self {
            phys_rev_b: false,
            nature: false,
            arxiv: false,
        };
        match source {
            Source::PhysRevB => flags.phys_rev_b = true,
            Source::Nature => flags.nature = true,
            Source::Arxiv => flags.arxiv = true,
        }
        flags
    }

    pub fn enabled(&self, source: Source) -> bool {
        match source {
            Source::PhysRevB => self.phys_rev_b,
            Source::Nature => self.nature,
            Source::Arxiv => self.arxiv,
        }
    }
}

/// Per-source hit lists from one query, in collection iteration order.
#[derive(Debug, Clone, Default)]
pub struct SearchHits {
    per_source: BTreeMap<Source, Vec<Paper>>,
}

impl SearchHits {
    pub fn for_source(&self, source: Source) -> &[Paper] {
        self.per_source
            .get(&source)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Source, &[Paper])> {
        self.per_source
            .iter()
            .map(|(source, hits)| (*source, hits.as_slice()))
    }

    pub fn total(&self) -> usize {
        self.per_source.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Retain a paper when the lowercase query is a substring of the lowercase
/// title or of the already-fetched abstract. An unfetched abstract can only
/// match on title. The empty query matches everything; that is how "show
/// all" is implemented.
pub fn search(snapshot: &Snapshot, query: &str, flags: &SourceFlags) -> SearchHits {
    let needle = query.to_lowercase();
    let mut hits = SearchHits::default();
    for source in Source::ALL {
        if !flags.enabled(source) {
            continue;
        }
        let Some(collection) = snapshot.collection(source) else {
            continue;
        };
        let matched: Vec<Paper> = collection
            .values()
            .filter(|paper| matches(paper, &needle))
            .cloned()
            .collect();
        hits.per_source.insert(source, matched);
    }
    tracing::debug!(query, results = hits.total(), "search finished");
    hits
}

fn matches(paper: &Paper, needle: &str) -> bool {
    paper.title.to_lowercase().contains(needle)
        || paper
            .abstract_text
            .as_deref()
            .is_some_and(|text| text.to_lowercase().contains(needle))
}
