//! Runs every configured source adapter and merges the results into one
//! immutable snapshot of per-source collections.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;

use crate::normalize;
use crate::sources::{Paper, Source, SourceAdapter, SourceError};

/// Papers from one source keyed by title; last write wins on collision.
pub type Collection = BTreeMap<String, Paper>;

/// The per-source collections produced by one aggregation run. Published
/// as a whole and never mutated while a new run is in flight; callers
/// replace it wholesale.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    collections: HashMap<Source, Collection>,
}

impl Snapshot {
    pub fn collection(&self, source: Source) -> Option<&Collection> {
        self.collections.get(&source)
    }

    pub fn get(&self, source: Source, title: &str) -> Option<&Paper> {
        self.collections.get(&source)?.get(title)
    }

    pub(crate) fn get_mut(&mut self, source: Source, title: &str) -> Option<&mut Paper> {
        self.collections.get_mut(&source)?.get_mut(title)
    }

    pub(crate) fn set_collection(&mut self, source: Source, collection: Collection) {
        self.collections.insert(source, collection);
    }

    /// Total number of papers across all collections.
    pub fn len(&self) -> usize {
        self.collections.values().map(Collection::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A source listing fetch failed, so the whole aggregation run is aborted.
/// No partial set of collections is ever exposed.
#[derive(Debug, Error)]
#[error("failed to reach {source}: {cause}")]
pub struct ConnectivityError {
    pub source: Source,
    #[source]
    pub cause: SourceError,
}

/// Fetch all sources to `depth` listing pages, concurrently (one task per
/// source), normalize the raw entries and build one collection per source.
pub async fn load_all(
    adapters: &[Arc<dyn SourceAdapter>],
    depth: u32,
) -> Result<Snapshot, ConnectivityError> {
    tracing::info!(sources = adapters.len(), depth, "starting aggregation run");

    let mut handles = Vec::with_capacity(adapters.len());
    for adapter in adapters {
        let source = adapter.source();
        let adapter = Arc::clone(adapter);
        handles.push((
            source,
            tokio::spawn(async move { adapter.fetch_listing(depth).await }),
        ));
    }

    let mut snapshot = Snapshot::default();
    for (source, handle) in handles {
        let raw = match handle.await {
            Ok(Ok(raw)) => raw,
            Ok(Err(cause)) => return Err(ConnectivityError { source, cause }),
            Err(e) => {
                return Err(ConnectivityError {
                    source,
                    cause: SourceError::Extraction(format!("listing task failed: {}", e)),
                })
            }
        };

        let mut collection = Collection::new();
        for entry in raw {
            let paper = normalize::normalize(source, entry);
            collection.insert(paper.title.clone(), paper);
        }
        tracing::info!(%source, papers = collection.len(), "collection loaded");
        snapshot.collections.insert(source, collection);
    }

    tracing::info!(papers = snapshot.len(), "aggregation run finished");
    Ok(snapshot)
}
