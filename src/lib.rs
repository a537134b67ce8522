//! Finds recently published condensed-matter papers across Physical Review B,
//! Nature, and arXiv, normalizes them into uniform records, answers free-text
//! search queries over the aggregated set, lazily fetches abstracts from
//! detail pages, and keeps a durable local list of user-saved papers.
//!
//! The listing pages have no structured schema, so each source adapter parses
//! them with positional and textual heuristics; a page whose markup no longer
//! lines up is skipped rather than mis-paired. Presentation is out of scope:
//! a UI consumes [`FieldScan`] and never touches parsing or persistence.

pub mod abstracts;
pub mod aggregate;
pub mod config;
pub mod normalize;
pub mod search;
pub mod sources;
pub mod store;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

pub use abstracts::{AbstractError, AbstractFetcher};
pub use aggregate::{Collection, ConnectivityError, Snapshot};
pub use config::Config;
pub use search::{SearchHits, SourceFlags};
pub use sources::{Paper, Source, SourceAdapter, SourceError};
pub use store::{PaperStore, SavedPaper, StoreError};

/// Facade owning the source adapters, the current aggregation snapshot and
/// the saved-papers store. All consumer-facing operations go through here.
pub struct FieldScan {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    snapshot: RwLock<Snapshot>,
    fetcher: AbstractFetcher,
    store: Mutex<PaperStore>,
}

impl FieldScan {
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        let store = PaperStore::open(config.saved_papers_path())?;
        Ok(Self::with_adapters(config.build_adapters(), store))
    }

    pub fn with_adapters(adapters: Vec<Arc<dyn SourceAdapter>>, store: PaperStore) -> Self {
        Self {
            adapters,
            snapshot: RwLock::new(Snapshot::default()),
            fetcher: AbstractFetcher::new(),
            store: Mutex::new(store),
        }
    }

    /// Fetch all sources to `depth` listing pages and replace the current
    /// snapshot wholesale. A failed run reports the connectivity failure and
    /// leaves the previous snapshot in place; no partially loaded state is
    /// ever visible.
    pub async fn load_all(&self, depth: u32) -> Result<(), ConnectivityError> {
        let snapshot = aggregate::load_all(&self.adapters, depth).await?;
        let mut current = self.snapshot.write().await;
        *current = snapshot;
        // Per-record fetch locks for papers that did not survive the reload
        // would otherwise accumulate forever.
        self.fetcher.prune(&current).await;
        Ok(())
    }

    /// Free-text search over the current snapshot; see [`search::search`].
    pub async fn search(&self, query: &str, flags: &SourceFlags) -> SearchHits {
        search::search(&*self.snapshot.read().await, query, flags)
    }

    /// Look up a single paper from the current snapshot.
    pub async fn paper(&self, source: Source, title: &str) -> Option<Paper> {
        self.snapshot.read().await.get(source, title).cloned()
    }

    /// Fetch (at most once) and return the abstract for the given paper.
    pub async fn ensure_abstract(
        &self,
        source: Source,
        title: &str,
    ) -> Result<String, AbstractError> {
        let adapter = self
            .adapters
            .iter()
            .find(|a| a.source() == source)
            .ok_or_else(|| AbstractError::NotFound {
                source,
                title: title.to_string(),
            })?;
        self.fetcher
            .ensure_abstract(adapter.as_ref(), &self.snapshot, title)
            .await
    }

    pub async fn save(&self, paper: &Paper) -> Result<(), StoreError> {
        self.store.lock().await.append(paper)
    }

    pub async fn remove(&self, paper: &SavedPaper) -> Result<(), StoreError> {
        self.store.lock().await.remove(paper)
    }

    /// Reload the full saved set from durable storage; the file is the
    /// single source of truth.
    pub async fn load_saved_papers(&self) -> Result<BTreeMap<String, SavedPaper>, StoreError> {
        self.store.lock().await.load_all()
    }
}
