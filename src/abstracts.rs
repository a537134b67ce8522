//! Lazy, at-most-once fetching of a paper's abstract from its detail page.

use std::collections::HashMap;
use std::sync::Arc;

use std::fmt;

use tokio::sync::{Mutex, RwLock};

use crate::aggregate::Snapshot;
use crate::sources::{Source, SourceAdapter, SourceError};

// Hand-written impls instead of `#[derive(thiserror::Error)]`: thiserror
// unconditionally treats a field named `source` as the error source, and
// `Source` is not an error type.
#[derive(Debug)]
pub enum AbstractError {
    NotFound { source: Source, title: String },
    Source(SourceError),
}

impl fmt::Display for AbstractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbstractError::NotFound { source, title } => {
                write!(f, "paper not found in {source} collection: {title}")
            }
            AbstractError::Source(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for AbstractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AbstractError::NotFound { .. } => None,
            AbstractError::Source(err) => err.source(),
        }
    }
}

impl From<SourceError> for AbstractError {
    fn from(err: SourceError) -> Self {
        AbstractError::Source(err)
    }
}

/// Fetches a paper's abstract on demand and caches it on the record.
///
/// Concurrent calls for the same record are serialized through a per-key
/// lock, so at most one detail fetch ever happens per paper.
#[derive(Default)]
pub struct AbstractFetcher {
    locks: Mutex<HashMap<(Source, String), Arc<Mutex<()>>>>,
}

impl AbstractFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the paper's abstract, fetching the detail page only when the
    /// record does not already carry one. The fetched text is written back
    /// into the snapshot, making repeat calls cache hits.
    pub async fn ensure_abstract(
        &self,
        adapter: &dyn SourceAdapter,
        snapshot: &RwLock<Snapshot>,
        title: &str,
    ) -> Result<String, AbstractError> {
        let source = adapter.source();
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry((source, title.to_string())).or_default())
        };
        let _guard = lock.lock().await;

        let link = {
            let snap = snapshot.read().await;
            let paper = snap.get(source, title).ok_or_else(|| AbstractError::NotFound {
                source,
                title: title.to_string(),
            })?;
            if let Some(text) = &paper.abstract_text {
                return Ok(text.clone());
            }
            paper.link.clone()
        };

        tracing::debug!(%source, title, "fetching abstract from detail page");
        let html = adapter.fetch_detail(&link).await?;
        let text = adapter.extract_abstract(&html)?;

        // The snapshot may have been replaced by a new aggregation run while
        // the fetch was in flight; the caller still gets the text.
        if let Some(paper) = snapshot.write().await.get_mut(source, title) {
            paper.abstract_text = Some(text.clone());
        }
        Ok(text)
    }

    /// Drop per-record locks for papers no longer present in `snapshot`.
    /// Called after every snapshot replacement so the lock map tracks the
    /// live collections instead of growing across aggregation runs.
    pub(crate) async fn prune(&self, snapshot: &Snapshot) {
        self.locks
            .lock()
            .await
            .retain(|(source, title), _| snapshot.get(*source, title).is_some());
    }

    #[cfg(test)]
    pub(crate) async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }
}
