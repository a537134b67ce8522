use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::{self, Source, SourceAdapter};

pub const SAVED_PAPERS_FILE: &str = "saved_papers.csv";

const DEFAULT_PAGE_DEPTH: u32 = 1;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("field-scan/", env!("CARGO_PKG_VERSION"));

/// Library configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    /// How many listing pages of each paged source to walk.
    pub page_depth: u32,
    /// Bound on every network request; listing and detail fetches alike.
    pub request_timeout: Duration,
    pub enabled_source_names: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("FIELD_SCAN_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_or_default().join(".field-scan"));

        let page_depth = std::env::var("FIELD_SCAN_PAGE_DEPTH")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|d| *d >= 1)
            .unwrap_or(DEFAULT_PAGE_DEPTH);

        let request_timeout = std::env::var("FIELD_SCAN_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let enabled_source_names = std::env::var("FIELD_SCAN_SOURCES")
            .map(|s| s.split(',').map(|s| s.trim().to_lowercase()).collect())
            .unwrap_or_default();

        Self {
            data_dir,
            page_depth,
            request_timeout,
            enabled_source_names,
        }
    }

    pub fn saved_papers_path(&self) -> PathBuf {
        self.data_dir.join(SAVED_PAPERS_FILE)
    }

    /// Build the enabled source adapters over one shared HTTP client.
    pub fn build_adapters(&self) -> Vec<Arc<dyn SourceAdapter>> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.request_timeout)
            .build()
            .unwrap();

        let filter = &self.enabled_source_names;
        let filter_active = !filter.is_empty();
        let should_enable =
            |source: Source| !filter_active || filter.iter().any(|n| n == source.name());

        let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
        if should_enable(Source::PhysRevB) {
            adapters.push(Arc::new(sources::phys_rev::PhysRevAdapter::new(
                client.clone(),
            )));
        }
        if should_enable(Source::Nature) {
            adapters.push(Arc::new(sources::nature::NatureAdapter::new(
                client.clone(),
            )));
        }
        if should_enable(Source::Arxiv) {
            adapters.push(Arc::new(sources::arxiv::ArxivAdapter::new(client)));
        }
        adapters
    }
}

fn home_or_default() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(sources: &[&str]) -> Config {
        Config {
            data_dir: PathBuf::from("/tmp/field-scan-test"),
            page_depth: 1,
            request_timeout: Duration::from_secs(5),
            enabled_source_names: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_no_filter_enables_all_sources() {
        assert_eq!(config(&[]).build_adapters().len(), 3);
    }

    #[test]
    fn test_source_filter() {
        let adapters = config(&["arxiv"]).build_adapters();
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].source(), Source::Arxiv);
    }

    #[test]
    fn test_saved_papers_path() {
        assert_eq!(
            config(&[]).saved_papers_path(),
            PathBuf::from("/tmp/field-scan-test/saved_papers.csv")
        );
    }
}
