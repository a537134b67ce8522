//! Durable storage for user-saved papers.
//!
//! One CSV row per saved paper, fields in fixed order
//! `[title, authors, link, pub_info, abstract, source]`, quoted-record
//! escaping throughout so embedded commas, newlines and quotes round-trip
//! losslessly. The `source` column was absent in early files; rows with
//! only five fields still load, with an unknown source.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sources::{Paper, Source};

/// A paper persisted to the saved-papers file. Unlike a live [`Paper`], the
/// abstract is a plain string: an unfetched abstract is saved as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPaper {
    pub title: String,
    pub authors: String,
    pub link: String,
    pub pub_info: String,
    pub abstract_text: String,
    /// `None` for rows written before the source column existed.
    pub source: Option<Source>,
}

impl From<&Paper> for SavedPaper {
    fn from(paper: &Paper) -> Self {
        Self {
            title: paper.title.clone(),
            authors: paper.authors.clone(),
            link: paper.link.clone(),
            pub_info: paper.pub_info.clone(),
            abstract_text: paper.abstract_text.clone().unwrap_or_default(),
            source: Some(paper.source),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("saved paper not found: {0}")]
    NotFound(String),
}

/// Append/remove collection of saved papers backed by a single flat file.
///
/// Single-process, single-writer: the caller serializes mutations (the
/// facade holds the store behind one lock).
pub struct PaperStore {
    path: PathBuf,
}

impl PaperStore {
    /// Open a store at `path`, creating parent directories as needed. The
    /// backing file itself is created on first append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All saved papers keyed by title; duplicate saves collapse to the last
    /// row written.
    pub fn load_all(&self) -> Result<BTreeMap<String, SavedPaper>, StoreError> {
        let mut papers = BTreeMap::new();
        for row in self.rows()? {
            papers.insert(row.title.clone(), row);
        }
        Ok(papers)
    }

    /// Every stored row in file order, duplicates included. A row with fewer
    /// than five fields is corrupt; it is skipped with a warning and loading
    /// continues.
    pub fn rows(&self) -> Result<Vec<SavedPaper>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;
        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            match parse_row(&record) {
                Some(row) => rows.push(row),
                None => {
                    tracing::warn!(line, fields = record.len(), "skipping corrupt saved-paper row")
                }
            }
        }
        Ok(rows)
    }

    /// Append one row. Duplicate titles are not checked; `load_all` tolerates
    /// them with last-row-wins.
    pub fn append(&self, paper: &Paper) -> Result<(), StoreError> {
        let row = SavedPaper::from(paper);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        write_row(&mut writer, &row)?;
        writer.flush()?;
        Ok(())
    }

    /// Remove the first row whose full field tuple equals `paper`, keeping
    /// every other row in its original order. The rewrite goes to a temp file
    /// in the same directory and is renamed over the original, so a crash
    /// mid-write cannot corrupt the store.
    pub fn remove(&self, paper: &SavedPaper) -> Result<(), StoreError> {
        let rows = self.rows()?;
        let Some(target) = rows.iter().position(|row| row == paper) else {
            return Err(StoreError::NotFound(paper.title.clone()));
        };

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file());
            for (i, row) in rows.iter().enumerate() {
                if i != target {
                    write_row(&mut writer, row)?;
                }
            }
            writer.flush()?;
        }
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

fn parse_row(record: &csv::StringRecord) -> Option<SavedPaper> {
    if record.len() < 5 {
        return None;
    }
    Some(SavedPaper {
        title: record.get(0)?.to_string(),
        authors: record.get(1)?.to_string(),
        link: record.get(2)?.to_string(),
        pub_info: record.get(3)?.to_string(),
        abstract_text: record.get(4)?.to_string(),
        source: record
            .get(5)
            .filter(|s| !s.is_empty())
            .and_then(Source::from_name),
    })
}

fn write_row<W: Write>(writer: &mut csv::Writer<W>, row: &SavedPaper) -> Result<(), csv::Error> {
    writer.write_record([
        row.title.as_str(),
        row.authors.as_str(),
        row.link.as_str(),
        row.pub_info.as_str(),
        row.abstract_text.as_str(),
        row.source.map(|s| s.name()).unwrap_or(""),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn paper(title: &str, abstract_text: Option<&str>) -> Paper {
        Paper {
            title: title.to_string(),
            authors: "Ada Lovelace and Max Born".to_string(),
            link: "https://arxiv.org/abs/2508.01234".to_string(),
            pub_info: "arXiv:2508.01234 \u{2013} Recent".to_string(),
            abstract_text: abstract_text.map(|s| s.to_string()),
            source: Source::Arxiv,
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> PaperStore {
        PaperStore::open(dir.path().join("saved_papers.csv")).unwrap()
    }

    #[test]
    fn test_append_load_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(&dir);

        let p = paper(
            "Commas, \"quotes\" and\nnewlines \u{2013} et al.",
            Some("Abstract with, commas\nand lines."),
        );
        store.append(&p)?;

        let loaded = store.load_all()?;
        assert_eq!(loaded.len(), 1);
        let saved = &loaded[&p.title];
        assert_eq!(*saved, SavedPaper::from(&p));
        assert_eq!(saved.abstract_text, "Abstract with, commas\nand lines.");
        assert_eq!(saved.source, Some(Source::Arxiv));
        Ok(())
    }

    #[test]
    fn test_unfetched_abstract_saves_as_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(&dir);
        store.append(&paper("No abstract yet", None))?;
        assert_eq!(store.load_all()?["No abstract yet"].abstract_text, "");
        Ok(())
    }

    #[test]
    fn test_remove_keeps_other_rows_in_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(&dir);
        for title in ["first", "second", "third"] {
            store.append(&paper(title, None))?;
        }

        store.remove(&SavedPaper::from(&paper("second", None)))?;

        let titles: Vec<String> = store.rows()?.into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["first", "third"]);
        Ok(())
    }

    #[test]
    fn test_duplicate_save_then_single_remove() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(&dir);
        let p = paper("saved twice", None);
        store.append(&p)?;
        store.append(&p)?;
        assert_eq!(store.rows()?.len(), 2);

        // Exactly one copy goes away; the duplicate stays behind.
        store.remove(&SavedPaper::from(&p))?;
        let rows = store.rows()?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "saved twice");
        assert!(store.load_all()?.contains_key("saved twice"));
        Ok(())
    }

    #[test]
    fn test_remove_missing_row_is_not_found() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(&dir);
        store.append(&paper("present", None))?;
        let err = store
            .remove(&SavedPaper::from(&paper("absent", None)))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        Ok(())
    }

    #[test]
    fn test_corrupt_row_is_skipped() -> Result<()> {
        init_logging();
        let dir = tempfile::tempdir()?;
        let store = store_in(&dir);
        store.append(&paper("good one", None))?;
        {
            let mut file = OpenOptions::new().append(true).open(store.path())?;
            writeln!(file, "only,three,fields")?;
        }
        store.append(&paper("good two", None))?;

        let titles: Vec<String> = store.rows()?.into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["good one", "good two"]);
        Ok(())
    }

    #[test]
    fn test_legacy_five_field_row_loads_without_source() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(&dir);
        {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(store.path())?;
            writeln!(file, "Old paper,Some Author,https://example.org/x,Vol. 1,")?;
        }
        let loaded = store.load_all()?;
        let row = &loaded["Old paper"];
        assert_eq!(row.source, None);
        assert_eq!(row.authors, "Some Author");
        Ok(())
    }

    #[test]
    fn test_duplicate_title_last_row_wins_in_load_all() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(&dir);
        let mut first = paper("same", None);
        first.authors = "First Author".to_string();
        let mut second = paper("same", None);
        second.authors = "Second Author".to_string();
        store.append(&first)?;
        store.append(&second)?;
        assert_eq!(store.load_all()?["same"].authors, "Second Author");
        Ok(())
    }
}
