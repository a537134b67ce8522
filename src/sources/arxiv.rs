use super::{collapse, RawEntry, Source, SourceAdapter, SourceError};
use async_trait::async_trait;
use scraper::{Html, Selector};

const LISTING_URL: &str = "https://arxiv.org/list/cond-mat/new";
const ABS_URL: &str = "https://arxiv.org/abs";

const AUTHORS_MARKER: &str = "Authors:";
const ABSTRACT_PREFIX: &str = "Abstract: ";

/// arXiv new-submissions listing for cond-mat.
///
/// A single page regardless of the requested depth. Title and author blocks
/// are paired by position with the abstract-link anchors, whose text carries
/// the `arXiv:ID` identifier the detail link is synthesized from.
pub struct ArxivAdapter {
    client: reqwest::Client,
}

impl ArxivAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for ArxivAdapter {
    fn source(&self) -> Source {
        Source::Arxiv
    }

    async fn fetch_listing(&self, _depth: u32) -> Result<Vec<RawEntry>, SourceError> {
        tracing::debug!("fetching arXiv new submissions");
        let html = self
            .client
            .get(LISTING_URL)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        match parse_listing_page(&html) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(error = %e, "skipping arXiv listing");
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_detail(&self, link: &str) -> Result<String, SourceError> {
        Ok(self
            .client
            .get(link)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    /// The abstract lives in a blockquote with a literal `Abstract: ` prefix.
    fn extract_abstract(&self, html: &str) -> Result<String, SourceError> {
        let doc = Html::parse_document(html);
        let bq_sel = Selector::parse("blockquote.abstract")
            .map_err(|e| SourceError::Extraction(format!("{:?}", e)))?;
        doc.select(&bq_sel)
            .next()
            .map(|bq| {
                let text = collapse(&bq.text().collect::<String>());
                text.strip_prefix(ABSTRACT_PREFIX)
                    .unwrap_or(&text)
                    .to_string()
            })
            .ok_or_else(|| {
                SourceError::Extraction("no abstract blockquote in detail page".to_string())
            })
    }
}

fn parse_listing_page(html: &str) -> Result<Vec<RawEntry>, SourceError> {
    let doc = Html::parse_document(html);
    let title_sel = Selector::parse("div.list-title")
        .map_err(|e| SourceError::Extraction(format!("{:?}", e)))?;
    let authors_sel = Selector::parse("div.list-authors")
        .map_err(|e| SourceError::Extraction(format!("{:?}", e)))?;
    let anchor_sel = Selector::parse(r#"a[href^="/abs/"]"#)
        .map_err(|e| SourceError::Extraction(format!("{:?}", e)))?;

    let titles: Vec<String> = doc
        .select(&title_sel)
        .map(|el| {
            let text = collapse(&el.text().collect::<String>());
            // The block leads with a "Title:" label token.
            match text.split_once(' ') {
                Some((_, rest)) => rest.to_string(),
                None => text,
            }
        })
        .collect();

    let author_lists: Vec<Vec<String>> = doc
        .select(&authors_sel)
        .map(|el| {
            let text = collapse(&el.text().collect::<String>());
            let names = match text.split_once(AUTHORS_MARKER) {
                Some((_, rest)) => rest,
                None => text.as_str(),
            };
            names
                .split(", ")
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect()
        })
        .collect();

    // Anchor text is the arXiv:ID identifier and doubles as the pub-info.
    let idents: Vec<String> = doc
        .select(&anchor_sel)
        .map(|a| collapse(&a.text().collect::<String>()))
        .filter(|text| text.starts_with("arXiv:"))
        .collect();

    if titles.len() != author_lists.len() || titles.len() != idents.len() {
        return Err(SourceError::Extraction(format!(
            "field count mismatch: {} titles, {} author blocks, {} identifiers",
            titles.len(),
            author_lists.len(),
            idents.len()
        )));
    }

    let mut entries = Vec::new();
    for ((title, authors), ident) in titles.into_iter().zip(author_lists).zip(idents) {
        if title.is_empty() {
            tracing::warn!("empty title block, skipping record");
            continue;
        }
        let Some(id) = ident.split(':').nth(1) else {
            tracing::warn!(%title, "malformed identifier, skipping record");
            continue;
        };
        entries.push(RawEntry {
            title,
            authors,
            link: format!("{}/{}", ABS_URL, id),
            pub_info: ident.clone(),
        });
    }
    Ok(entries)
}
