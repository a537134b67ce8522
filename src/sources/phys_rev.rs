use super::{collapse, RawEntry, Source, SourceAdapter, SourceError};
use async_trait::async_trait;
use scraper::{Html, Selector};

const LISTING_URL: &str = "https://journals.aps.org/prb/recent";

/// Physical Review B recent-publications listing.
///
/// Each listing page carries parallel `h5.title` / `h6.authors` /
/// `h6.pub-info` sequences that are paired by position.
pub struct PhysRevAdapter {
    client: reqwest::Client,
}

impl PhysRevAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for PhysRevAdapter {
    fn source(&self) -> Source {
        Source::PhysRevB
    }

    async fn fetch_listing(&self, depth: u32) -> Result<Vec<RawEntry>, SourceError> {
        let mut entries = Vec::new();
        for page in 1..=depth.max(1) {
            tracing::debug!(page, "fetching Physical Review B listing");
            let url = format!("{}?page={}", LISTING_URL, page);
            let html = self
                .client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            match parse_listing_page(&html) {
                Ok(page_entries) => entries.extend(page_entries),
                Err(e) => {
                    tracing::warn!(page, error = %e, "skipping Physical Review B page")
                }
            }
        }
        Ok(entries)
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

    /// The abstract is the first paragraph element of the detail page.
    fn extract_abstract(&self, html: &str) -> Result<String, SourceError> {
        let doc = Html::parse_document(html);
        let p_sel =
            Selector::parse("p").map_err(|e| SourceError::Extraction(format!("{:?}", e)))?;
        doc.select(&p_sel)
            .next()
            .map(|p| collapse(&p.text().collect::<String>()))
            .ok_or_else(|| {
                SourceError::Extraction("no paragraph element in detail page".to_string())
            })
    }
}

/// Positional pairing is only sound when all three fragment sequences have
/// the same length, so a page failing that check is rejected as a whole.
fn parse_listing_page(html: &str) -> Result<Vec<RawEntry>, SourceError> {
    let doc = Html::parse_document(html);
    let title_sel =
        Selector::parse("h5.title").map_err(|e| SourceError::Extraction(format!("{:?}", e)))?;
    let authors_sel =
        Selector::parse("h6.authors").map_err(|e| SourceError::Extraction(format!("{:?}", e)))?;
    let pub_sel =
        Selector::parse("h6.pub-info").map_err(|e| SourceError::Extraction(format!("{:?}", e)))?;
    let link_sel =
        Selector::parse("a").map_err(|e| SourceError::Extraction(format!("{:?}", e)))?;

    // Only headings whose class is exactly "title" take part in the pairing;
    // decorated variants belong to other page furniture.
    let titles: Vec<_> = doc
        .select(&title_sel)
        .filter(|el| el.value().attr("class") == Some("title"))
        .collect();
    let authors: Vec<_> = doc.select(&authors_sel).collect();
    let pub_info: Vec<_> = doc.select(&pub_sel).collect();

    if titles.len() != authors.len() || titles.len() != pub_info.len() {
        return Err(SourceError::Extraction(format!(
            "field count mismatch: {} titles, {} author blocks, {} pub-info blocks",
            titles.len(),
            authors.len(),
            pub_info.len()
        )));
    }

    let mut entries = Vec::new();
    for ((title_el, authors_el), pub_el) in titles.iter().zip(&authors).zip(&pub_info) {
        let title = collapse(&title_el.text().collect::<String>());
        if title.is_empty() {
            tracing::warn!("title heading with no text, skipping record");
            continue;
        }
        let link = title_el
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"));
        let Some(link) = link else {
            tracing::warn!(%title, "title without link, skipping record");
            continue;
        };
        entries.push(RawEntry {
            title,
            authors: vec![collapse(&authors_el.text().collect::<String>())],
            link: link.to_string(),
            pub_info: collapse(&pub_el.text().collect::<String>()),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LISTING: &str = r#"<html><body>
      <div class="article panel">
        <h5 class="title"><a href="/prb/abstract/10.1103/PhysRevB.111.045101">Quantum oscillations in WTe2</a></h5>
        <h6 class="authors">A. One, B. Two, and C. Three</h6>
        <h6 class="pub-info">Phys. Rev. B 111, 045101 (2025)</h6>
      </div>
      <div class="article panel">
        <h5 class="title"><a href="/prb/abstract/10.1103/PhysRevB.111.045102">Spin liquids on the kagome lattice</a></h5>
        <h6 class="authors">D. Four and E. Five</h6>
        <h6 class="pub-info">Phys. Rev. B 111, 045102 (2025)</h6>
      </div>
    </body></html>"#;

    #[test]
    fn test_parse_listing_page() {
        let entries = parse_listing_page(SAMPLE_LISTING).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Quantum oscillations in WTe2");
        assert_eq!(entries[0].authors, vec!["A. One, B. Two, and C. Three"]);
        assert_eq!(entries[0].link, "/prb/abstract/10.1103/PhysRevB.111.045101");
        assert_eq!(entries[1].pub_info, "Phys. Rev. B 111, 045102 (2025)");
    }

    #[test]
    fn test_mismatched_counts_reject_page() {
        // Two titles but only one author block: pairing would misalign.
        let html = r#"<html><body>
          <h5 class="title"><a href="/prb/a">First</a></h5>
          <h5 class="title"><a href="/prb/b">Second</a></h5>
          <h6 class="authors">Only Author</h6>
          <h6 class="pub-info">Phys. Rev. B 111, 1 (2025)</h6>
          <h6 class="pub-info">Phys. Rev. B 111, 2 (2025)</h6>
        </body></html>"#;
        let err = parse_listing_page(html).unwrap_err();
        assert!(matches!(err, SourceError::Extraction(_)));
    }

    #[test]
    fn test_decorated_title_headings_are_ignored() {
        let html = r#"<html><body>
          <h5 class="title sidebar">Most read</h5>
          <h5 class="title"><a href="/prb/a">Real paper</a></h5>
          <h6 class="authors">F. Author</h6>
          <h6 class="pub-info">Phys. Rev. B 111, 3 (2025)</h6>
        </body></html>"#;
        let entries = parse_listing_page(html).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Real paper");
        assert_eq!(entries[0].authors, vec!["F. Author"]);
    }

    #[test]
    fn test_extract_abstract_takes_first_paragraph() {
        let adapter = PhysRevAdapter::new(reqwest::Client::new());
        let html = "<html><body><p>We report  quantum\noscillations.</p><p>Later text.</p></body></html>";
        let text = adapter.extract_abstract(html).unwrap();
        assert_eq!(text, "We report quantum oscillations.");
    }

    #[test]
    fn test_extract_abstract_missing_paragraph() {
        let adapter = PhysRevAdapter::new(reqwest::Client::new());
        assert!(adapter.extract_abstract("<html><body></body></html>").is_err());
    }
}
