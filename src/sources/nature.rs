use super::{collapse, RawEntry, Source, SourceAdapter, SourceError};
use async_trait::async_trait;
use scraper::{Html, Selector};

const SEARCH_URL: &str =
    "https://www.nature.com/search?article_type=protocols%2Cresearch%2Creviews&subject=condensed-matter-physics";

/// Marker text on the list item that terminates an author run.
const NEW_WINDOW_SENTINEL: &str = "Opens in a new window";
/// Everything from this marker on is the rights notice, not publication info.
const RIGHTS_SENTINEL: &str = "Rights";
/// Upper bound on list items absorbed as authors when the terminating
/// sentinel never appears.
const AUTHOR_LOOKAHEAD: usize = 8;

/// Index of the abstract paragraph on an article detail page.
const ABSTRACT_PARAGRAPH_INDEX: usize = 1;

/// Nature subject search results.
///
/// Titles and links come from article anchors; author and publication
/// metadata have to be recovered from the flat sequence of list-item text
/// blocks surrounding each title.
pub struct NatureAdapter {
    client: reqwest::Client,
}

impl NatureAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for NatureAdapter {
    fn source(&self) -> Source {
        Source::Nature
    }

    async fn fetch_listing(&self, depth: u32) -> Result<Vec<RawEntry>, SourceError> {
        let mut entries = Vec::new();
        for page in 1..=depth.max(1) {
            tracing::debug!(page, "fetching Nature search results");
            let url = format!("{}&page={}", SEARCH_URL, page);
            let html = self
                .client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            match parse_search_page(&html) {
                Ok(page_entries) => entries.extend(page_entries),
                Err(e) => tracing::warn!(page, error = %e, "skipping Nature page"),
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

    fn extract_abstract(&self, html: &str) -> Result<String, SourceError> {
        let doc = Html::parse_document(html);
        let p_sel =
            Selector::parse("p").map_err(|e| SourceError::Extraction(format!("{:?}", e)))?;
        doc.select(&p_sel)
            .nth(ABSTRACT_PARAGRAPH_INDEX)
            .map(|p| collapse(&p.text().collect::<String>()))
            .ok_or_else(|| {
                SourceError::Extraction(format!(
                    "detail page has no paragraph at index {}",
                    ABSTRACT_PARAGRAPH_INDEX
                ))
            })
    }
}

fn parse_search_page(html: &str) -> Result<Vec<RawEntry>, SourceError> {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse(r#"a[href*="/articles/"]"#)
        .map_err(|e| SourceError::Extraction(format!("{:?}", e)))?;
    let li_sel =
        Selector::parse("li").map_err(|e| SourceError::Extraction(format!("{:?}", e)))?;

    let articles: Vec<(String, String)> = doc
        .select(&link_sel)
        .filter_map(|a| {
            let title = collapse(&a.text().collect::<String>());
            let href = a.value().attr("href")?;
            if title.is_empty() {
                return None;
            }
            Some((title, href.to_string()))
        })
        .collect();

    // Every list item carrying an author marker, in document order. The
    // headline block for an article contains its title; the items after it
    // are one author name each, up to the new-window indicator.
    let info_blocks: Vec<String> = doc
        .select(&li_sel)
        .filter(|li| li.html().contains("author"))
        .map(|li| collapse(&li.text().collect::<String>()))
        .collect();

    let mut entries = Vec::new();
    let mut cursor = 0usize;
    for (title, href) in articles {
        let block_idx = (cursor..info_blocks.len()).find(|&i| info_blocks[i].contains(&title));
        let Some(block_idx) = block_idx else {
            tracing::warn!(%title, "no info block for article, skipping record");
            continue;
        };
        cursor = block_idx + 1;

        let mut authors = Vec::new();
        for info in info_blocks.iter().skip(block_idx + 1).take(AUTHOR_LOOKAHEAD) {
            if info.contains(NEW_WINDOW_SENTINEL) {
                break;
            }
            authors.push(info.clone());
        }

        let block = &info_blocks[block_idx];
        let date = block
            .split(" | ")
            .nth(1)
            .and_then(|rest| rest.split(title.as_str()).next())
            .unwrap_or_default()
            .trim()
            .to_string();
        // The journal branch sits between the author run and the rights
        // notice in the headline block.
        let joined = authors.concat();
        let branch = if joined.is_empty() {
            ""
        } else {
            block
                .split(joined.as_str())
                .nth(1)
                .and_then(|rest| rest.split(RIGHTS_SENTINEL).next())
                .unwrap_or_default()
        }
        .trim()
        .to_string();

        // A truncated or empty author run leaves no branch to report; the
        // separating dash goes with it.
        let pub_info = if branch.is_empty() {
            format!("Published {}", date)
        } else {
            format!("{} \u{2013} Published {}", branch, date)
        };

        entries.push(RawEntry {
            title,
            authors,
            link: href,
            pub_info,
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SEARCH: &str = r#"<html><body>
      <ul class="app-article-list">
        <li class="article-item has-authors">Research | 12 August 2025Spin waves in kagome latticesJ. WillinghamM. ChenNature PhysicsRights &amp; permissionsOpens in a new window</li>
        <li class="author-item">J. Willingham</li>
        <li class="author-item">M. Chen</li>
        <li class="author-links">Opens in a new window</li>
        <li class="article-item has-authors">Review | 1 July 2025Topological magnons reviewedA. SoloNatureRights &amp; permissionsOpens in a new window</li>
        <li class="author-item">A. Solo</li>
        <li class="author-links">Opens in a new window</li>
      </ul>
      <h3><a href="/articles/s41586-025-00001">Spin waves in kagome lattices</a></h3>
      <h3><a href="/articles/s41586-025-00002">Topological magnons reviewed</a></h3>
    </body></html>"#;

    #[test]
    fn test_parse_search_page() {
        let entries = parse_search_page(SAMPLE_SEARCH).unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].title, "Spin waves in kagome lattices");
        assert_eq!(entries[0].authors, vec!["J. Willingham", "M. Chen"]);
        assert_eq!(entries[0].link, "/articles/s41586-025-00001");
        assert_eq!(
            entries[0].pub_info,
            "Nature Physics \u{2013} Published 12 August 2025"
        );

        assert_eq!(entries[1].authors, vec!["A. Solo"]);
        assert_eq!(entries[1].pub_info, "Nature \u{2013} Published 1 July 2025");
    }

    #[test]
    fn test_author_lookahead_is_bounded() {
        let mut html = String::from(
            r#"<html><body><ul>
            <li class="article-item author">Research | 2 June 2025Endless author listsNature</li>"#,
        );
        for i in 0..12 {
            html.push_str(&format!(r#"<li class="author-item">Author {}</li>"#, i));
        }
        html.push_str(
            r#"</ul><a href="/articles/s41586-025-00003">Endless author lists</a></body></html>"#,
        );
        let entries = parse_search_page(&html).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].authors.len(), AUTHOR_LOOKAHEAD);
        assert_eq!(entries[0].pub_info, "Published 2 June 2025");
    }

    #[test]
    fn test_empty_author_run_omits_branch_segment() {
        let html = r#"<html><body><ul>
          <li class="article-item author">News | 3 May 2025Quiet paperNature</li>
          <li class="author-links">Opens in a new window</li>
        </ul><a href="/articles/s41586-025-00005">Quiet paper</a></body></html>"#;
        let entries = parse_search_page(html).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].authors.is_empty());
        assert_eq!(entries[0].pub_info, "Published 3 May 2025");
    }

    #[test]
    fn test_article_without_info_block_is_skipped() {
        let html = r#"<html><body>
          <ul><li class="author-item">Stray Author</li></ul>
          <a href="/articles/s41586-025-00004">Orphan article</a>
        </body></html>"#;
        let entries = parse_search_page(html).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_extract_abstract_fixed_index() {
        let adapter = NatureAdapter::new(reqwest::Client::new());
        let html = "<html><body><p>Teaser.</p><p>The real  abstract.</p><p>Footer.</p></body></html>";
        assert_eq!(adapter.extract_abstract(html).unwrap(), "The real abstract.");
    }

    #[test]
    fn test_extract_abstract_too_few_paragraphs() {
        let adapter = NatureAdapter::new(reqwest::Client::new());
        assert!(adapter
            .extract_abstract("<html><body><p>Only one.</p></body></html>")
            .is_err());
    }
}
