//! Converts adapter-extracted raw fragments into canonical `Paper` records.
//! Pure transforms only; no network or parsing side effects.

use crate::sources::{Paper, RawEntry, Source};

/// Join author fragments with comma/`and` punctuation: `"a"`, `"a and b"`,
/// `"a, b, and c"`. A single fragment passes through unchanged, which also
/// covers sources that list all authors in one pre-joined block.
pub fn join_authors(fragments: &[String]) -> String {
    let names: Vec<&str> = fragments
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    match names.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{} and {}", first, second),
        [rest @ .., last] => {
            let mut joined = rest.join(", ");
            joined.push_str(", and ");
            joined.push_str(last);
            joined
        }
    }
}

/// Prefix the source host when the adapter yields a relative detail link.
pub fn canonical_link(source: Source, raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    let host = match source {
        Source::PhysRevB => "https://journals.aps.org",
        Source::Nature => "https://www.nature.com",
        Source::Arxiv => "https://arxiv.org",
    };
    if raw.starts_with('/') {
        format!("{}{}", host, raw)
    } else {
        format!("{}/{}", host, raw)
    }
}

fn pub_info_suffix(source: Source) -> &'static str {
    match source {
        // New-submission listings carry no date of their own.
        Source::Arxiv => " \u{2013} Recent",
        _ => "",
    }
}

pub fn normalize(source: Source, raw: RawEntry) -> Paper {
    Paper {
        authors: join_authors(&raw.authors),
        link: canonical_link(source, &raw.link),
        pub_info: format!("{}{}", raw.pub_info, pub_info_suffix(source)),
        title: raw.title,
        abstract_text: None,
        source,
    }
}
