//! Normalization of raw input rows into the engine's working set.
//!
//! Every string that is later compared (URLs, categories) goes through the
//! same normalizer here, so page URLs, existing-link endpoints and
//! performance keys agree.

use tracing::{debug, warn};
use url::Url;

use linkweave_core::{
    Category, ExistingLinks, Page, PerformanceMetric, PerformanceTable, RawLink,
    RawPageRecord, RawPerformanceRow,
};

/// Keyword groups checked in order; first substring hit wins.
const CATEGORY_KEYWORDS: &[(&[&str], Category)] = &[
    (&["categ"], Category::Categorie),
    (&["blog", "article", "post"], Category::Blog),
    (&["produit", "product"], Category::Produit),
];

/// Canonicalize a URL: host+path, lowercase, no scheme, no `www.`, no
/// query/fragment, no trailing slash, leading slash when a host is present.
///
/// Inputs without a scheme are treated as paths, except a leading `www.`
/// which marks a host. The function is idempotent.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let (host, path) = if trimmed.contains("://") {
        split_absolute(trimmed)
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        split_absolute(&format!("http://{}", rest))
    } else if trimmed
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("www."))
    {
        split_absolute(&format!("http://{}", trimmed))
    } else {
        (String::new(), strip_query(trimmed).to_string())
    };

    let mut normalized = format!("{}{}", host, path);
    while normalized.ends_with('/') {
        normalized.pop();
    }
    if !host.is_empty() && !normalized.starts_with('/') {
        normalized.insert(0, '/');
    }
    normalized.to_lowercase()
}

fn split_absolute(input: &str) -> (String, String) {
    match Url::parse(input) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            let host = host.strip_prefix("www.").unwrap_or(host);
            let host = match parsed.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };
            (host, parsed.path().to_string())
        }
        Err(e) => {
            debug!(error = %e, "Unparsable URL, keeping text after the scheme");
            let after_scheme = input.split_once("://").map_or(input, |(_, rest)| rest);
            (String::new(), strip_query(after_scheme).to_string())
        }
    }
}

fn strip_query(s: &str) -> &str {
    s.split(['?', '#']).next().unwrap_or_default()
}

/// Map a free-form segment label onto a category.
///
/// Blank labels become `unknown`; unmatched labels pass through lowercased.
pub fn normalize_category(raw: Option<&str>) -> Category {
    let label = raw.unwrap_or_default().trim().to_lowercase();
    if label.is_empty() {
        return Category::unknown();
    }
    for (keywords, category) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|k| label.contains(k)) {
            return category.clone();
        }
    }
    Category::from_label(&label)
}

/// Lowercase, replace anything neither alphanumeric nor whitespace with a
/// space, collapse whitespace runs, trim.
pub fn clean_text(text: &str) -> String {
    let replaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Primary content, followed by the secondary when it has any text.
pub fn merge_content(primary: &str, secondary: Option<&str>) -> String {
    match secondary {
        Some(extra) if !extra.trim().is_empty() => format!("{} {}", primary, extra),
        _ => primary.to_string(),
    }
}

/// Normalized pages plus the number of input rows that were excluded.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    pub pages: Vec<Page>,
    pub dropped: usize,
}

/// Build the working set. `raw_index` is assigned densely in input order
/// over the kept rows.
pub fn build_working_set(records: &[RawPageRecord]) -> WorkingSet {
    let mut pages = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for (row, record) in records.iter().enumerate() {
        let primary = match record.content_primary.as_deref() {
            Some(p) if !p.trim().is_empty() => p,
            _ => {
                dropped += 1;
                continue;
            }
        };
        let cleaned = clean_text(&merge_content(primary, record.content_secondary.as_deref()));
        if cleaned.is_empty() {
            dropped += 1;
            continue;
        }
        pages.push(Page {
            url: normalize_url(record.url.as_deref().unwrap_or_default()),
            category: normalize_category(record.category.as_deref()),
            cleaned_text: cleaned,
            raw_index: pages.len(),
            input_row: row,
        });
    }

    if dropped > 0 {
        warn!(
            dropped_count = dropped,
            page_count = pages.len(),
            "Rows without usable content were excluded"
        );
    }
    WorkingSet { pages, dropped }
}

/// Index existing links by canonical source URL.
pub fn index_links(links: &[RawLink]) -> ExistingLinks {
    let mut index = ExistingLinks::new();
    for link in links {
        index.insert(
            normalize_url(&link.source_url),
            normalize_url(&link.destination_url),
        );
    }
    index
}

/// Index performance rows by canonical URL.
pub fn index_performance(rows: &[RawPerformanceRow]) -> PerformanceTable {
    let mut table = PerformanceTable::new();
    for row in rows {
        table.insert(
            normalize_url(&row.url),
            PerformanceMetric {
                clicks: row.clicks,
                impressions: row.impressions,
                position: row.position,
            },
        );
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, category: &str, primary: Option<&str>, secondary: Option<&str>) -> RawPageRecord {
        RawPageRecord {
            url: Some(url.to_string()),
            category: Some(category.to_string()),
            content_primary: primary.map(String::from),
            content_secondary: secondary.map(String::from),
        }
    }

    #[test]
    fn test_normalize_url_absolute() {
        assert_eq!(
            normalize_url("https://www.Example.com/Blog/Trail/"),
            "/example.com/blog/trail"
        );
        assert_eq!(
            normalize_url("http://example.com/a?utm=1#top"),
            "/example.com/a"
        );
        assert_eq!(normalize_url("https://example.com/"), "/example.com");
        assert_eq!(normalize_url("https://example.com:8080/x"), "/example.com:8080/x");
    }

    #[test]
    fn test_normalize_url_relative_and_missing() {
        assert_eq!(normalize_url("/Produits/Chaussure/"), "/produits/chaussure");
        assert_eq!(normalize_url("page?x=1"), "page");
        assert_eq!(normalize_url(""), "");
        assert_eq!(normalize_url("   "), "");
        assert_eq!(normalize_url("/"), "");
    }

    #[test]
    fn test_normalize_url_schemeless_host() {
        assert_eq!(normalize_url("www.example.com/a/"), "/example.com/a");
        assert_eq!(normalize_url("//www.example.com/a"), "/example.com/a");
        assert_eq!(
            normalize_url("www.example.com/a"),
            normalize_url("https://www.example.com/a")
        );
    }

    #[test]
    fn test_normalize_url_idempotent() {
        let inputs = [
            "https://www.Example.com/Blog/Trail/",
            "http://example.com:8080/a/b/",
            "www.shop.fr/Produit",
            "//cdn.example.com/x",
            "/relative/path/",
            "plain",
            "https://example.com/",
            "",
        ];
        for input in inputs {
            let once = normalize_url(input);
            assert_eq!(normalize_url(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_normalize_category_keyword_order() {
        assert_eq!(normalize_category(Some("Blog-Post")), Category::Blog);
        assert_eq!(normalize_category(Some(" Article ")), Category::Blog);
        assert_eq!(normalize_category(Some("Categories")), Category::Categorie);
        assert_eq!(normalize_category(Some("product category")), Category::Categorie);
        assert_eq!(normalize_category(Some("Produits")), Category::Produit);
        assert_eq!(normalize_category(Some("Product")), Category::Produit);
    }

    #[test]
    fn test_normalize_category_passthrough_and_blank() {
        assert_eq!(
            normalize_category(Some("Landing Page")),
            Category::Other("landing page".to_string())
        );
        assert_eq!(normalize_category(Some("  ")), Category::unknown());
        assert_eq!(normalize_category(None), Category::unknown());
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("  Chaussures de TRAIL: légères & robustes!! "),
            "chaussures de trail légères robustes"
        );
        assert_eq!(clean_text("a\t\nb"), "a b");
        assert_eq!(clean_text("!!!"), "");
    }

    #[test]
    fn test_clean_text_ascii_alphabet() {
        let cleaned = clean_text("Hello, World! 42 -- <b>Tags</b> & more_stuff.");
        assert!(!cleaned.is_empty());
        assert!(cleaned
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' '));
        assert!(!cleaned.contains("  "));
    }

    #[test]
    fn test_merge_content() {
        assert_eq!(merge_content("a", Some("b")), "a b");
        assert_eq!(merge_content("a", Some("  ")), "a");
        assert_eq!(merge_content("a", None), "a");
    }

    #[test]
    fn test_build_working_set_drops_empty_rows() {
        let records = vec![
            record("/a", "blog", Some("Trail running"), None),
            record("/b", "blog", None, Some("ignored")),
            record("/c", "blog", Some("  "), None),
            record("/d", "blog", Some("?!"), None),
            record("/e", "produit", Some("Chaussure"), Some("légère")),
        ];
        let set = build_working_set(&records);
        assert_eq!(set.dropped, 3);
        assert_eq!(set.pages.len(), 2);

        assert_eq!(set.pages[0].raw_index, 0);
        assert_eq!(set.pages[0].input_row, 0);
        assert_eq!(set.pages[1].raw_index, 1);
        assert_eq!(set.pages[1].input_row, 4);
        assert_eq!(set.pages[1].cleaned_text, "chaussure légère");
        assert!(set.pages.iter().all(|p| !p.cleaned_text.is_empty()));
    }

    #[test]
    fn test_missing_url_becomes_empty() {
        let records = vec![RawPageRecord {
            url: None,
            category: None,
            content_primary: Some("text".into()),
            content_secondary: None,
        }];
        let set = build_working_set(&records);
        assert_eq!(set.pages[0].url, "");
        assert_eq!(set.pages[0].category, Category::unknown());
    }

    #[test]
    fn test_index_links_normalizes_both_ends() {
        let links = index_links(&[RawLink {
            source_url: "https://www.site.fr/A/".into(),
            destination_url: "https://site.fr/B".into(),
        }]);
        assert!(links.contains("/site.fr/a", "/site.fr/b"));
    }

    #[test]
    fn test_index_performance_normalizes_keys() {
        let table = index_performance(&[RawPerformanceRow {
            url: "https://www.site.fr/B/".into(),
            clicks: 20,
            impressions: 300,
            position: 3.5,
        }]);
        assert_eq!(table.get("/site.fr/b").map(|m| m.clicks), Some(20));
    }
}
