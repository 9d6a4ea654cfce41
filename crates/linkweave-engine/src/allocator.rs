//! Rule-constrained selection of link targets.

use tracing::trace;

use linkweave_core::{Error, ExistingLinks, Page, Result, RuleTable};

use crate::similarity::SimilarityMatrix;

/// One accepted target for a source page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// `raw_index` of the target page.
    pub target: usize,
    /// Raw cosine similarity between source and target.
    pub similarity: f32,
}

/// Selects targets for each source page.
///
/// With a rule table that names the source's category, each
/// `(source, target category)` rule is applied independently and capped at
/// `max_links`; `min_links` is advisory and never padded to. Otherwise all
/// other pages compete for `default_cap` slots.
#[derive(Debug, Clone, Copy)]
pub struct LinkAllocator<'a> {
    rules: Option<&'a RuleTable>,
    min_similarity: f32,
    default_cap: usize,
}

impl<'a> LinkAllocator<'a> {
    /// An empty rule table behaves like no table.
    pub fn new(min_similarity: f32, default_cap: usize, rules: Option<&'a RuleTable>) -> Self {
        Self {
            rules: rules.filter(|r| !r.is_empty()),
            min_similarity,
            default_cap,
        }
    }

    /// Verify that `pages[k].raw_index == k` and the matrix covers every page.
    pub fn check_alignment(pages: &[Page], matrix: &SimilarityMatrix) -> Result<()> {
        matrix.check_dimension(pages.len())?;
        if let Some((k, page)) = pages.iter().enumerate().find(|(k, p)| p.raw_index != *k) {
            return Err(Error::Inconsistency(format!(
                "page at position {} ({}) carries raw_index {}",
                k, page.url, page.raw_index
            )));
        }
        Ok(())
    }

    /// Accepted targets for `source`, in allocation order.
    pub fn allocate(
        &self,
        source: &Page,
        pages: &[Page],
        matrix: &SimilarityMatrix,
        existing: &ExistingLinks,
    ) -> Result<Vec<Candidate>> {
        match self.rules {
            Some(rules) if rules.has_source(&source.category) => {
                let mut accepted = Vec::new();
                for (target_category, rule) in rules.targets_of(&source.category) {
                    if rule.is_disabled() {
                        continue;
                    }
                    let mut scored = score_targets(source, pages, matrix, |p| {
                        &p.category == target_category
                    })?;
                    sort_descending(&mut scored);
                    scored.retain(|s| s.similarity >= self.min_similarity);
                    scored.truncate(rule.max_links);
                    let before = accepted.len();
                    accepted.extend(drop_existing(source, existing, scored));
                    trace!(
                        source = %source.url,
                        target_category = %target_category,
                        accepted = accepted.len() - before,
                        min_links = rule.min_links,
                        max_links = rule.max_links,
                        "Rule applied"
                    );
                }
                Ok(accepted)
            }
            _ => {
                let mut scored = score_targets(source, pages, matrix, |_| true)?;
                scored.retain(|s| s.similarity >= self.min_similarity);
                sort_descending(&mut scored);
                scored.truncate(self.default_cap);
                Ok(drop_existing(source, existing, scored))
            }
        }
    }
}

struct Scored<'p> {
    page: &'p Page,
    similarity: f32,
}

fn is_self(source: &Page, other: &Page) -> bool {
    other.raw_index == source.raw_index || other.url == source.url
}

fn score_targets<'p, F>(
    source: &Page,
    pages: &'p [Page],
    matrix: &SimilarityMatrix,
    keep: F,
) -> Result<Vec<Scored<'p>>>
where
    F: Fn(&Page) -> bool,
{
    pages
        .iter()
        .filter(|p| keep(p) && !is_self(source, p))
        .map(|p| {
            Ok(Scored {
                page: p,
                similarity: matrix.get(source.raw_index, p.raw_index)?,
            })
        })
        .collect()
}

/// Stable: ties keep input order.
fn sort_descending(scored: &mut [Scored<'_>]) {
    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
}

fn drop_existing(source: &Page, existing: &ExistingLinks, scored: Vec<Scored<'_>>) -> Vec<Candidate> {
    scored
        .into_iter()
        .filter(|s| {
            let linked = existing.contains(&source.url, &s.page.url);
            if linked {
                trace!(source = %source.url, target = %s.page.url, "Already linked");
            }
            !linked
        })
        .map(|s| Candidate {
            target: s.page.raw_index,
            similarity: s.similarity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkweave_core::{Category, LinkingRule};

    fn page(i: usize, url: &str, category: Category) -> Page {
        Page {
            url: url.to_string(),
            category,
            cleaned_text: format!("text {}", i),
            raw_index: i,
            input_row: i,
        }
    }

    /// Matrix from explicit 2D vectors.
    fn matrix(vectors: &[[f32; 2]]) -> SimilarityMatrix {
        let v: Vec<Vec<f32>> = vectors.iter().map(|a| a.to_vec()).collect();
        SimilarityMatrix::from_vectors(&v).unwrap()
    }

    fn targets(c: &[Candidate]) -> Vec<usize> {
        c.iter().map(|c| c.target).collect()
    }

    #[test]
    fn test_unconstrained_sorted_and_capped() {
        let pages: Vec<Page> = (0..5)
            .map(|i| page(i, &format!("/p{}", i), Category::Blog))
            .collect();
        // Angles from page 0 grow with index.
        let m = matrix(&[[1.0, 0.0], [1.0, 0.1], [1.0, 0.5], [1.0, 1.0], [0.0, 1.0]]);
        let alloc = LinkAllocator::new(0.2, 2, None);
        let got = alloc
            .allocate(&pages[0], &pages, &m, &ExistingLinks::new())
            .unwrap();
        assert_eq!(targets(&got), vec![1, 2]);
        assert!(got[0].similarity >= got[1].similarity);
    }

    #[test]
    fn test_below_threshold_dropped() {
        let pages = vec![
            page(0, "/a", Category::Blog),
            page(1, "/b", Category::Blog),
        ];
        let m = matrix(&[[1.0, 0.0], [0.0, 1.0]]);
        let alloc = LinkAllocator::new(0.2, 5, None);
        assert!(alloc
            .allocate(&pages[0], &pages, &m, &ExistingLinks::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_same_url_is_self() {
        let pages = vec![
            page(0, "/dup", Category::Blog),
            page(1, "/dup", Category::Blog),
            page(2, "/other", Category::Blog),
        ];
        let m = matrix(&[[1.0, 0.0], [1.0, 0.0], [1.0, 0.2]]);
        let alloc = LinkAllocator::new(0.0, 5, None);
        let got = alloc
            .allocate(&pages[0], &pages, &m, &ExistingLinks::new())
            .unwrap();
        assert_eq!(targets(&got), vec![2]);
    }

    #[test]
    fn test_existing_links_dropped_after_cap() {
        let pages = vec![
            page(0, "/a", Category::Blog),
            page(1, "/b", Category::Blog),
            page(2, "/c", Category::Blog),
        ];
        let m = matrix(&[[1.0, 0.0], [1.0, 0.1], [1.0, 0.3]]);
        let mut existing = ExistingLinks::new();
        existing.insert("/a".into(), "/b".into());
        let alloc = LinkAllocator::new(0.0, 1, None);
        // Cap applies before the existing-link filter, so the slot is lost.
        let got = alloc.allocate(&pages[0], &pages, &m, &existing).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn test_rules_cap_each_target_category() {
        let pages = vec![
            page(0, "/blog-0", Category::Blog),
            page(1, "/blog-1", Category::Blog),
            page(2, "/blog-2", Category::Blog),
            page(3, "/prod-3", Category::Produit),
            page(4, "/prod-4", Category::Produit),
        ];
        let m = matrix(&[[1.0, 0.0], [1.0, 0.1], [1.0, 0.2], [1.0, 0.3], [1.0, 0.4]]);
        let mut rules = RuleTable::new();
        rules
            .set_rule(Category::Blog, Category::Blog, LinkingRule::new(0, 1))
            .unwrap();
        rules
            .set_rule(Category::Blog, Category::Produit, LinkingRule::new(1, 2))
            .unwrap();
        let alloc = LinkAllocator::new(0.0, 5, Some(&rules));
        let got = alloc
            .allocate(&pages[0], &pages, &m, &ExistingLinks::new())
            .unwrap();
        assert_eq!(targets(&got), vec![1, 3, 4]);
    }

    #[test]
    fn test_disabled_rule_and_unknown_source() {
        let pages = vec![
            page(0, "/a", Category::Blog),
            page(1, "/b", Category::Blog),
            page(2, "/c", Category::Other("faq".into())),
        ];
        let m = matrix(&[[1.0, 0.0], [1.0, 0.1], [1.0, 0.2]]);
        let mut rules = RuleTable::new();
        rules
            .set_rule(Category::Blog, Category::Blog, LinkingRule::new(0, 0))
            .unwrap();
        let alloc = LinkAllocator::new(0.0, 5, Some(&rules));

        let from_blog = alloc
            .allocate(&pages[0], &pages, &m, &ExistingLinks::new())
            .unwrap();
        assert!(from_blog.is_empty());

        // "faq" has no rules: unconstrained path.
        let from_faq = alloc
            .allocate(&pages[2], &pages, &m, &ExistingLinks::new())
            .unwrap();
        assert_eq!(targets(&from_faq), vec![1, 0]);
    }

    #[test]
    fn test_empty_rule_table_is_unconstrained() {
        let pages = vec![
            page(0, "/a", Category::Blog),
            page(1, "/b", Category::Produit),
        ];
        let m = matrix(&[[1.0, 0.0], [1.0, 0.1]]);
        let rules = RuleTable::new();
        let alloc = LinkAllocator::new(0.0, 5, Some(&rules));
        let got = alloc
            .allocate(&pages[0], &pages, &m, &ExistingLinks::new())
            .unwrap();
        assert_eq!(targets(&got), vec![1]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let pages: Vec<Page> = (0..4)
            .map(|i| page(i, &format!("/p{}", i), Category::Blog))
            .collect();
        let m = matrix(&[[1.0, 0.0], [1.0, 1.0], [1.0, 1.0], [1.0, 1.0]]);
        let alloc = LinkAllocator::new(0.0, 5, None);
        let got = alloc
            .allocate(&pages[0], &pages, &m, &ExistingLinks::new())
            .unwrap();
        assert_eq!(targets(&got), vec![1, 2, 3]);
    }

    #[test]
    fn test_alignment_checks() {
        let m = matrix(&[[1.0, 0.0], [0.0, 1.0]]);
        let good = vec![page(0, "/a", Category::Blog), page(1, "/b", Category::Blog)];
        assert!(LinkAllocator::check_alignment(&good, &m).is_ok());

        let shifted = vec![page(0, "/a", Category::Blog), page(2, "/b", Category::Blog)];
        assert!(matches!(
            LinkAllocator::check_alignment(&shifted, &m),
            Err(Error::Inconsistency(_))
        ));

        let short = vec![page(0, "/a", Category::Blog)];
        assert!(LinkAllocator::check_alignment(&short, &m).is_err());
    }

    #[test]
    fn test_misaligned_page_lookup_is_fatal() {
        let m = matrix(&[[1.0, 0.0], [0.0, 1.0]]);
        let pages = vec![page(0, "/a", Category::Blog), page(7, "/b", Category::Blog)];
        let alloc = LinkAllocator::new(0.0, 5, None);
        let err = alloc
            .allocate(&pages[0], &pages, &m, &ExistingLinks::new())
            .unwrap_err();
        assert!(matches!(err, Error::Inconsistency(_)));
    }
}
