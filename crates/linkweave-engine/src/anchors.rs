//! Anchor-text mining from target page content.

use std::collections::HashMap;

use linkweave_core::defaults;

use crate::stopwords::StopWordsFilter;

/// Proposes short anchor phrases from a target page's cleaned text.
#[derive(Debug, Clone, Copy)]
pub struct AnchorMiner {
    stopwords: &'static StopWordsFilter,
    keyword_pool: usize,
}

impl AnchorMiner {
    pub fn new(stopwords: &'static StopWordsFilter) -> Self {
        Self {
            stopwords,
            keyword_pool: defaults::ANCHOR_KEYWORD_POOL,
        }
    }

    /// Top keywords of `text`, ranked by count descending then first
    /// occurrence. Stopwords and tokens of three characters or fewer are
    /// ignored.
    pub fn top_keywords(&self, text: &str) -> Vec<String> {
        // token -> (count, first position)
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (pos, token) in text.split_whitespace().enumerate() {
            if token.chars().count() <= defaults::ANCHOR_MIN_TOKEN_CHARS
                || self.stopwords.is_stop_word(token)
            {
                continue;
            }
            counts.entry(token).or_insert((0, pos)).0 += 1;
        }

        let mut ranked: Vec<(&str, usize, usize)> = counts
            .into_iter()
            .map(|(token, (count, first))| (token, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked
            .into_iter()
            .take(self.keyword_pool)
            .map(|(token, _, _)| token.to_string())
            .collect()
    }

    /// Up to `k` anchor candidates for linking to a page with `target_text`.
    ///
    /// `source_text` is accepted for symmetry with the link pair but does not
    /// influence ranking. Never pads: fewer keywords yield fewer candidates.
    pub fn suggest(&self, _source_text: &str, target_text: &str, k: usize) -> Vec<String> {
        if k == 0 {
            return Vec::new();
        }
        Self::candidates_from_keywords(&self.top_keywords(target_text), k)
    }

    /// Build candidates from already-ranked keywords.
    pub fn candidates_from_keywords(keywords: &[String], k: usize) -> Vec<String> {
        let Some(first) = keywords.first() else {
            return Vec::new();
        };
        let lead = capitalize(first);

        let mut candidates = vec![lead.clone()];
        if let Some(second) = keywords.get(1) {
            candidates.push(format!("{} {}", lead, second));
        }
        if let (Some(second), Some(third)) = (keywords.get(1), keywords.get(2)) {
            candidates.push(format!("{} {} {}", lead, second, third));
        }
        for keyword in keywords.iter().take(k).skip(candidates.len()) {
            candidates.push(capitalize(keyword));
        }
        candidates.truncate(k);
        candidates
    }
}

/// Uppercase the first character only.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkweave_core::StopwordLanguage;

    fn miner() -> AnchorMiner {
        AnchorMiner::new(StopWordsFilter::for_language(StopwordLanguage::French))
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("trail"), "Trail");
        assert_eq!(capitalize("été"), "Été");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_top_keywords_ranking() {
        let text = "trail chaussures running trail chaussures trail avec dans léger";
        let keywords = miner().top_keywords(text);
        assert_eq!(keywords, vec!["trail", "chaussures", "running", "léger"]);
    }

    #[test]
    fn test_short_tokens_counted_in_chars() {
        // "été" is three characters even though it is five bytes.
        let keywords = miner().top_keywords("été vélo sac");
        assert_eq!(keywords, vec!["vélo"]);
    }

    #[test]
    fn test_keyword_pool_is_bounded() {
        let text = (0..25)
            .map(|i| format!("motcle{:02}", i))
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(miner().top_keywords(&text).len(), 10);
    }

    #[test]
    fn test_suggest_three_shapes() {
        let anchors = miner().suggest("", "trail trail trail chaussures chaussures running", 3);
        assert_eq!(
            anchors,
            vec![
                "Trail",
                "Trail chaussures",
                "Trail chaussures running"
            ]
        );
    }

    #[test]
    fn test_suggest_fills_with_single_keywords() {
        let text = "alpha alpha alpha alpha alpha bravo bravo bravo bravo charlie charlie charlie delta delta echo";
        let anchors = miner().suggest("", text, 5);
        assert_eq!(
            anchors,
            vec![
                "Alpha",
                "Alpha bravo",
                "Alpha bravo charlie",
                "Delta",
                "Echo"
            ]
        );
    }

    #[test]
    fn test_suggest_truncates_and_never_pads() {
        let m = miner();
        assert_eq!(m.suggest("", "trail chaussures running", 1), vec!["Trail"]);
        assert_eq!(m.suggest("", "trail chaussures", 5).len(), 2);
        assert!(m.suggest("", "les des avec", 3).is_empty());
        assert!(m.suggest("", "trail chaussures", 0).is_empty());
    }

    #[test]
    fn test_anchor_count_bounded_by_k() {
        let m = miner();
        let text = "un deux trois quatre cinq sixieme septieme huitieme neuvieme dixieme onzieme";
        for k in 0..12 {
            assert!(m.suggest("", text, k).len() <= k);
        }
    }
}
