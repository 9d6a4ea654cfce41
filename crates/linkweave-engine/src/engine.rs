//! The recommendation pipeline entry point.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use linkweave_core::{
    AnalysisConfig, AnalysisInput, EmbeddingBackend, Error, Progress, Result, Suggestion,
};

use crate::allocator::LinkAllocator;
use crate::anchors::AnchorMiner;
use crate::assemble::assemble;
use crate::boost::BoostPolicy;
use crate::embedder::Embedder;
use crate::preprocess::{build_working_set, index_links, index_performance};
use crate::similarity::SimilarityMatrix;
use crate::stopwords::StopWordsFilter;

/// Internal-link recommendation engine.
///
/// The embedding backend is checked once in [`LinkEngine::new`] and reused by
/// every [`LinkEngine::analyze`] call. Engines are `Send + Sync` and can be
/// shared behind an `Arc`.
#[derive(Clone)]
pub struct LinkEngine {
    embedder: Embedder,
    boost: BoostPolicy,
}

impl LinkEngine {
    /// Create an engine, probing the backend for reachability and dimension.
    pub async fn new(backend: Arc<dyn EmbeddingBackend>) -> Result<Self> {
        let embedder = Embedder::new(backend);
        embedder.verify_backend().await?;
        Ok(Self {
            embedder,
            boost: BoostPolicy::default(),
        })
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Run the full pipeline over one input snapshot.
    ///
    /// Input-contract violations fail before any embedding work. The result
    /// is grouped by source URL (first-encounter order), each group sorted by
    /// final score descending.
    #[instrument(skip(self, input, config, progress), fields(subsystem = "engine", component = "engine", op = "analyze", input_count = input.pages.len()))]
    pub async fn analyze(
        &self,
        input: AnalysisInput,
        config: &AnalysisConfig,
        progress: &Progress,
    ) -> Result<Vec<Suggestion>> {
        let start = Instant::now();
        config.validate()?;
        if input.pages.is_empty() {
            return Err(Error::InvalidInput("content table is empty".into()));
        }

        progress.report("Initializing analysis", 0, 5);
        let row_count = input.pages.len();
        progress.report(&format!("Content table received ({} pages)", row_count), 1, 5);

        let existing = index_links(&input.links);
        progress.report(
            &format!("Existing links indexed ({} links)", existing.len()),
            2,
            5,
        );

        let performance = index_performance(&input.performance);
        progress.report(
            &format!("Performance table indexed ({} entries)", performance.len()),
            3,
            5,
        );

        progress.report("Preprocessing content", 4, 5);
        let working_set = build_working_set(&input.pages);
        let pages = working_set.pages;
        let n = pages.len();
        progress.report(
            &format!("Preprocessing finished ({}/{} pages kept)", n, row_count),
            5,
            5,
        );
        if n == 0 {
            return Err(Error::InvalidInput(format!(
                "none of the {} content rows has usable text",
                row_count
            )));
        }
        debug!(
            page_count = n,
            dropped_count = working_set.dropped,
            link_count = existing.len(),
            performance_count = performance.len(),
            "Working set built"
        );

        progress.report(&format!("Preparing embeddings for {} pages", n), 0, n);
        let texts: Vec<String> = pages.iter().map(|p| p.cleaned_text.clone()).collect();
        let vectors = self.embedder.embed_all(&texts, progress).await?;
        if vectors.len() != n {
            return Err(Error::Inconsistency(format!(
                "{} vectors for {} pages",
                vectors.len(),
                n
            )));
        }

        progress.report("Computing similarity matrix", 0, 1);
        let matrix = SimilarityMatrix::from_vectors(&vectors)?;
        progress.report(&format!("Similarity matrix computed ({}x{})", n, n), 1, 1);
        LinkAllocator::check_alignment(&pages, &matrix)?;

        let allocator = LinkAllocator::new(
            config.min_similarity,
            config.default_link_cap,
            config.linking_rules.as_ref(),
        );
        let miner = AnchorMiner::new(StopWordsFilter::for_language(config.stopword_language));
        let mut keyword_cache: HashMap<usize, Vec<String>> = HashMap::new();
        let mut suggestions = Vec::new();

        progress.report(&format!("Analyzing {} pages", n), 0, n);
        for (i, source) in pages.iter().enumerate() {
            let candidates = allocator.allocate(source, &pages, &matrix, &existing)?;
            for candidate in &candidates {
                let target = &pages[candidate.target];
                let keywords = keyword_cache
                    .entry(candidate.target)
                    .or_insert_with(|| miner.top_keywords(&target.cleaned_text));
                let anchors =
                    AnchorMiner::candidates_from_keywords(keywords, config.anchor_suggestions);
                suggestions.push(Suggestion {
                    source_url: source.url.clone(),
                    source_category: source.category.clone(),
                    target_url: target.url.clone(),
                    target_category: target.category.clone(),
                    similarity_score: candidate.similarity,
                    final_score: self
                        .boost
                        .apply(candidate.similarity, performance.get(&target.url)),
                    anchor_candidates: anchors,
                });
            }
            progress.report(
                &format!(
                    "Analyzed page {}/{} ({} suggestions)",
                    i + 1,
                    n,
                    candidates.len()
                ),
                i + 1,
                n,
            );
        }

        progress.report("Assembling results", 0, 1);
        let assembled = assemble(suggestions);
        progress.report("Analysis complete", 1, 1);

        info!(
            model = self.model_name(),
            page_count = n,
            dropped_count = working_set.dropped,
            suggestion_count = assembled.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );
        Ok(assembled)
    }
}
