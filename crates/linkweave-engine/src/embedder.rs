//! Batched embedding of cleaned page text.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use linkweave_core::{defaults, EmbeddingBackend, Error, Progress, Result, Vector};

/// Wraps a shared backend and enforces one vector per input text.
#[derive(Clone)]
pub struct Embedder {
    backend: Arc<dyn EmbeddingBackend>,
    batch_size: usize,
}

impl Embedder {
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self {
            backend,
            batch_size: defaults::EMBED_BATCH_SIZE,
        }
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Check the backend is reachable and emits vectors of its declared
    /// dimension. Run once, before the first analysis.
    #[instrument(skip(self), fields(subsystem = "engine", component = "embedder", op = "verify_backend", model = %self.backend.model_name()))]
    pub async fn verify_backend(&self) -> Result<()> {
        if !self.backend.health_check().await? {
            return Err(Error::Embedding(format!(
                "embedding backend for {} is unreachable",
                self.backend.model_name()
            )));
        }

        let sample = self.backend.embed_texts(&["linkweave".to_string()]).await?;
        let expected = self.backend.dimension();
        match sample.as_slice() {
            [v] if v.len() == expected => {
                info!(dimension = expected, "Embedding backend ready");
                Ok(())
            }
            [v] => Err(Error::Config(format!(
                "model {} returned {}-dimensional vectors, configured dimension is {}",
                self.backend.model_name(),
                v.len(),
                expected
            ))),
            other => Err(Error::Inconsistency(format!(
                "backend check returned {} vectors for 1 text",
                other.len()
            ))),
        }
    }

    /// Embed every text in fixed-size batches, reporting progress after each.
    #[instrument(skip(self, texts, progress), fields(subsystem = "engine", component = "embedder", op = "embed_all", input_count = texts.len()))]
    pub async fn embed_all(&self, texts: &[String], progress: &Progress) -> Result<Vec<Vector>> {
        let total = texts.len();
        let start = Instant::now();
        let mut vectors: Vec<Vector> = Vec::with_capacity(total);

        for batch in texts.chunks(self.batch_size) {
            let embedded = self.backend.embed_texts(batch).await?;
            if embedded.len() != batch.len() {
                return Err(Error::Inconsistency(format!(
                    "backend returned {} vectors for a batch of {} texts",
                    embedded.len(),
                    batch.len()
                )));
            }
            vectors.extend(embedded);
            let done = vectors.len();
            progress.report(
                &format!("Generating embeddings ({}/{} pages)", done, total),
                done,
                total,
            );
        }

        if vectors.len() != total {
            return Err(Error::Inconsistency(format!(
                "{} vectors generated for {} texts",
                vectors.len(),
                total
            )));
        }
        if let Some(first) = vectors.first() {
            let dim = first.len();
            if let Some(pos) = vectors.iter().position(|v| v.len() != dim) {
                return Err(Error::Inconsistency(format!(
                    "vector {} has length {}, expected {}",
                    pos,
                    vectors[pos].len(),
                    dim
                )));
            }
        }

        debug!(
            result_count = vectors.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "All embeddings generated"
        );
        Ok(vectors)
    }
}
