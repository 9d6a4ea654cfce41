//! Mock embedding backend for deterministic testing.
//!
//! Generates deterministic embeddings from text content, with optional fixed
//! vectors for exact texts so tests can control pairwise similarity.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use linkweave_inference::mock::MockEmbeddingBackend;
//!
//! let backend = MockEmbeddingBackend::new()
//!     .with_dimension(3)
//!     .with_vector("chaussures trail", vec![1.0, 0.0, 0.0]);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use linkweave_core::{EmbeddingBackend, Error, Result, Vector};

/// Mock embedding backend for testing.
#[derive(Clone)]
pub struct MockEmbeddingBackend {
    config: Arc<MockConfig>,
    batch_log: Arc<Mutex<Vec<usize>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    fixed_vectors: HashMap<String, Vector>,
    healthy: bool,
    fail_embeddings: bool,
    drop_last_vector: bool,
    latency_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            fixed_vectors: HashMap::new(),
            healthy: true,
            fail_embeddings: false,
            drop_last_vector: false,
            latency_ms: 0,
        }
    }
}

impl MockEmbeddingBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            batch_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        Arc::make_mut(&mut self.config).dimension = dimension;
        self
    }

    /// Return `vector` verbatim whenever exactly `text` is embedded.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vector) -> Self {
        Arc::make_mut(&mut self.config)
            .fixed_vectors
            .insert(text.into(), vector);
        self
    }

    /// Report the backend as unreachable from `health_check`.
    pub fn unhealthy(mut self) -> Self {
        Arc::make_mut(&mut self.config).healthy = false;
        self
    }

    /// Make every `embed_texts` call fail.
    pub fn failing(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_embeddings = true;
        self
    }

    /// Return one vector fewer than requested from every non-empty batch.
    pub fn dropping_last_vector(mut self) -> Self {
        Arc::make_mut(&mut self.config).drop_last_vector = true;
        self
    }

    /// Set simulated latency for every embedding call.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Sizes of every batch received, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Number of `embed_texts` calls received.
    pub fn embed_call_count(&self) -> usize {
        self.batch_sizes().len()
    }

    fn vector_for(&self, text: &str) -> Vector {
        match self.config.fixed_vectors.get(text) {
            Some(v) => v.clone(),
            None => MockEmbeddingGenerator::generate(text, self.config.dimension),
        }
    }
}

impl Default for MockEmbeddingBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbeddingBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if let Ok(mut log) = self.batch_log.lock() {
            log.push(texts.len());
        }
        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }
        if self.config.fail_embeddings {
            return Err(Error::Embedding("Simulated failure for testing".into()));
        }

        let mut vectors: Vec<Vector> = texts.iter().map(|t| self.vector_for(t)).collect();
        if self.config.drop_last_vector {
            vectors.pop();
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.config.healthy)
    }
}

/// Mock embedding generator with deterministic output.
pub struct MockEmbeddingGenerator;

impl MockEmbeddingGenerator {
    /// Generate a deterministic embedding from text.
    ///
    /// Uses character-based hashing for reproducibility. The same text
    /// will always produce the same embedding.
    pub fn generate(text: &str, dimension: usize) -> Vector {
        let mut vec = vec![0.0; dimension];
        if dimension == 0 {
            return vec;
        }

        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % dimension;
            vec[idx] += 0.1;
        }

        Self::normalize(&mut vec);
        vec
    }

    fn normalize(vec: &mut [f32]) {
        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vec.iter_mut().for_each(|x| *x /= magnitude);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_mock_backend_embed() {
        let backend = MockEmbeddingBackend::new().with_dimension(128);
        let texts = vec!["hello world".to_string(), "bonjour".to_string()];
        let vectors = backend.embed_texts(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == 128));
        assert_eq!(backend.batch_sizes(), vec![2]);
    }

    #[test]
    fn test_generator_is_deterministic_and_normalized() {
        let a = MockEmbeddingGenerator::generate("trail running", 64);
        let b = MockEmbeddingGenerator::generate("trail running", 64);
        assert_eq!(a, b);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_generator_empty_text_is_zero_vector() {
        let v = MockEmbeddingGenerator::generate("", 16);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_fixed_vectors_win() {
        let backend = MockEmbeddingBackend::new()
            .with_dimension(3)
            .with_vector("a", vec![1.0, 0.0, 0.0]);
        let vectors = backend
            .embed_texts(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(vectors[1].len(), 3);
    }

    #[tokio::test]
    async fn test_failure_modes() {
        let failing = MockEmbeddingBackend::new().failing();
        assert!(matches!(
            failing.embed_texts(&["x".to_string()]).await,
            Err(Error::Embedding(_))
        ));

        let short = MockEmbeddingBackend::new().dropping_last_vector();
        let vectors = short
            .embed_texts(&["x".to_string(), "y".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 1);

        assert!(!MockEmbeddingBackend::new().unhealthy().health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_clones_share_call_log() {
        let backend = MockEmbeddingBackend::new();
        let clone = backend.clone();
        clone.embed_texts(&["x".to_string()]).await.unwrap();
        assert_eq!(backend.embed_call_count(), 1);
    }
}
