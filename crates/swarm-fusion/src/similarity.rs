//! Pluggable semantic similarity.
//!
//! Embedding is an external concern behind [`SimilarityProvider`]; the
//! engine only needs "embed a text" and "score two embeddings in [0, 1]".
//! [`HashedBagOfWords`] is the built-in default: a deterministic
//! token-hashing embedder that needs no model service. Deployments that
//! want true semantic grouping inject a provider backed by an embedding
//! model instead.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Fixed-size numeric vector associated 1:1 with a response text.
///
/// Computed lazily and cached for the duration of one fusion call only.
pub type Embedding = Vec<f32>;

/// Computes embeddings and similarity scores.
pub trait SimilarityProvider: Send + Sync {
    /// Embed a text into a numeric vector.
    fn embed(&self, text: &str) -> Embedding;

    /// Similarity between two embeddings, in [0, 1].
    fn similarity(&self, a: &Embedding, b: &Embedding) -> f64 {
        cosine_similarity(a, b)
    }
}

/// Cosine similarity between two vectors, clamped to [0, 1].
///
/// Mismatched lengths and zero vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    f64::from(dot_product / (magnitude_a * magnitude_b)).clamp(0.0, 1.0)
}

/// Default number of hash buckets for [`HashedBagOfWords`].
const DEFAULT_DIMENSIONS: usize = 512;

/// Deterministic token-hashing embedder.
///
/// Lowercases the text, splits on non-alphanumeric boundaries, and hashes
/// each token into a fixed-width count vector. Two texts sharing most of
/// their vocabulary score high under cosine similarity regardless of word
/// order. Purely lexical — no model service, no I/O, reproducible across
/// runs.
#[derive(Debug, Clone)]
pub struct HashedBagOfWords {
    dimensions: usize,
}

impl HashedBagOfWords {
    /// Create an embedder with the default vector width.
    pub fn new() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    /// Create an embedder with a custom vector width.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        (hasher.finish() as usize) % self.dimensions
    }
}

impl Default for HashedBagOfWords {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityProvider for HashedBagOfWords {
    fn embed(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            vector[self.bucket(token)] += 1.0;
        }
        vector
    }
}
