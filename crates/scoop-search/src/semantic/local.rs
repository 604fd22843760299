//! Deterministic in-process embedding model.
//!
//! Hashes normalized unigrams and adjacent-term bigrams into a fixed number
//! of signed buckets, then L2-normalizes. Uses the same term normalization as
//! the lexical index, so two texts sharing vocabulary land close together.
//! Good enough for offline runs and tests; the remote provider is the
//! production choice.

use scoop_core::text::normalize_terms;
use sha2::{Digest, Sha256};

use super::embed::{EmbedError, Embedder};

/// Model id recorded for stores built by [`HashedEmbedder`].
pub const MODEL_ID: &str = "hashed-bow-v1";
const BIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dimension: usize,
}

impl HashedEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Embed without the fallible trait wrapper.
    #[must_use]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        let terms = normalize_terms(text);

        for term in &terms {
            self.accumulate(&mut vector, term, 1.0);
        }
        for pair in terms.windows(2) {
            self.accumulate(&mut vector, &format!("{} {}", pair[0], pair[1]), BIGRAM_WEIGHT);
        }

        normalize(&mut vector);
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let hash = stable_hash(feature);
        let index = usize::try_from(hash % self.dimension as u64).unwrap_or(0);
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[index] += sign * weight;
    }
}

impl Embedder for HashedEmbedder {
    fn model_id(&self) -> &str {
        MODEL_ID
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.embed_text(text))
    }
}

fn stable_hash(feature: &str) -> u64 {
    let digest = Sha256::digest(feature.as_bytes());
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
