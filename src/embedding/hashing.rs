/// Offline feature-hashing embedder
///
/// Maps lowercase word unigrams and bigrams into a fixed number of signed
/// buckets with blake3, then L2-normalizes. No model download, fully
/// deterministic across runs and platforms. Useful for air-gapped setups and
/// as the embedder behind the test suite.
use super::{EmbeddingError, EmbeddingProvider};
use crate::vector_math::normalize;

pub struct HashingEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InitializationError(
                "Dimension must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            dimension,
            model_name: format!("hashing-{}", dimension),
        })
    }

    fn tokens(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect()
    }

    fn accumulate(&self, feature: &str, weight: f32, vector: &mut [f32]) {
        let hash = blake3::hash(feature.as_bytes());
        let bytes = hash.as_bytes();

        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&bytes[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

        vector[bucket] += sign * weight;
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let mut vector = vec![0.0f32; self.dimension];
        let tokens = Self::tokens(text);

        for token in &tokens {
            self.accumulate(token, 1.0, &mut vector);
        }
        for pair in tokens.windows(2) {
            self.accumulate(&format!("{} {}", pair[0], pair[1]), 0.5, &mut vector);
        }

        normalize(&mut vector);
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_math::{cosine_similarity, l2_norm};

    #[test]
    fn test_deterministic_unit_vectors() {
        let embedder = HashingEmbedder::new(384).unwrap();
        let a = embedder.embed("Vector search over document chunks").unwrap();
        let b = embedder.embed("Vector search over document chunks").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 384);
        assert!((l2_norm(&a) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = HashingEmbedder::new(384).unwrap();
        let q = embedder.embed("solar panel efficiency").unwrap();
        let near = embedder.embed("efficiency of a solar panel array").unwrap();
        let far = embedder.embed("medieval castle architecture").unwrap();
        assert!(cosine_similarity(&q, &near) > cosine_similarity(&q, &far));
    }

    #[test]
    fn test_empty_text_rejected() {
        let embedder = HashingEmbedder::new(16).unwrap();
        assert!(embedder.embed("").is_err());
        assert!(embedder
            .embed_batch(&["fine".to_string(), String::new()])
            .is_err());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(HashingEmbedder::new(0).is_err());
    }
}
