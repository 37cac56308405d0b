//! Embedding Comparator: cosine similarity over collaborator embeddings.

use tracing::{debug, warn};

use crate::errors::MatchError;
use crate::llm_client::Embedder;

/// Cosine similarity in [-1, 1], accumulated in f64.
///
/// Returns 0.0 when either vector is empty or has zero magnitude, and when the
/// dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let norm_a = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 || !(norm_a * norm_b).is_finite() {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Embeds texts through an `Embedder` and compares them.
pub struct EmbeddingComparator<'a> {
    embedder: &'a dyn Embedder,
}

impl<'a> EmbeddingComparator<'a> {
    pub fn new(embedder: &'a dyn Embedder) -> Self {
        Self { embedder }
    }

    /// Embeds one text. `stage` names the step in a collaborator error.
    pub async fn embed(&self, text: &str, stage: &str) -> Result<Vec<f32>, MatchError> {
        let vector = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| MatchError::collaborator(stage, e))?;
        debug!("{stage}: {} dimensions", vector.len());
        Ok(vector)
    }

    /// Cosine similarity between the embeddings of two texts.
    pub async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f64, MatchError> {
        let a = self.embed(text_a, "embedding").await?;
        let b = self.embed(text_b, "embedding").await?;
        Ok(cosine_similarity(&a, &b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use async_trait::async_trait;

    #[test]
    fn test_identical_vectors_score_one() {
        assert_eq!(cosine_similarity(&[3.0, 4.0], &[3.0, 4.0]), 1.0);
        let x = [0.12_f32, -0.7, 0.33, 2.5];
        assert!((cosine_similarity(&x, &x) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric() {
        let a = [0.5_f32, -1.25, 3.0];
        let b = [2.0_f32, 0.75, -0.1];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_opposite_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]) + 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_zero_vector_returns_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_empty_and_mismatched_return_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    /// Maps a text to a fixed vector keyed on its first character.
    struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
            match text.chars().next() {
                Some('a') => Ok(vec![1.0, 0.0]),
                Some('b') => Ok(vec![1.0, 1.0]),
                Some('z') => Ok(vec![0.0, 0.0]),
                _ => Err(LlmError::Api {
                    status: 500,
                    message: "boom".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_comparator_similarity() {
        let comparator = EmbeddingComparator::new(&LetterEmbedder);
        let sim = comparator.similarity("alpha", "beta").await.unwrap();
        assert!((sim - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
        assert_eq!(comparator.similarity("alpha", "zero").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_comparator_surfaces_collaborator_error() {
        let comparator = EmbeddingComparator::new(&LetterEmbedder);
        let err = comparator.similarity("alpha", "???").await.unwrap_err();
        assert!(matches!(err, MatchError::Collaborator { ref stage, .. } if stage == "embedding"));
    }
}
