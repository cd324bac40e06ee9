use async_trait::async_trait;
use memoir_core::StoreError;

use crate::Embeddings;

/// Deterministic embeddings for testing.
/// Generates vectors based on a simple hash of the input text.
pub struct FakeEmbeddings {
    dimension: usize,
}

impl FakeEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl Default for FakeEmbeddings {
    fn default() -> Self {
        Self::new(4)
    }
}

#[async_trait]
impl Embeddings for FakeEmbeddings {
    async fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
        Ok(texts
            .iter()
            .map(|t| text_to_vector(t, self.dimension))
            .collect())
    }
}

/// Generate a deterministic vector from text. Similar texts produce similar vectors.
///
/// Each byte contributes to a slot chosen from both its position and its
/// value, so texts differing in one character still diverge even when
/// they share a length.
fn text_to_vector(text: &str, dimension: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dimension];
    for (i, byte) in text.bytes().enumerate() {
        let slot = (i + byte as usize) % dimension;
        vec[slot] += f32::from(byte) / 255.0;
    }
    // Normalize to unit vector
    let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in &mut vec {
            *x /= magnitude;
        }
    }
    vec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeddings_are_deterministic() {
        let provider = FakeEmbeddings::new(8);
        let a = provider.embed_query("hello world").await.unwrap();
        let b = provider.embed_query("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn embeddings_have_requested_dimension() {
        let provider = FakeEmbeddings::new(16);
        let vectors = provider.embed_texts(&["a", "bb", "ccc"]).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == 16));
    }

    #[tokio::test]
    async fn embeddings_are_unit_length() {
        let provider = FakeEmbeddings::new(8);
        let v = provider.embed_query("some text").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn same_length_texts_still_diverge() {
        let provider = FakeEmbeddings::new(8);
        let a = provider.embed_query("cat").await.unwrap();
        let b = provider.embed_query("car").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn batch_matches_query_embedding() {
        let provider = FakeEmbeddings::new(4);
        let batch = provider.embed_texts(&["same text"]).await.unwrap();
        let single = provider.embed_query("same text").await.unwrap();
        assert_eq!(batch[0], single);
    }
}
