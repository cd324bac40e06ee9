use memoir_core::StoreError;
use serde::{Deserialize, Serialize};

/// Append-only positional store of the original text payloads, parallel
/// to the vector index. Positions are assigned sequentially and never
/// reused; there is no update or delete in place, only a full clear
/// alongside the paired index reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRegistry {
    texts: Vec<String>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_texts(texts: Vec<String>) -> Self {
        Self { texts }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Append texts, returning the positions assigned to them.
    pub fn append(&mut self, texts: Vec<String>) -> Vec<usize> {
        let base = self.texts.len();
        let positions = (base..base + texts.len()).collect();
        self.texts.extend(texts);
        positions
    }

    /// Look up the text at `position`. A position beyond the current
    /// length means the index and registry have desynchronized, which is
    /// an invariant violation and is surfaced as `OutOfRange`.
    pub fn get(&self, position: usize) -> Result<&str, StoreError> {
        self.texts
            .get(position)
            .map(String::as_str)
            .ok_or(StoreError::OutOfRange {
                position,
                len: self.texts.len(),
            })
    }

    /// All texts in position order.
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn clear(&mut self) {
        self.texts.clear();
    }
}
