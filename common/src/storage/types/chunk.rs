use serde::{Deserialize, Serialize};

use crate::stored_object;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub source_type: String,
    pub entity_ids: Vec<String>,
    pub run_id: Option<String>,
}

stored_object!(Chunk, "chunk", {
    content: String,
    metadata: ChunkMetadata,
    embedding: Vec<f32>,
});

impl Chunk {
    /// All chunks indexed together must carry the same embedding dimension.
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_matches_embedding_len() {
        let now = chrono::Utc::now();
        let chunk = Chunk {
            id: "chunk:1".into(),
            created_at: now,
            updated_at: now,
            content: "oat flour is a high-fiber base ingredient".into(),
            metadata: ChunkMetadata {
                source_type: "ingredient_profile".into(),
                entity_ids: vec!["ingredient:oat_flour".into()],
                run_id: None,
            },
            embedding: vec![0.1, 0.2, 0.3],
        };
        assert_eq!(chunk.dimension(), 3);
    }
}
