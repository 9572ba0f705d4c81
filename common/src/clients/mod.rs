pub mod embedding;
pub mod llm;

pub use embedding::EmbeddingClient;
pub use llm::LlmClient;
