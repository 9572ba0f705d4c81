use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use tokio_retry::{strategy::{jitter, ExponentialBackoff}, Retry};
use tracing::{debug, warn};

use crate::error::AppError;

const RETRY_BASE_MS: u64 = 200;
const RETRY_MAX_ATTEMPTS: usize = 3;
const RETRY_CAP_MS: u64 = 3_000;

/// Batched text-to-vector client. Submits texts in chunks of `batch_size`,
/// preserves input order across chunks, and caches the embedding dimension
/// reported by the endpoint on first call — a later call reporting a
/// different dimension is treated as a hard configuration error.
#[derive(Clone)]
pub struct EmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
    observed_dimension: Arc<Mutex<Option<usize>>>,
}

impl EmbeddingClient {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self {
            client,
            model,
            observed_dimension: Arc::new(Mutex::new(None)),
        }
    }

    /// Encodes `texts` into vectors, preserving order, submitting at most
    /// `batch_size` texts per request.
    pub async fn embed(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>, AppError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(batch_size.max(1)) {
            let batch_vectors = self.embed_batch_with_retry(chunk).await?;
            vectors.extend(batch_vectors);
        }
        Ok(vectors)
    }

    async fn embed_batch_with_retry(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let strategy = ExponentialBackoff::from_millis(RETRY_BASE_MS)
            .max_delay(Duration::from_millis(RETRY_CAP_MS))
            .map(jitter)
            .take(RETRY_MAX_ATTEMPTS);

        Retry::spawn(strategy, || self.embed_batch_once(batch))
            .await
            .map_err(|err| {
                warn!(error = %err, "embedding endpoint unavailable after retries");
                AppError::EmbeddingUnavailable(err.to_string())
            })
    }

    async fn embed_batch_once(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(batch.to_vec())
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        let mut ordered: Vec<(u32, Vec<f32>)> = response
            .data
            .into_iter()
            .map(|d| (d.index, d.embedding))
            .collect();
        ordered.sort_by_key(|(index, _)| *index);

        let vectors: Vec<Vec<f32>> = ordered.into_iter().map(|(_, v)| v).collect();
        self.check_dimension(&vectors)?;
        Ok(vectors)
    }

    fn check_dimension(&self, vectors: &[Vec<f32>]) -> Result<(), AppError> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };
        let dimension = first.len();
        let mut observed = self
            .observed_dimension
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        match *observed {
            None => {
                debug!(dimension, "embedding dimension observed for the first time");
                *observed = Some(dimension);
                Ok(())
            }
            Some(expected) if expected == dimension => Ok(()),
            Some(expected) => Err(AppError::EmbeddingUnavailable(format!(
                "embedding dimension changed from {expected} to {dimension}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_dimension_observation_is_accepted() {
        let client = EmbeddingClient::new(
            Client::with_config(OpenAIConfig::new()),
            "text-embedding-3-small".to_string(),
        );
        client.check_dimension(&[vec![0.0; 1536]]).expect("first observation");
        client.check_dimension(&[vec![0.0; 1536]]).expect("matching observation");
    }

    #[test]
    fn dimension_change_is_rejected() {
        let client = EmbeddingClient::new(
            Client::with_config(OpenAIConfig::new()),
            "text-embedding-3-small".to_string(),
        );
        client.check_dimension(&[vec![0.0; 1536]]).expect("first observation");
        let err = client.check_dimension(&[vec![0.0; 768]]).unwrap_err();
        assert!(matches!(err, AppError::EmbeddingUnavailable(_)));
    }
}
