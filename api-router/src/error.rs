//! Maps [`AppError`] onto the external envelope: an HTTP status per the
//! client/recoverable/escalated taxonomy, and a message that never leaks a
//! raw database/LLM error to a caller.

use axum::{http::StatusCode, response::IntoResponse, Json};
use common::error::AppError;

use crate::envelope::{Envelope, Timer};

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        self.0.code()
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::InvalidBatch(_)
            | AppError::NoOperations(_)
            | AppError::NoLineItems(_)
            | AppError::PercentageMismatch(_)
            | AppError::MassBalanceError(_) => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::RunTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::AgentTimeout(_)
            | AppError::MemoryBudgetExceeded(_)
            | AppError::PersistenceFailed(_)
            | AppError::StoreUnavailable(_)
            | AppError::EmbeddingUnavailable(_)
            | AppError::GraphRagUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_)
            | AppError::OpenAI(_)
            | AppError::Join(_)
            | AppError::Io(_)
            | AppError::Anyhow(_)
            | AppError::LLMParsing(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client errors surface their own message verbatim (it's already safe
    /// and actionable); everything else is summarized so a store/LLM detail
    /// never reaches a caller.
    pub fn client_message(&self) -> String {
        if self.0.is_client_error() {
            return self.0.to_string();
        }
        match &self.0 {
            AppError::AgentTimeout(_) => "an agent exceeded its processing deadline".to_string(),
            AppError::RunTimeout(_) => "the run exceeded its overall time budget".to_string(),
            AppError::MemoryBudgetExceeded(_) => "the process memory budget was exceeded".to_string(),
            AppError::PersistenceFailed(_) => "the result could not be persisted".to_string(),
            AppError::StoreUnavailable(_) => "the graph store is temporarily unavailable".to_string(),
            AppError::EmbeddingUnavailable(_) => "the embedding service is temporarily unavailable".to_string(),
            AppError::GraphRagUnavailable(_) => "retrieval is temporarily unavailable".to_string(),
            _ => "an internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if self.0.is_client_error() {
            tracing::warn!(code = self.code(), error = %self.0, "client error");
        } else {
            tracing::error!(code = self.code(), error = %self.0, "escalated error");
        }
        let status = self.status();
        let timer = Timer::start();
        let envelope = Envelope::<()>::from_error(&self, &timer);
        (status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::from(AppError::NotFound("run:missing".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn too_many_requests_maps_to_429() {
        let err = ApiError::from(AppError::TooManyRequests("admission full".into()));
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn run_timeout_maps_to_504() {
        let err = ApiError::from(AppError::RunTimeout(std::time::Duration::from_secs(30)));
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn store_unavailable_does_not_leak_the_raw_message() {
        let err = ApiError::from(AppError::StoreUnavailable("tcp connect refused at 10.0.0.1:8000".into()));
        assert!(!err.client_message().contains("10.0.0.1"));
    }

    #[test]
    fn validation_error_keeps_its_own_message() {
        let err = ApiError::from(AppError::Validation("limit must be between 1 and 100".into()));
        assert_eq!(err.client_message(), "Validation error: limit must be between 1 and 100");
    }
}
