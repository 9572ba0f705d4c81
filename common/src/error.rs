use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

/// Core internal error type shared by every crate in the workspace.
///
/// Each variant maps to one of the stable error codes in the external API (see
/// `api-router::error::ApiError`). Client-facing messages are derived from the
/// `Display` impl; system errors (`Database`, `OpenAI`, `Io`) are never echoed
/// verbatim to callers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),
    #[error("No operations: {0}")]
    NoOperations(String),
    #[error("No line items: {0}")]
    NoLineItems(String),
    #[error("Percentage mismatch: {0}")]
    PercentageMismatch(String),
    #[error("Mass balance error: {0}")]
    MassBalanceError(String),
    #[error("Agent timeout: {0}")]
    AgentTimeout(String),
    #[error("Run timeout after {0:?}")]
    RunTimeout(std::time::Duration),
    #[error("Memory budget exceeded: {0}")]
    MemoryBudgetExceeded(String),
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),
    #[error("GraphRAG unavailable: {0}")]
    GraphRagUnavailable(String),
    #[error("Too many requests: {0}")]
    TooManyRequests(String),
    #[error("LLM parsing error: {0}")]
    LLMParsing(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Stable machine-readable error code, matching the `error.code` field of the
    /// external API envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) | Self::InternalError(_) | Self::OpenAI(_) | Self::Join(_)
            | Self::Io(_) | Self::Anyhow(_) | Self::LLMParsing(_) => "INTERNAL_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidBatch(_) => "INVALID_BATCH",
            Self::NoOperations(_) => "NO_OPERATIONS",
            Self::NoLineItems(_) => "NO_LINE_ITEMS",
            Self::PercentageMismatch(_) => "PERCENTAGE_MISMATCH",
            Self::MassBalanceError(_) => "MASS_BALANCE_ERROR",
            Self::AgentTimeout(_) => "AGENT_TIMEOUT",
            Self::RunTimeout(_) => "RUN_TIMEOUT",
            Self::MemoryBudgetExceeded(_) => "MEMORY_BUDGET_EXCEEDED",
            Self::PersistenceFailed(_) => "PERSISTENCE_FAILED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::EmbeddingUnavailable(_) => "EMBEDDING_UNAVAILABLE",
            Self::GraphRagUnavailable(_) => "GRAPHRAG_UNAVAILABLE",
            Self::TooManyRequests(_) => "TOO_MANY_REQUESTS",
        }
    }

    /// Whether this error should increment `orchestration_errors_total` as a
    /// client error (warn) versus an escalated system error (error).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::Validation(_)
                | Self::InvalidBatch(_)
                | Self::NoOperations(_)
                | Self::NoLineItems(_)
                | Self::PercentageMismatch(_)
                | Self::TooManyRequests(_)
        )
    }
}
