//! The one response shape every `/api/v1` endpoint returns:
//! `{success, data?, error?, metadata}`. Handlers build a `Json<T>` payload
//! and [`Envelope::ok`]/[`Envelope::from_error`] wrap it; nothing downstream
//! of a handler constructs a bare [`axum::Json`] response.

use std::time::Instant;

use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub execution_time_ms: u64,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub metadata: Metadata,
}

/// Tracks wall-clock time for `metadata.executionTime_ms` from the moment a
/// handler starts to the moment it finishes building its response.
pub struct Timer(Instant);

impl Timer {
    pub fn start() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.0.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl<T> Envelope<T> {
    pub fn ok(data: T, timer: &Timer) -> Self {
        Self::ok_with_warnings(data, Vec::new(), timer)
    }

    pub fn ok_with_warnings(data: T, warnings: Vec<String>, timer: &Timer) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: Metadata {
                timestamp: chrono::Utc::now(),
                execution_time_ms: timer.elapsed_ms(),
                version: env!("CARGO_PKG_VERSION"),
                warnings: if warnings.is_empty() { None } else { Some(warnings) },
            },
        }
    }
}

impl Envelope<()> {
    pub fn from_error(err: &ApiError, timer: &Timer) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: err.code(),
                message: err.client_message(),
                details: None,
                field: None,
            }),
            metadata: Metadata {
                timestamp: chrono::Utc::now(),
                execution_time_ms: timer.elapsed_ms(),
                version: env!("CARGO_PKG_VERSION"),
                warnings: None,
            },
        }
    }
}
