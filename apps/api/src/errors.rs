use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::coercion::SchemaCoercionFailure;
use crate::llm_client::LlmError;
use crate::pipeline::PipelineState;
use crate::store::StoreError;
use crate::tailoring::loader::FetchError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt record '{key}' during {stage}: {reason}")]
    CorruptRecord {
        stage: &'static str,
        key: String,
        reason: String,
    },

    #[error("Schema coercion failed during {stage} for {entity}: {failure}")]
    SchemaCoercion {
        stage: &'static str,
        entity: String,
        failure: SchemaCoercionFailure,
    },

    #[error("Cannot {stage} for user '{user_id}': {missing} has not been produced yet")]
    PrerequisiteMissing {
        stage: &'static str,
        user_id: String,
        missing: &'static str,
    },

    #[error("Cannot {action} for user '{user_id}' in state {state}")]
    InvalidStateTransition {
        action: &'static str,
        user_id: String,
        state: PipelineState,
    },

    #[error("Failed to fetch job description for user '{user_id}' from {url}: {source}")]
    Fetch {
        user_id: String,
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("LLM error during {stage} for {entity}: {source}")]
    Llm {
        stage: &'static str,
        entity: String,
        #[source]
        source: LlmError,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Maps a store failure onto the taxonomy, naming the stage that hit it.
    pub fn store(stage: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { key } => {
                AppError::NotFound(format!("Cannot {stage}: no record for user '{key}'"))
            }
            StoreError::Corrupt { key, reason } => AppError::CorruptRecord { stage, key, reason },
            StoreError::InvalidKey(key) => {
                AppError::Validation(format!("Cannot {stage}: '{key}' is not a valid user id"))
            }
            other @ StoreError::Io { .. } => AppError::Internal(
                anyhow::Error::new(other).context(format!("store access during {stage}")),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, code) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::PrerequisiteMissing { .. } => (StatusCode::CONFLICT, "PREREQUISITE_MISSING"),
            AppError::InvalidStateTransition { .. } => {
                (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION")
            }
            AppError::SchemaCoercion { failure, .. } => {
                tracing::warn!("Schema coercion failed; last raw output: {}", failure.raw_output);
                (StatusCode::UNPROCESSABLE_ENTITY, "SCHEMA_COERCION_ERROR")
            }
            AppError::Fetch { .. } => {
                tracing::error!("{message}");
                (StatusCode::BAD_GATEWAY, "FETCH_ERROR")
            }
            AppError::Llm { .. } => {
                tracing::error!("{message}");
                (StatusCode::BAD_GATEWAY, "LLM_ERROR")
            }
            AppError::CorruptRecord { .. } => {
                tracing::error!("{message}");
                (StatusCode::INTERNAL_SERVER_ERROR, "CORRUPT_RECORD")
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_store_errors_map_onto_taxonomy_with_stage() {
        let not_found = AppError::store(
            "tailor",
            StoreError::NotFound {
                key: "u1".to_string(),
            },
        );
        assert!(
            matches!(not_found, AppError::NotFound(ref m) if m.contains("u1") && m.contains("tailor"))
        );

        let corrupt = AppError::store(
            "normalize",
            StoreError::Corrupt {
                key: "u1".to_string(),
                reason: "EOF while parsing".to_string(),
            },
        );
        assert!(matches!(corrupt, AppError::CorruptRecord { stage: "normalize", .. }));
        assert_eq!(
            corrupt.to_string(),
            "Corrupt record 'u1' during normalize: EOF while parsing"
        );

        let invalid = AppError::store("capture history", StoreError::InvalidKey("../etc".to_string()));
        assert!(matches!(invalid, AppError::Validation(ref m) if m.contains("capture history")));

        let io = AppError::store(
            "tailor",
            StoreError::Io {
                key: "u1".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            },
        );
        assert!(matches!(io, AppError::Internal(ref e) if e.to_string().contains("tailor")));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_of(AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(AppError::InvalidStateTransition {
                action: "tailor",
                user_id: "u1".into(),
                state: PipelineState::HistoryCaptured,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::PrerequisiteMissing {
                stage: "tailor",
                user_id: "u1".into(),
                missing: "base resume",
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::SchemaCoercion {
                stage: "normalize",
                entity: "user 'u1'".into(),
                failure: SchemaCoercionFailure {
                    schema: "s",
                    raw_output: "nope".into(),
                    diagnostics: "$: not valid JSON".into(),
                },
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::Llm {
                stage: "normalize",
                entity: "user 'u1'".into(),
                source: LlmError::EmptyContent,
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::CorruptRecord {
                stage: "read record",
                key: "u1".into(),
                reason: "bad".into(),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_state_transition_message_names_user_and_state() {
        let err = AppError::InvalidStateTransition {
            action: "tailor",
            user_id: "u1".into(),
            state: PipelineState::Empty,
        };
        let message = err.to_string();
        assert!(message.contains("tailor"));
        assert!(message.contains("'u1'"));
        assert!(message.contains("Empty"));
    }
}
