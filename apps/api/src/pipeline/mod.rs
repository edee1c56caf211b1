//! Pipeline Orchestrator: sequences store reads, normalization, tailoring
//! and store writes for one user.
//!
//! Per-user state is derived from the stored record, never kept separately:
//!
//! ```text
//! Empty ──capture──▶ HistoryCaptured ──normalize──▶ Normalized ──tailor──▶ Tailored(n)
//!                                       ▲  normalize (re-run)  │   tailor ◀──┘
//! ```

pub mod handlers;

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::history::{normalize_history, NormalizationReport, RoleSchema};
use crate::llm_client::Completion;
use crate::models::{BaseResume, NewRole, RoleEntry, TailoredResume, UserRecord};
use crate::store::{validate_key, KeyValueStore, RecordUpdate, StoreError};
use crate::tailoring::loader::ContentLoader;
use crate::tailoring::{tailor, TailorRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum PipelineState {
    Empty,
    HistoryCaptured,
    Normalized,
    Tailored { resumes: usize },
}

impl PipelineState {
    pub fn of(record: Option<&UserRecord>) -> Self {
        match record {
            None => PipelineState::Empty,
            Some(r) if r.work_history.is_empty() => PipelineState::Empty,
            Some(r) if r.base_resume.is_none() => PipelineState::HistoryCaptured,
            Some(r) if r.resumes.is_empty() => PipelineState::Normalized,
            Some(r) => PipelineState::Tailored {
                resumes: r.resumes.len(),
            },
        }
    }

    fn is_normalized(self) -> bool {
        matches!(self, PipelineState::Normalized | PipelineState::Tailored { .. })
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Empty => f.write_str("Empty"),
            PipelineState::HistoryCaptured => f.write_str("HistoryCaptured"),
            PipelineState::Normalized => f.write_str("Normalized"),
            PipelineState::Tailored { resumes } => write!(f, "Tailored({resumes})"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizeOutcome {
    pub report: NormalizationReport,
    pub state: PipelineState,
}

#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn KeyValueStore>,
    llm: Arc<dyn Completion>,
    loader: Arc<dyn ContentLoader>,
    role_schema: RoleSchema,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        llm: Arc<dyn Completion>,
        loader: Arc<dyn ContentLoader>,
        role_schema: RoleSchema,
    ) -> Self {
        Self {
            store,
            llm,
            loader,
            role_schema,
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Reads
    // ────────────────────────────────────────────────────────────────────────

    /// `None` for a user the store has never seen. Other store failures are
    /// reported against `stage`.
    async fn load(
        &self,
        user_id: &str,
        stage: &'static str,
    ) -> Result<Option<UserRecord>, AppError> {
        validate_key(user_id).map_err(|e| AppError::store(stage, e))?;
        match self.store.read(user_id).await {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(AppError::store(stage, e)),
        }
    }

    pub async fn record(&self, user_id: &str) -> Result<UserRecord, AppError> {
        self.store
            .read(user_id)
            .await
            .map_err(|e| AppError::store("read record", e))
    }

    pub async fn state(&self, user_id: &str) -> Result<PipelineState, AppError> {
        Ok(PipelineState::of(self.load(user_id, "read state").await?.as_ref()))
    }

    pub async fn resume(&self, user_id: &str, key: &str) -> Result<TailoredResume, AppError> {
        let record = self
            .store
            .read(user_id)
            .await
            .map_err(|e| AppError::store("read resume", e))?;
        record.resumes.get(key).cloned().ok_or_else(|| {
            AppError::NotFound(format!("No tailored resume '{key}' for user '{user_id}'"))
        })
    }

    // ────────────────────────────────────────────────────────────────────────
    // Transitions
    // ────────────────────────────────────────────────────────────────────────

    /// Empty → HistoryCaptured.
    pub async fn capture_history(
        &self,
        user_id: &str,
        roles: Vec<NewRole>,
    ) -> Result<UserRecord, AppError> {
        if roles.is_empty() {
            return Err(AppError::Validation(format!(
                "work history for user '{user_id}' must contain at least one role"
            )));
        }

        let existing = self.load(user_id, "capture history").await?;
        let state = PipelineState::of(existing.as_ref());
        if state != PipelineState::Empty {
            return Err(AppError::InvalidStateTransition {
                action: "capture history",
                user_id: user_id.to_string(),
                state,
            });
        }

        let entries: Vec<RoleEntry> = roles.into_iter().map(NewRole::into_entry).collect();
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.id == entry.id) {
                return Err(AppError::Validation(format!(
                    "duplicate role id '{}' in work history for user '{user_id}'",
                    entry.id
                )));
            }
        }

        let mut record = existing.unwrap_or_else(|| UserRecord::new(user_id));
        record.work_history = entries;
        record.updated_at = Utc::now();
        self.store
            .write(user_id, &record)
            .await
            .map_err(|e| AppError::store("capture history", e))?;

        info!(
            "Captured {} roles for user {}",
            record.work_history.len(),
            user_id
        );
        Ok(record)
    }

    /// Appends one free-text input to a role. Takes effect on the next
    /// normalization pass.
    pub async fn add_description_input(
        &self,
        user_id: &str,
        role_id: &str,
        text: &str,
    ) -> Result<RoleEntry, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation(
                "description input cannot be empty".to_string(),
            ));
        }

        let record = self.load(user_id, "add a description input").await?;
        let state = PipelineState::of(record.as_ref());
        let mut record = match record {
            Some(record) if state != PipelineState::Empty => record,
            _ => {
                return Err(AppError::InvalidStateTransition {
                    action: "add a description input",
                    user_id: user_id.to_string(),
                    state,
                })
            }
        };

        let entry = record.role_mut(role_id).ok_or_else(|| {
            AppError::NotFound(format!("No role '{role_id}' for user '{user_id}'"))
        })?;
        entry.user_description_inputs.push(text.to_string());
        let entry = entry.clone();

        self.store
            .update(user_id, RecordUpdate::WorkHistory(record.work_history))
            .await
            .map_err(|e| AppError::store("add a description input", e))?;
        info!("Added description input to role {} for user {}", role_id, user_id);
        Ok(entry)
    }

    /// HistoryCaptured → Normalized. Re-running from a later state
    /// overwrites the structured descriptions that succeed this time and
    /// rebuilds the base resume; entries that fail keep their last good
    /// description, so stored resumes stay valid.
    pub async fn normalize_history(&self, user_id: &str) -> Result<NormalizeOutcome, AppError> {
        let record = self.load(user_id, "normalize").await?;
        let state = PipelineState::of(record.as_ref());
        let mut record = match record {
            Some(record) if state != PipelineState::Empty => record,
            _ => {
                return Err(AppError::InvalidStateTransition {
                    action: "normalize",
                    user_id: user_id.to_string(),
                    state,
                })
            }
        };

        let report = normalize_history(
            self.llm.as_ref(),
            user_id,
            &mut record.work_history,
            self.role_schema,
        )
        .await?;

        let base_resume = BaseResume::from_history(&record.work_history, Utc::now());
        let record = self
            .store
            .update(
                user_id,
                RecordUpdate::Normalized {
                    work_history: record.work_history,
                    base_resume,
                },
            )
            .await
            .map_err(|e| AppError::store("normalize", e))?;

        let state = PipelineState::of(Some(&record));
        if report.is_complete() {
            info!(
                "Normalized {} roles for user {}",
                report.normalized.len(),
                user_id
            );
        } else {
            warn!(
                "Normalization for user {} finished with {} of {} roles failing",
                user_id,
                report.failed.len(),
                record.work_history.len()
            );
        }

        Ok(NormalizeOutcome { report, state })
    }

    /// Normalized | Tailored → Tailored. Repeats for the same
    /// company and title overwrite the stored resume.
    pub async fn tailor_resume(
        &self,
        user_id: &str,
        request: TailorRequest,
    ) -> Result<TailoredResume, AppError> {
        let record = self.load(user_id, "tailor").await?;
        let state = PipelineState::of(record.as_ref());
        if !state.is_normalized() {
            return Err(AppError::InvalidStateTransition {
                action: "tailor",
                user_id: user_id.to_string(),
                state,
            });
        }
        let base_resume = record.and_then(|r| r.base_resume);

        let resume = tailor(
            self.llm.as_ref(),
            self.loader.as_ref(),
            user_id,
            base_resume.as_ref(),
            &request,
        )
        .await?;

        let key = resume.key();
        self.store
            .update(user_id, RecordUpdate::Resume(key.clone(), resume.clone()))
            .await
            .map_err(|e| AppError::store("tailor", e))?;
        info!("Stored tailored resume '{}' for user {}", key, user_id);
        Ok(resume)
    }
}
