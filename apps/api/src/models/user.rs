use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::resume::{BaseResume, TailoredResume};
use crate::models::role::RoleEntry;

/// Everything stored for one user, persisted as a single record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    #[serde(default)]
    pub work_history: Vec<RoleEntry>,
    /// Present only after normalization has produced at least one structured role.
    #[serde(default)]
    pub base_resume: Option<BaseResume>,
    /// Tailored resumes keyed by `{company}_{job_title}`.
    #[serde(default)]
    pub resumes: BTreeMap<String, TailoredResume>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            work_history: Vec::new(),
            base_resume: None,
            resumes: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn role_mut(&mut self, role_id: &str) -> Option<&mut RoleEntry> {
        self.work_history.iter_mut().find(|r| r.id == role_id)
    }
}
