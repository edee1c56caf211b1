use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::role::{open_date, Company, RoleEntry, StructuredRole};

pub const DEFAULT_COMPANY_KEY: &str = "unspecified-company";
pub const DEFAULT_TITLE_KEY: &str = "unspecified-title";

/// One normalised role inside the base resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseRole {
    pub role_id: String,
    pub company: Company,
    pub title: String,
    pub start_date: NaiveDate,
    #[serde(default, with = "open_date")]
    pub end_date: Option<NaiveDate>,
    pub structured: StructuredRole,
}

/// The job-independent distillation of a user's full work history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseResume {
    pub roles: Vec<BaseRole>,
    pub generated_at: DateTime<Utc>,
}

impl BaseResume {
    /// Collects every entry that currently carries a structured description.
    /// Returns `None` when no entry has been normalised.
    pub fn from_history(work_history: &[RoleEntry], generated_at: DateTime<Utc>) -> Option<Self> {
        let roles: Vec<BaseRole> = work_history
            .iter()
            .filter_map(|entry| {
                entry
                    .structured_role_description
                    .as_ref()
                    .map(|structured| BaseRole {
                        role_id: entry.id.clone(),
                        company: entry.company.clone(),
                        title: entry.title.clone(),
                        start_date: entry.start_date,
                        end_date: entry.end_date,
                        structured: structured.clone(),
                    })
            })
            .collect();

        if roles.is_empty() {
            None
        } else {
            Some(Self {
                roles,
                generated_at,
            })
        }
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.iter().any(|r| r.role_id == role_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeLine {
    pub role_id: String,
    pub text: String,
}

/// Job-specific resume content plus a fit assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailoredResume {
    pub company: String,
    pub job_title: String,
    /// The resolved job description text the resume was tailored against.
    pub job_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub lines: Vec<ResumeLine>,
    pub fit_assessment: String,
    pub generated_at: DateTime<Utc>,
}

impl TailoredResume {
    /// Storage key under the owning user record: `{company}_{job_title}`.
    pub fn key(&self) -> String {
        resume_key(&self.company, &self.job_title)
    }
}

/// Builds the `{company}_{job_title}` key, substituting placeholders for
/// blank parts.
pub fn resume_key(company: &str, job_title: &str) -> String {
    let company = company.trim();
    let job_title = job_title.trim();
    format!(
        "{}_{}",
        if company.is_empty() { DEFAULT_COMPANY_KEY } else { company },
        if job_title.is_empty() { DEFAULT_TITLE_KEY } else { job_title }
    )
}
