//! Tailoring Generator: base resume + job description → `TailoredResume`.
//!
//! A job description is either literal text or an http(s) URL resolved
//! through the `ContentLoader`. Output goes through the coercion engine with a
//! semantic check, so every line points at a role that exists in the base
//! resume.

pub mod loader;
pub mod prompts;

use chrono::Utc;
use reqwest::Url;
use serde::Deserialize;
use tracing::info;

use crate::coercion::{CoercionEngine, CoercionError};
use crate::errors::AppError;
use crate::llm_client::Completion;
use crate::models::{BaseResume, ResumeLine, TailoredResume};
use crate::schema::{FieldKind, FieldSpec, SchemaDescriptor};
use crate::tailoring::loader::ContentLoader;
use crate::tailoring::prompts::{
    JOB_DESCRIPTION_INPUT_TEMPLATE, TAILORING_INSTRUCTION, WORK_HISTORY_INPUT_TEMPLATE,
};

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct TailorRequest {
    /// Job description text, or an http(s) URL pointing at one.
    pub job_description: String,
    /// Overrides the company extracted from the description.
    #[serde(default)]
    pub company: Option<String>,
    /// Overrides the job title extracted from the description.
    #[serde(default)]
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobSource {
    Url(Url),
    Text(String),
}

impl JobSource {
    /// Anything that parses as an absolute http(s) URL with a host is
    /// fetched; everything else is taken literally.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match Url::parse(trimmed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
                JobSource::Url(url)
            }
            _ => JobSource::Text(trimmed.to_string()),
        }
    }
}

/// Shape the model is asked to produce.
#[derive(Debug, Deserialize)]
struct TailoringOutput {
    company: String,
    job_title: String,
    lines: Vec<ResumeLine>,
    fit_assessment: String,
}

pub fn tailoring_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "tailored_resume",
        instruction: TAILORING_INSTRUCTION,
        fields: vec![
            FieldSpec::new(
                "company",
                FieldKind::Text,
                "Name of the hiring company, empty if not stated.",
            ),
            FieldSpec::new(
                "job_title",
                FieldKind::Text,
                "Title of the advertised role, empty if not stated.",
            ),
            FieldSpec::new(
                "lines",
                FieldKind::ObjectList(vec![
                    FieldSpec::new(
                        "role_id",
                        FieldKind::Text,
                        "role_id of the job in the work history this point describes.",
                    ),
                    FieldSpec::new("text", FieldKind::Text, "The resume point."),
                ]),
                "Tailored resume points in display order.",
            ),
            FieldSpec::new(
                "fit_assessment",
                FieldKind::Text,
                "Brief assessment of whether the candidate is a good fit for the role.",
            ),
        ],
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generation
// ────────────────────────────────────────────────────────────────────────────

/// Produces a tailored resume for one job. Does not persist anything.
pub async fn tailor(
    llm: &dyn Completion,
    loader: &dyn ContentLoader,
    user_id: &str,
    base_resume: Option<&BaseResume>,
    request: &TailorRequest,
) -> Result<TailoredResume, AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }

    let base = base_resume.ok_or_else(|| AppError::PrerequisiteMissing {
        stage: "tailor",
        user_id: user_id.to_string(),
        missing: "base resume",
    })?;

    let (job_description, source_url) = match JobSource::parse(&request.job_description) {
        JobSource::Url(url) => {
            let text = loader.load(&url).await.map_err(|source| AppError::Fetch {
                user_id: user_id.to_string(),
                url: url.to_string(),
                source,
            })?;
            (text, Some(url.to_string()))
        }
        JobSource::Text(text) => (text, None),
    };

    let work_history = serde_json::to_string_pretty(&base.roles)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("serialising base resume for '{user_id}': {e}")))?;
    let inputs = vec![
        WORK_HISTORY_INPUT_TEMPLATE.replace("{work_history}", &work_history),
        JOB_DESCRIPTION_INPUT_TEMPLATE.replace("{job_description}", &job_description),
    ];

    info!(
        "Tailoring resume for user {} against {} base roles",
        user_id,
        base.roles.len()
    );

    let output: TailoringOutput = CoercionEngine::new(llm)
        .coerce_checked(&inputs, &tailoring_schema(), |out: &TailoringOutput| {
            check_output(base, out)
        })
        .await
        .map_err(|e| match e {
            CoercionError::Schema(failure) => AppError::SchemaCoercion {
                stage: "tailor",
                entity: format!("user '{user_id}'"),
                failure,
            },
            CoercionError::Transport(source) => AppError::Llm {
                stage: "tailor",
                entity: format!("user '{user_id}'"),
                source,
            },
        })?;

    let resume = TailoredResume {
        company: pick(request.company.as_deref(), output.company),
        job_title: pick(request.job_title.as_deref(), output.job_title),
        job_description,
        source_url,
        lines: output.lines,
        fit_assessment: output.fit_assessment,
        generated_at: Utc::now(),
    };

    info!(
        "Tailored resume '{}' for user {} ({} lines)",
        resume.key(),
        user_id,
        resume.lines.len()
    );
    Ok(resume)
}

/// Caller-supplied values win over extracted ones unless blank.
fn pick(requested: Option<&str>, extracted: String) -> String {
    match requested.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => extracted.trim().to_string(),
    }
}

fn check_output(base: &BaseResume, out: &TailoringOutput) -> Result<(), String> {
    let mut problems = Vec::new();
    if out.lines.is_empty() {
        problems.push("$.lines: at least one resume line is required".to_string());
    }
    for (i, line) in out.lines.iter().enumerate() {
        if line.text.trim().is_empty() {
            problems.push(format!("$.lines[{i}].text: must not be empty"));
        }
        if !base.has_role(&line.role_id) {
            problems.push(format!(
                "$.lines[{i}].role_id: '{}' is not a role_id in the work history",
                line.role_id
            ));
        }
    }
    if out.fit_assessment.trim().is_empty() {
        problems.push("$.fit_assessment: must not be empty".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}
