//! History Normalizer: distills each role's free-text inputs into a
//! `StructuredRole` via the coercion engine.
//!
//! Entries are independent: one entry failing schema coercion is recorded on
//! that entry and the pass moves on. Transport failures abort the pass.

pub mod prompts;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::coercion::{CoercionEngine, CoercionError};
use crate::errors::AppError;
use crate::history::prompts::{MEASURED_ROLE_EXTRACTION_INSTRUCTION, ROLE_EXTRACTION_INSTRUCTION};
use crate::llm_client::Completion;
use crate::models::{RoleEntry, StructuredRole};
use crate::schema::{FieldKind, FieldSpec, SchemaDescriptor};

/// Which shape of `StructuredRole` the model is asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleSchema {
    /// activities, skills, impact as plain statements.
    #[default]
    Basic,
    /// Adds responsibilities; impact as metric/value pairs.
    Measured,
}

impl RoleSchema {
    pub fn descriptor(self) -> SchemaDescriptor {
        match self {
            RoleSchema::Basic => SchemaDescriptor {
                name: "structured_role_description",
                instruction: ROLE_EXTRACTION_INSTRUCTION,
                fields: vec![
                    FieldSpec::new(
                        "activities",
                        FieldKind::TextList,
                        "List of activities the user performed in the role.",
                    ),
                    FieldSpec::new(
                        "skills",
                        FieldKind::TextList,
                        "List of skills the user developed in the role.",
                    ),
                    FieldSpec::new(
                        "impact",
                        FieldKind::TextList,
                        "List of measurable impact the user had in the role.",
                    ),
                ],
            },
            RoleSchema::Measured => SchemaDescriptor {
                name: "measured_role_description",
                instruction: MEASURED_ROLE_EXTRACTION_INSTRUCTION,
                fields: vec![
                    FieldSpec::new(
                        "activities",
                        FieldKind::TextList,
                        "List of key activities involved in the role.",
                    ),
                    FieldSpec::new(
                        "responsibilities",
                        FieldKind::TextList,
                        "List of responsibilities held in the role.",
                    ),
                    FieldSpec::new("skills", FieldKind::TextList, "List of skills used in the role."),
                    FieldSpec::new(
                        "impact",
                        FieldKind::ObjectList(vec![
                            FieldSpec::new("metric", FieldKind::Text, "What the impact was."),
                            FieldSpec::new("value", FieldKind::Scalar, "The numerical result."),
                        ]),
                        "List of all measurable impacts.",
                    ),
                ],
            },
        }
    }
}

impl FromStr for RoleSchema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(RoleSchema::Basic),
            "measured" => Ok(RoleSchema::Measured),
            other => Err(format!("unknown role schema '{other}' (expected 'basic' or 'measured')")),
        }
    }
}

impl fmt::Display for RoleSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleSchema::Basic => f.write_str("basic"),
            RoleSchema::Measured => f.write_str("measured"),
        }
    }
}

/// One entry whose coercion failed during a pass.
#[derive(Debug, Clone, Serialize)]
pub struct EntryFailure {
    pub role_id: String,
    pub company: String,
    pub error: String,
}

/// Outcome of one normalization pass, in work-history order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizationReport {
    pub normalized: Vec<String>,
    pub failed: Vec<EntryFailure>,
}

impl NormalizationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs one coercion per entry and writes the result onto the entry.
///
/// Re-running overwrites: a success replaces any previous description and
/// clears the error marker. A schema failure only sets the marker; the
/// description from the last successful pass stays in place.
pub async fn normalize_history(
    llm: &dyn Completion,
    user_id: &str,
    work_history: &mut [RoleEntry],
    schema: RoleSchema,
) -> Result<NormalizationReport, AppError> {
    let engine = CoercionEngine::new(llm);
    let descriptor = schema.descriptor();
    let mut report = NormalizationReport::default();

    info!(
        "Normalizing {} roles for user {} ({} schema)",
        work_history.len(),
        user_id,
        schema
    );

    for entry in work_history.iter_mut() {
        let result = engine
            .coerce::<StructuredRole>(&entry.user_description_inputs, &descriptor)
            .await;

        match result {
            Ok(structured) => {
                if structured.is_empty() {
                    info!("Role {} for user {} yielded no structured signal", entry.id, user_id);
                } else {
                    info!("Normalized role {} for user {}", entry.id, user_id);
                }
                entry.structured_role_description = Some(structured);
                entry.normalization_error = None;
                report.normalized.push(entry.id.clone());
            }
            Err(CoercionError::Schema(failure)) => {
                warn!(
                    "Role {} for user {} failed normalization: {}",
                    entry.id, user_id, failure
                );
                entry.normalization_error = Some(failure.to_string());
                report.failed.push(EntryFailure {
                    role_id: entry.id.clone(),
                    company: entry.company.name.clone(),
                    error: failure.to_string(),
                });
            }
            Err(CoercionError::Transport(source)) => {
                return Err(AppError::Llm {
                    stage: "normalize",
                    entity: format!("user '{}' role '{}'", user_id, entry.id),
                    source,
                });
            }
        }
    }

    Ok(report)
}
