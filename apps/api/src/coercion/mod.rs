//! Schema Coercion Engine: turns free text into a validated object.
//!
//! Flow: build prompt → complete → validate → (on failure) one repair pass →
//! validate again → typed object or `CoercionError::Schema`.
//!
//! The repair pass is bounded to exactly one extra completion call.

pub mod prompts;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::coercion::prompts::{COERCE_PROMPT_TEMPLATE, REPAIR_PROMPT_TEMPLATE};
use crate::llm_client::prompts::{CAREER_COACH_SYSTEM, JSON_ONLY_SYSTEM, NO_INVENTION_INSTRUCTION};
use crate::llm_client::{ChatMessage, Completion, CompletionRequest, LlmError};
use crate::schema::SchemaDescriptor;

/// What is left after the repair pass also failed.
#[derive(Debug, Clone, Error)]
#[error("output for schema '{schema}' still invalid after repair: {diagnostics}")]
pub struct SchemaCoercionFailure {
    pub schema: &'static str,
    pub raw_output: String,
    pub diagnostics: String,
}

#[derive(Debug, Error)]
pub enum CoercionError {
    #[error("completion call failed: {0}")]
    Transport(#[source] LlmError),

    #[error(transparent)]
    Schema(SchemaCoercionFailure),
}

/// Result of checking one completion against the schema.
#[derive(Debug)]
pub enum ParseOutcome<T> {
    Valid(T),
    NeedsRepair {
        raw_output: String,
        diagnostics: String,
    },
}

pub struct CoercionEngine<'a> {
    llm: &'a dyn Completion,
}

impl<'a> CoercionEngine<'a> {
    pub fn new(llm: &'a dyn Completion) -> Self {
        Self { llm }
    }

    /// Coerces `inputs` into `T` as described by `schema`.
    pub async fn coerce<T>(&self, inputs: &[String], schema: &SchemaDescriptor) -> Result<T, CoercionError>
    where
        T: DeserializeOwned + Send,
    {
        self.coerce_checked(inputs, schema, |_: &T| Ok(())).await
    }

    /// Like `coerce`, with an extra semantic check. A failed check is
    /// handled exactly like a schema violation and goes to the repair pass.
    pub async fn coerce_checked<T, F>(
        &self,
        inputs: &[String],
        schema: &SchemaDescriptor,
        check: F,
    ) -> Result<T, CoercionError>
    where
        T: DeserializeOwned + Send,
        F: Fn(&T) -> Result<(), String> + Send + Sync,
    {
        let first = self.generate(build_prompt(schema, inputs)).await?;

        let (raw_output, diagnostics) = match assess(schema, first, &check) {
            ParseOutcome::Valid(value) => {
                debug!("Coerced '{}' on first attempt", schema.name);
                return Ok(value);
            }
            ParseOutcome::NeedsRepair {
                raw_output,
                diagnostics,
            } => (raw_output, diagnostics),
        };

        warn!(
            "Output for '{}' failed validation, running repair pass: {}",
            schema.name, diagnostics
        );

        let repaired = self
            .generate(build_repair_prompt(schema, &raw_output, &diagnostics))
            .await?;

        match assess(schema, repaired, &check) {
            ParseOutcome::Valid(value) => {
                debug!("Coerced '{}' after repair", schema.name);
                Ok(value)
            }
            ParseOutcome::NeedsRepair {
                raw_output,
                diagnostics,
            } => Err(CoercionError::Schema(SchemaCoercionFailure {
                schema: schema.name,
                raw_output,
                diagnostics,
            })),
        }
    }

    /// One completion call. An empty or unparsable response envelope is a
    /// malformed answer, not a transport failure, so it comes back as an
    /// empty string and goes through repair.
    async fn generate(&self, prompt: String) -> Result<String, CoercionError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(CAREER_COACH_SYSTEM),
            ChatMessage::system(JSON_ONLY_SYSTEM),
            ChatMessage::user(prompt),
        ]);

        match self.llm.complete(&request).await {
            Ok(text) => Ok(text),
            Err(LlmError::EmptyContent) => Ok(String::new()),
            Err(LlmError::Parse(e)) => {
                warn!("Completion response was not a valid envelope: {e}");
                Ok(String::new())
            }
            Err(e) => Err(CoercionError::Transport(e)),
        }
    }
}

fn assess<T, F>(schema: &SchemaDescriptor, raw_output: String, check: &F) -> ParseOutcome<T>
where
    T: DeserializeOwned,
    F: Fn(&T) -> Result<(), String>,
{
    let diagnostics = match schema.validate::<T>(&raw_output) {
        Ok(value) => match check(&value) {
            Ok(()) => return ParseOutcome::Valid(value),
            Err(problem) => problem,
        },
        Err(e) => e.problems.join("\n"),
    };
    ParseOutcome::NeedsRepair {
        raw_output,
        diagnostics,
    }
}

fn build_prompt(schema: &SchemaDescriptor, inputs: &[String]) -> String {
    let input = serde_json::to_string_pretty(inputs).unwrap_or_else(|_| inputs.join("\n"));
    COERCE_PROMPT_TEMPLATE
        .replace("{instruction}", schema.instruction)
        .replace("{no_invention}", NO_INVENTION_INSTRUCTION)
        .replace("{schema}", &schema.describe())
        .replace("{input}", &input)
}

fn build_repair_prompt(schema: &SchemaDescriptor, raw_output: &str, diagnostics: &str) -> String {
    let raw_output = if raw_output.trim().is_empty() {
        "(empty response)"
    } else {
        raw_output
    };
    REPAIR_PROMPT_TEMPLATE
        .replace("{schema}", &schema.describe())
        .replace("{raw_output}", raw_output)
        .replace("{diagnostics}", diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedCompletion;
    use crate::schema::{FieldKind, FieldSpec};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Notes {
        points: Vec<String>,
    }

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor {
            name: "notes",
            instruction: "Extract the key points.",
            fields: vec![FieldSpec::new(
                "points",
                FieldKind::TextList,
                "Key points stated in the text.",
            )],
        }
    }

    fn inputs() -> Vec<String> {
        vec!["Led a team of 5".to_string()]
    }

    #[tokio::test]
    async fn test_valid_first_response_makes_one_call() {
        let llm = ScriptedCompletion::new([r#"{"points": ["Led a team of 5"]}"#]);
        let notes: Notes = CoercionEngine::new(&llm)
            .coerce(&inputs(), &schema())
            .await
            .unwrap();

        assert_eq!(notes.points, vec!["Led a team of 5"]);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_repair_pass_recovers_with_exactly_two_calls() {
        let llm = ScriptedCompletion::new([
            "Here are the points: leadership.",
            r#"{"points": ["leadership"]}"#,
        ]);
        let notes: Notes = CoercionEngine::new(&llm)
            .coerce(&inputs(), &schema())
            .await
            .unwrap();

        assert_eq!(notes.points, vec!["leadership"]);
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_repair_is_schema_error_after_two_calls() {
        let llm = ScriptedCompletion::new(["not json", "still not json"]);
        let err = CoercionEngine::new(&llm)
            .coerce::<Notes>(&inputs(), &schema())
            .await
            .unwrap_err();

        match err {
            CoercionError::Schema(failure) => {
                assert_eq!(failure.schema, "notes");
                assert_eq!(failure.raw_output, "still not json");
                assert!(failure.diagnostics.contains("not valid JSON"));
            }
            other => panic!("expected Schema error, got {other:?}"),
        }
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_propagates_without_repair() {
        let llm = ScriptedCompletion::default();
        llm.push_err(LlmError::Api {
            status: 401,
            message: "bad key".to_string(),
        });

        let err = CoercionEngine::new(&llm)
            .coerce::<Notes>(&inputs(), &schema())
            .await
            .unwrap_err();

        assert!(matches!(err, CoercionError::Transport(LlmError::Api { status: 401, .. })));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_response_goes_to_repair() {
        let llm = ScriptedCompletion::default();
        llm.push_err(LlmError::EmptyContent);
        llm.push_err(LlmError::EmptyContent);

        let err = CoercionEngine::new(&llm)
            .coerce::<Notes>(&inputs(), &schema())
            .await
            .unwrap_err();
        match err {
            CoercionError::Schema(failure) => {
                assert_eq!(failure.raw_output, "");
                assert!(failure.diagnostics.contains("empty"));
            }
            other => panic!("expected Schema error, got {other:?}"),
        }
        assert_eq!(llm.calls(), 2);
        assert!(llm.requests()[1].messages[2].content.contains("(empty response)"));
    }

    #[tokio::test]
    async fn test_empty_then_valid_response_recovers() {
        let llm = ScriptedCompletion::default();
        llm.push_err(LlmError::EmptyContent);
        llm.push_ok(r#"{"points": ["recovered"]}"#);

        let notes: Notes = CoercionEngine::new(&llm)
            .coerce(&inputs(), &schema())
            .await
            .unwrap();

        assert_eq!(notes.points, vec!["recovered"]);
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_malformed_envelope_goes_to_repair() {
        let llm = ScriptedCompletion::default();
        let bad_envelope = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        llm.push_err(LlmError::Parse(bad_envelope));
        llm.push_ok(r#"{"points": ["recovered"]}"#);

        let notes: Notes = CoercionEngine::new(&llm)
            .coerce(&inputs(), &schema())
            .await
            .unwrap();

        assert_eq!(notes.points, vec!["recovered"]);
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_check_triggers_repair() {
        let llm = ScriptedCompletion::new([r#"{"points": []}"#, r#"{"points": ["one"]}"#]);
        let notes: Notes = CoercionEngine::new(&llm)
            .coerce_checked(&inputs(), &schema(), |n: &Notes| {
                if n.points.is_empty() {
                    Err("points must not be empty".to_string())
                } else {
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(notes.points, vec!["one"]);
        let repair_prompt = &llm.requests()[1].messages[2].content;
        assert!(repair_prompt.contains("points must not be empty"));
    }

    #[tokio::test]
    async fn test_prompt_carries_schema_instruction_and_input() {
        let llm = ScriptedCompletion::new([r#"{"points": []}"#]);
        let _: Notes = CoercionEngine::new(&llm)
            .coerce(&inputs(), &schema())
            .await
            .unwrap();

        let request = &llm.requests()[0];
        let prompt = &request.messages[2].content;
        assert!(prompt.starts_with("Extract the key points."));
        assert!(prompt.contains(NO_INVENTION_INSTRUCTION));
        assert!(prompt.contains(&schema().describe()));
        assert!(prompt.contains("Led a team of 5"));
        assert_eq!(request.messages[0].content, CAREER_COACH_SYSTEM);
    }

    #[tokio::test]
    async fn test_repair_prompt_carries_bad_output_and_diagnostics() {
        let llm = ScriptedCompletion::new([r#"{"points": "just one"}"#, r#"{"points": ["just one"]}"#]);
        let _: Notes = CoercionEngine::new(&llm)
            .coerce(&inputs(), &schema())
            .await
            .unwrap();

        let repair_prompt = &llm.requests()[1].messages[2].content;
        assert!(repair_prompt.contains(r#"{"points": "just one"}"#));
        assert!(repair_prompt.contains("$.points: expected a list of strings, got string"));
    }
}
