// Prompt templates for the schema coercion engine.

/// Extraction prompt. Replace: {instruction}, {no_invention}, {schema}, {input}
pub const COERCE_PROMPT_TEMPLATE: &str = r#"{instruction}

{no_invention}

The output MUST be a single JSON object conforming to this schema:
{schema}

Do not return anything other than the structured JSON object in your response.

INPUT:
{input}"#;

/// Repair prompt. Replace: {schema}, {raw_output}, {diagnostics}
pub const REPAIR_PROMPT_TEMPLATE: &str = r#"A previous answer was supposed to be a JSON object conforming to this schema:
{schema}

PREVIOUS ANSWER:
--------------
{raw_output}
--------------

It failed validation with these problems:
{diagnostics}

Return a corrected JSON object that satisfies the schema and keeps the content of the previous answer.
Do not add information that was not in the previous answer. Return ONLY the JSON object."#;
