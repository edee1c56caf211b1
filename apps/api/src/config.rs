use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::history::RoleSchema;
use crate::llm_client::DEFAULT_BASE_URL;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub llm_base_url: String,
    pub data_dir: PathBuf,
    pub role_schema: RoleSchema,
    pub fetch_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            anthropic_api_key: get("ANTHROPIC_API_KEY").with_context(|| {
                "Required environment variable 'ANTHROPIC_API_KEY' is not set".to_string()
            })?,
            llm_base_url: optional("LLM_BASE_URL", DEFAULT_BASE_URL),
            data_dir: PathBuf::from(optional("DATA_DIR", "./data")),
            role_schema: optional("ROLE_SCHEMA", "basic")
                .parse::<RoleSchema>()
                .map_err(|e| anyhow!("ROLE_SCHEMA: {e}"))?,
            fetch_timeout: Duration::from_secs(
                optional("FETCH_TIMEOUT_SECS", "30")
                    .parse::<u64>()
                    .context("FETCH_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            port: optional("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional("RUST_LOG", "info"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_only_api_key_is_set() {
        let config = config(&[("ANTHROPIC_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.llm_base_url, "https://api.anthropic.com");
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.role_schema, RoleSchema::Basic);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_missing_api_key_names_the_variable() {
        let err = config(&[]).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_bad_values_fail_with_variable_name() {
        let err = config(&[("ANTHROPIC_API_KEY", "k"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err = config(&[("ANTHROPIC_API_KEY", "k"), ("ROLE_SCHEMA", "fancy")]).unwrap_err();
        assert!(err.to_string().contains("ROLE_SCHEMA"));
    }

    #[test]
    fn test_overrides_are_read() {
        let config = config(&[
            ("ANTHROPIC_API_KEY", "k"),
            ("ROLE_SCHEMA", "measured"),
            ("DATA_DIR", "/var/lib/tailor"),
            ("FETCH_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.role_schema, RoleSchema::Measured);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/tailor"));
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
    }
}
