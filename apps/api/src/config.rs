use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    DynamoDb,
    /// Non-durable; for local runs without AWS access.
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Bedrock,
    Anthropic,
}

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub aws_region: String,
    pub store_kind: StoreKind,
    pub benefits_table: String,
    pub dynamodb_endpoint: Option<String>,
    pub backend_kind: BackendKind,
    pub bedrock_model_id: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub max_output_tokens: u32,
    pub temperature: f64,
    pub advice_timeout: Duration,
    pub store_timeout: Duration,
    pub session_idle: chrono::Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let store_kind = match or_default(&lookup, "PROFILE_STORE", "dynamodb").as_str() {
            "dynamodb" => StoreKind::DynamoDb,
            "memory" => StoreKind::Memory,
            other => bail!("PROFILE_STORE must be 'dynamodb' or 'memory', got '{other}'"),
        };

        let backend_kind = match or_default(&lookup, "ADVICE_BACKEND", "bedrock").as_str() {
            "bedrock" => BackendKind::Bedrock,
            "anthropic" => BackendKind::Anthropic,
            other => bail!("ADVICE_BACKEND must be 'bedrock' or 'anthropic', got '{other}'"),
        };

        let anthropic_api_key = lookup("ANTHROPIC_API_KEY").filter(|k| !k.is_empty());
        if backend_kind == BackendKind::Anthropic && anthropic_api_key.is_none() {
            bail!("Required environment variable 'ANTHROPIC_API_KEY' is not set");
        }

        let temperature: f64 = parse_or(&lookup, "TEMPERATURE", 0.7)?;
        if !(0.0..=1.0).contains(&temperature) {
            bail!("TEMPERATURE must be between 0 and 1, got {temperature}");
        }

        let advice_timeout_secs: u64 = parse_or(&lookup, "ADVICE_TIMEOUT_SECS", 60)?;
        let store_timeout_secs: u64 = parse_or(&lookup, "STORE_TIMEOUT_SECS", 10)?;
        if advice_timeout_secs == 0 || store_timeout_secs == 0 {
            bail!("ADVICE_TIMEOUT_SECS and STORE_TIMEOUT_SECS must be positive");
        }

        let session_idle_minutes: i64 = parse_or(&lookup, "SESSION_IDLE_MINUTES", 60)?;
        if session_idle_minutes <= 0 {
            bail!("SESSION_IDLE_MINUTES must be positive, got {session_idle_minutes}");
        }
        let session_idle = chrono::Duration::try_minutes(session_idle_minutes).with_context(|| {
            format!("SESSION_IDLE_MINUTES is out of range: {session_idle_minutes}")
        })?;

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: or_default(&lookup, "RUST_LOG", "info"),
            aws_region: or_default(&lookup, "AWS_REGION", "us-east-1"),
            store_kind,
            benefits_table: or_default(&lookup, "BENEFITS_TABLE", "UserBenefitsContext"),
            dynamodb_endpoint: lookup("DYNAMODB_ENDPOINT").filter(|v| !v.is_empty()),
            backend_kind,
            bedrock_model_id: or_default(&lookup, "BEDROCK_MODEL_ID", "amazon.nova-micro-v1:0"),
            anthropic_api_key,
            anthropic_model: or_default(&lookup, "ANTHROPIC_MODEL", "claude-3-haiku-20240307"),
            max_output_tokens: parse_or(&lookup, "MAX_OUTPUT_TOKENS", 1000)?,
            temperature,
            advice_timeout: Duration::from_secs(advice_timeout_secs),
            store_timeout: Duration::from_secs(store_timeout_secs),
            session_idle,
        })
    }
}

fn or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T> {
    match lookup(key).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<T>()
            .ok()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.aws_region, "us-east-1");
        assert_eq!(config.store_kind, StoreKind::DynamoDb);
        assert_eq!(config.benefits_table, "UserBenefitsContext");
        assert_eq!(config.backend_kind, BackendKind::Bedrock);
        assert_eq!(config.bedrock_model_id, "amazon.nova-micro-v1:0");
        assert_eq!(config.max_output_tokens, 1000);
        assert_eq!(config.advice_timeout, Duration::from_secs(60));
        assert_eq!(config.session_idle, chrono::Duration::minutes(60));
        assert!(config.dynamodb_endpoint.is_none());
    }

    #[test]
    fn test_anthropic_backend_requires_key() {
        let err = config_with(&[("ADVICE_BACKEND", "anthropic")]).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

        let config =
            config_with(&[("ADVICE_BACKEND", "anthropic"), ("ANTHROPIC_API_KEY", "sk-test")])
                .unwrap();
        assert_eq!(config.backend_kind, BackendKind::Anthropic);
    }

    #[test]
    fn test_rejects_unknown_store() {
        assert!(config_with(&[("PROFILE_STORE", "redis")]).is_err());
        assert_eq!(
            config_with(&[("PROFILE_STORE", "memory")])
                .unwrap()
                .store_kind,
            StoreKind::Memory
        );
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert!(config_with(&[("PORT", "eighty")]).is_err());
        assert!(config_with(&[("TEMPERATURE", "1.5")]).is_err());
        assert!(config_with(&[("STORE_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn test_session_idle_must_be_positive() {
        for raw in ["0", "-5"] {
            let err = config_with(&[("SESSION_IDLE_MINUTES", raw)]).unwrap_err();
            assert!(err.to_string().contains("SESSION_IDLE_MINUTES"), "{raw}: {err}");
        }
        assert!(config_with(&[("SESSION_IDLE_MINUTES", &i64::MAX.to_string())]).is_err());
        assert_eq!(
            config_with(&[("SESSION_IDLE_MINUTES", "15")])
                .unwrap()
                .session_idle,
            chrono::Duration::minutes(15)
        );
    }

    #[test]
    fn test_temperature_keeps_decimal_value() {
        assert_eq!(config_with(&[]).unwrap().temperature, 0.7);
        assert_eq!(
            config_with(&[("TEMPERATURE", "0.3")]).unwrap().temperature,
            0.3
        );
    }
}
