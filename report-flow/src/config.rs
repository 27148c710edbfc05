use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Which completion backend the generator talks to. Selection is a pure
/// configuration value fixed at startup, never a runtime-discovered
/// capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Groq,
    Gemini,
}

impl FromStr for Provider {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "gemini" => Ok(Self::Gemini),
            other => Err(ReportError::Config(format!(
                "unknown provider '{other}' (expected 'groq' or 'gemini')"
            ))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Groq => write!(f, "groq"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

/// Read-only generator configuration, established once at process start.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
}

impl GeneratorConfig {
    pub fn new(provider: Provider, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Build configuration from the environment.
    ///
    /// `LLM_PROVIDER` selects the backend (default `groq`); the matching
    /// `*_API_KEY` is required and `*_MODEL` is optional.
    pub fn from_env() -> Result<Self> {
        let provider = match std::env::var("LLM_PROVIDER") {
            Ok(value) => value.parse()?,
            Err(_) => Provider::Groq,
        };

        let (key_var, model_var, default_model) = match provider {
            Provider::Groq => ("GROQ_API_KEY", "GROQ_MODEL", "llama-3.1-8b-instant"),
            Provider::Gemini => ("GEMINI_API_KEY", "GEMINI_MODEL", "gemini-1.5-flash"),
        };

        let api_key = std::env::var(key_var)
            .map_err(|_| ReportError::Config(format!("{key_var} is not set")))?;
        let model = std::env::var(model_var).unwrap_or_else(|_| default_model.to_string());

        Ok(Self {
            provider,
            api_key,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_names_case_insensitively() {
        assert_eq!("groq".parse::<Provider>().unwrap(), Provider::Groq);
        assert_eq!("Gemini".parse::<Provider>().unwrap(), Provider::Gemini);
        assert_eq!(" GROQ ".parse::<Provider>().unwrap(), Provider::Groq);
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = "openai".parse::<Provider>().unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn provider_display_round_trips() {
        for provider in [Provider::Groq, Provider::Gemini] {
            assert_eq!(provider.to_string().parse::<Provider>().unwrap(), provider);
        }
    }
}
