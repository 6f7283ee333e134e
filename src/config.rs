//! Environment-driven configuration.
//!
//! `Config::from_env` reads an optional `.env` file first, then the process
//! environment. `Config::from_lookup` takes any lookup function so tests do
//! not have to touch the real environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::generate::Provider;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Resolved settings for the LLM client, fetchers and chat bridge.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
    pub firecrawl_api_key: Option<String>,
    pub exa_api_key: Option<String>,
    pub slack_bot_token: Option<String>,
    pub task_backend_url: Option<String>,
    pub http_timeout: Duration,
    pub session_db_path: PathBuf,
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("Ignoring unreadable .env file: {}", e);
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let provider = match get("LLM_PROVIDER") {
            Some(name) => Provider::from_str(&name)?,
            None => Provider::OpenAi,
        };

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: "HTTP_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        var: "HTTP_TIMEOUT_SECS",
                        value: raw,
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            model: get("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            base_url: get("LLM_BASE_URL").unwrap_or_else(|| provider.default_base_url().to_string()),
            provider,
            openai_api_key: get("OPENAI_API_KEY"),
            google_api_key: get("GOOGLE_API_KEY"),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            openrouter_api_key: get("OPENROUTER_API_KEY"),
            perplexity_api_key: get("PERPLEXITY_API_KEY"),
            firecrawl_api_key: get("FIRECRAWL_API_KEY"),
            exa_api_key: get("EXA_API_KEY"),
            slack_bot_token: get("SLACK_BOT_TOKEN"),
            task_backend_url: get("TASK_BACKEND_URL"),
            http_timeout,
            session_db_path: get("SESSION_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("sessions.db")),
        })
    }

    /// The API key the given provider authenticates with.
    pub fn api_key_for(&self, provider: Provider) -> Result<&str, ConfigError> {
        let key = match provider {
            Provider::OpenAi => &self.openai_api_key,
            Provider::Gemini => &self.google_api_key,
            Provider::Anthropic => &self.anthropic_api_key,
            Provider::OpenRouter => &self.openrouter_api_key,
            Provider::Perplexity => &self.perplexity_api_key,
        };
        key.as_deref()
            .ok_or(ConfigError::MissingKey(provider.api_key_var()))
    }

    pub fn firecrawl_key(&self) -> Result<&str, ConfigError> {
        self.firecrawl_api_key
            .as_deref()
            .ok_or(ConfigError::MissingKey("FIRECRAWL_API_KEY"))
    }

    pub fn exa_key(&self) -> Result<&str, ConfigError> {
        self.exa_api_key
            .as_deref()
            .ok_or(ConfigError::MissingKey("EXA_API_KEY"))
    }

    pub fn slack_token(&self) -> Result<&str, ConfigError> {
        self.slack_bot_token
            .as_deref()
            .ok_or(ConfigError::MissingKey("SLACK_BOT_TOKEN"))
    }

    pub fn backend_url(&self) -> Result<&str, ConfigError> {
        self.task_backend_url
            .as_deref()
            .ok_or(ConfigError::MissingKey("TASK_BACKEND_URL"))
    }
}
