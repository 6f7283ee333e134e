//! Hosted LLM providers and their defaults.

use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

/// A hosted chat-completion service.
///
/// Everything except Anthropic speaks the OpenAI chat-completions wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Gemini,
    OpenRouter,
    Perplexity,
    Anthropic,
}

/// Which request/response shape a provider expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    OpenAiChat,
    AnthropicMessages,
}

impl Provider {
    /// Full chat endpoint used when no `LLM_BASE_URL` override is given.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1/chat/completions",
            Provider::Gemini => {
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
            }
            Provider::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
            Provider::Perplexity => "https://api.perplexity.ai/chat/completions",
            Provider::Anthropic => "https://api.anthropic.com/v1/messages",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Gemini => "gemini-2.0-flash",
            Provider::OpenRouter => "openai/gpt-4o-mini",
            Provider::Perplexity => "sonar",
            Provider::Anthropic => "claude-3-5-sonnet-latest",
        }
    }

    /// Name of the environment variable holding this provider's key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Gemini => "GOOGLE_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
            Provider::Perplexity => "PERPLEXITY_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn wire_format(&self) -> WireFormat {
        match self {
            Provider::Anthropic => WireFormat::AnthropicMessages,
            _ => WireFormat::OpenAiChat,
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "gemini" | "google" => Ok(Provider::Gemini),
            "openrouter" => Ok(Provider::OpenRouter),
            "perplexity" => Ok(Provider::Perplexity),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
            Provider::OpenRouter => "openrouter",
            Provider::Perplexity => "perplexity",
            Provider::Anthropic => "anthropic",
        };
        f.write_str(name)
    }
}
