use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use recall_core::{Assistant, DailyLimits, Error};

use crate::openai::OpenAiClient;

/// Recall HTTP API server
#[derive(Parser, Debug, Clone)]
#[command(name = "recall-server", version, about)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "RECALL_BIND", default_value = "0.0.0.0:12001")]
    pub bind: SocketAddr,

    /// SQLite database file, created if missing
    #[arg(long, env = "RECALL_DATABASE", default_value = "recall.sqlite")]
    pub database: PathBuf,

    /// Allowed CORS origin (any origin when unset or "*")
    #[arg(long, env = "CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// API key for the chat completion service; AI routes answer 503 without it
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Chat model name
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-3.5-turbo")]
    pub openai_model: String,

    /// Most due cards in one daily session
    #[arg(long, env = "RECALL_DAILY_DUE_LIMIT", default_value_t = 20)]
    pub daily_due_limit: usize,

    /// Daily sessions shorter than this are topped up with cards that are not due
    #[arg(long, env = "RECALL_DAILY_MINIMUM", default_value_t = 10)]
    pub daily_minimum: usize,
}

impl Config {
    pub fn daily_limits(&self) -> DailyLimits {
        DailyLimits {
            due_limit: self.daily_due_limit,
            minimum_total: self.daily_minimum,
        }
    }

    /// Build the assistant, which is unavailable when no API key is set.
    pub fn assistant(&self) -> Result<Assistant, Error> {
        let key = match self.openai_api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => return Ok(Assistant::unavailable()),
        };
        let client = OpenAiClient::new(key, &self.openai_base_url, &self.openai_model)?;
        Ok(Assistant::new(Arc::new(client)))
    }
}
