//! Configuration types.
//!
//! Everything is read from environment variables (a `.env` file is loaded
//! first by the binary). `from_lookup` takes the variable source as a
//! function so tests never touch the process environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::backend::DEFAULT_BACKEND_TIMEOUT;
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::memory::DEFAULT_HISTORY_LIMIT;
use crate::tasks::poller::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};

pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_USER_ID: &str = "local-user";

/// How turns are processed. Fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterMode {
    /// Classify and answer within the call.
    Inline,
    /// Hand the prompt to the remote backend and return a task id.
    Deferred,
}

impl FromStr for RouterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "deferred" => Ok(Self::Deferred),
            other => Err(format!("unknown mode '{other}' (expected inline or deferred)")),
        }
    }
}

impl std::fmt::Display for RouterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline => write!(f, "inline"),
            Self::Deferred => write!(f, "deferred"),
        }
    }
}

/// Remote chat backend settings (deferred mode).
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: RouterMode,
    /// Required in inline mode.
    pub llm: Option<LlmConfig>,
    pub temperature: f32,
    /// Required in deferred mode.
    pub backend: Option<BackendConfig>,
    /// Live retriever endpoint; the fixed sample corpus is used when unset.
    pub retriever_url: Option<String>,
    pub history_limit: usize,
    pub poll_attempts: u32,
    pub poll_interval: Duration,
    /// Port for the HTTP tool surface; disabled when unset.
    pub http_port: Option<u16>,
    /// User id the CLI speaks as.
    pub user_id: String,
    /// Directory for rolling log files; stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode: RouterMode = parse_or(&get, "CONVO_MODE", RouterMode::Inline)?;
        let temperature: f32 = parse_or(&get, "CONVO_TEMPERATURE", DEFAULT_TEMPERATURE)?;

        let llm = match mode {
            RouterMode::Inline => Some(llm_config(&get)?),
            RouterMode::Deferred => None,
        };
        let backend = match mode {
            RouterMode::Deferred => Some(backend_config(&get)?),
            RouterMode::Inline => None,
        };

        let history_limit: usize = parse_or(&get, "CONVO_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?;
        if history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CONVO_HISTORY_LIMIT".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        let poll_attempts: u32 = parse_or(&get, "CONVO_POLL_ATTEMPTS", DEFAULT_POLL_ATTEMPTS)?;
        if poll_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CONVO_POLL_ATTEMPTS".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }
        let poll_interval_secs: u64 = parse_or(
            &get,
            "CONVO_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL.as_secs(),
        )?;

        let http_port = get("CONVO_HTTP_PORT")
            .map(|v| parse_value::<u16>("CONVO_HTTP_PORT", &v))
            .transpose()?;

        Ok(Self {
            mode,
            llm,
            temperature,
            backend,
            retriever_url: get("CONVO_RETRIEVER_URL"),
            history_limit,
            poll_attempts,
            poll_interval: Duration::from_secs(poll_interval_secs),
            http_port,
            user_id: get("CONVO_USER_ID").unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
            log_dir: get("CONVO_LOG_DIR").map(PathBuf::from),
        })
    }
}

fn llm_config(get: &impl Fn(&str) -> Option<String>) -> Result<LlmConfig, ConfigError> {
    let backend: LlmBackend = parse_or(get, "CONVO_LLM_BACKEND", LlmBackend::OpenAi)?;
    let key_var = backend.api_key_var();
    let api_key = get(key_var).ok_or_else(|| ConfigError::MissingRequired {
        key: key_var.to_string(),
        hint: format!("Inline mode calls the LLM directly: export {key_var}=..."),
    })?;

    Ok(LlmConfig {
        backend,
        api_key: SecretString::from(api_key),
        model: get("CONVO_MODEL").unwrap_or_else(|| backend.default_model().to_string()),
    })
}

fn backend_config(get: &impl Fn(&str) -> Option<String>) -> Result<BackendConfig, ConfigError> {
    let url = get("CONVO_BACKEND_URL").ok_or_else(|| ConfigError::MissingRequired {
        key: "CONVO_BACKEND_URL".to_string(),
        hint: "Deferred mode forwards prompts to a remote chat backend.".to_string(),
    })?;
    let api_key = get("CONVO_BACKEND_API_KEY").ok_or_else(|| ConfigError::MissingRequired {
        key: "CONVO_BACKEND_API_KEY".to_string(),
        hint: "Sent as the X-API-Key header.".to_string(),
    })?;
    let timeout_secs: u64 = parse_or(
        get,
        "CONVO_BACKEND_TIMEOUT_SECS",
        DEFAULT_BACKEND_TIMEOUT.as_secs(),
    )?;
    if timeout_secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: "CONVO_BACKEND_TIMEOUT_SECS".to_string(),
            message: "must be at least 1 second".to_string(),
        });
    }

    Ok(BackendConfig {
        url,
        api_key: SecretString::from(api_key),
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}': {e}"),
    })
}
