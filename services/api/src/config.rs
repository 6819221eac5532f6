use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub retell_api_key: String,
    pub retell_api_base: String,
    pub audio_websocket_base: String,
    pub chat_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub generation_timeout: Duration,
    pub max_history_turns: usize,
    pub log_level: Level,
    pub prompts_path: PathBuf,
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn or_default(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    or_default(name, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

fn positive<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let value = parsed::<T>(name, default)?;
    if value <= T::default() {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(value)
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address = parsed::<SocketAddr>("BIND_ADDRESS", "127.0.0.1:8081")?;

        let openai_api_key = required("OPENAI_API_KEY")?;
        let retell_api_key = required("RETELL_API_KEY")?;

        let openai_api_base = or_default("OPENAI_API_BASE", "https://api.openai.com/v1");
        let retell_api_base = or_default("RETELL_API_BASE", "https://api.retellai.com");
        let audio_websocket_base =
            or_default("AUDIO_WEBSOCKET_BASE", "wss://api.re-tell.ai/audio-websocket");

        let chat_model = or_default("CHAT_MODEL", "gpt-3.5-turbo");
        let max_tokens = positive::<u32>("MAX_TOKENS", "200")?;
        let temperature = parsed::<f32>("TEMPERATURE", "1.0")?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue(
                "TEMPERATURE".to_string(),
                format!("{} is outside 0.0..=2.0", temperature),
            ));
        }

        let generation_timeout =
            Duration::from_secs(positive::<u64>("GENERATION_TIMEOUT_SECS", "30")?);
        let max_history_turns = positive::<usize>("MAX_HISTORY_TURNS", "40")?;

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        Ok(Self {
            bind_address,
            openai_api_key,
            openai_api_base,
            retell_api_key,
            retell_api_base,
            audio_websocket_base,
            chat_model,
            max_tokens,
            temperature,
            generation_timeout,
            max_history_turns,
            log_level,
            prompts_path,
        })
    }
}
