use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_HUGGINGFACE_MODEL_URL: &str =
    "https://api-inference.huggingface.co/models/savasy/bert-base-turkish-sentiment-cased";
const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset so `GROQ_API_KEY=` in .env disables the backend.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("FANPULSE_ENV", "development"));

    let bind_addr = parse_addr("FANPULSE_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("FANPULSE_LOG_LEVEL", "info");
    let teams_path = PathBuf::from(or_default("FANPULSE_TEAMS_PATH", "./config/teams.yaml"));

    let db_max_connections = parse_u32("FANPULSE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("FANPULSE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("FANPULSE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let huggingface_token = optional("HUGGINGFACE_TOKEN");
    let huggingface_model_url = or_default("HUGGINGFACE_MODEL_URL", DEFAULT_HUGGINGFACE_MODEL_URL);
    let groq_api_key = optional("GROQ_API_KEY");
    let groq_base_url = or_default("GROQ_BASE_URL", DEFAULT_GROQ_BASE_URL);
    let groq_model = or_default("GROQ_MODEL", DEFAULT_GROQ_MODEL);

    let backend_timeout_secs = parse_u64("FANPULSE_BACKEND_TIMEOUT_SECS", "30")?;
    let backend_max_retries = parse_u32("FANPULSE_BACKEND_MAX_RETRIES", "3")?;
    let backend_retry_backoff_ms = parse_u64("FANPULSE_BACKEND_RETRY_BACKOFF_MS", "2000")?;
    let max_text_chars = parse_usize("FANPULSE_MAX_TEXT_CHARS", "1600")?;
    if max_text_chars < 16 {
        return Err(invalid(
            "FANPULSE_MAX_TEXT_CHARS",
            format!("must be at least 16, got {max_text_chars}"),
        ));
    }

    let store_timeout_secs = parse_u64("FANPULSE_STORE_TIMEOUT_SECS", "15")?;
    let store_unassigned = parse_bool("FANPULSE_STORE_UNASSIGNED", "false")?;

    let live_interval_secs = parse_u64("FANPULSE_LIVE_INTERVAL_SECS", "300")?;
    let live_limit = parse_u32("FANPULSE_LIVE_LIMIT", "25")?;
    let reddit_user_agent = or_default("REDDIT_USER_AGENT", "fanpulse/0.1 (fan-sentiment)");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        teams_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        huggingface_token,
        huggingface_model_url,
        groq_api_key,
        groq_base_url,
        groq_model,
        backend_timeout_secs,
        backend_max_retries,
        backend_retry_backoff_ms,
        max_text_chars,
        store_timeout_secs,
        store_unassigned,
        live_interval_secs,
        live_limit,
        reddit_user_agent,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
