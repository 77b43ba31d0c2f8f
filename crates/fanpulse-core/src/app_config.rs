use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub teams_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub huggingface_token: Option<String>,
    pub huggingface_model_url: String,
    pub groq_api_key: Option<String>,
    pub groq_base_url: String,
    pub groq_model: String,
    pub backend_timeout_secs: u64,
    pub backend_max_retries: u32,
    pub backend_retry_backoff_ms: u64,
    pub max_text_chars: usize,
    pub store_timeout_secs: u64,
    pub store_unassigned: bool,
    pub live_interval_secs: u64,
    pub live_limit: u32,
    pub reddit_user_agent: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("teams_path", &self.teams_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "huggingface_token",
                &self.huggingface_token.as_ref().map(|_| "[redacted]"),
            )
            .field("huggingface_model_url", &self.huggingface_model_url)
            .field(
                "groq_api_key",
                &self.groq_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("groq_base_url", &self.groq_base_url)
            .field("groq_model", &self.groq_model)
            .field("backend_timeout_secs", &self.backend_timeout_secs)
            .field("backend_max_retries", &self.backend_max_retries)
            .field("backend_retry_backoff_ms", &self.backend_retry_backoff_ms)
            .field("max_text_chars", &self.max_text_chars)
            .field("store_timeout_secs", &self.store_timeout_secs)
            .field("store_unassigned", &self.store_unassigned)
            .field("live_interval_secs", &self.live_interval_secs)
            .field("live_limit", &self.live_limit)
            .field("reddit_user_agent", &self.reddit_user_agent)
            .finish()
    }
}
