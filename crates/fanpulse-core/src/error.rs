use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read teams file {path}: {source}")]
    TeamsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse teams file: {0}")]
    TeamsFileParse(#[from] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("unknown provenance: {0}")]
    UnknownProvenance(String),

    #[error("unknown label: {0}")]
    UnknownLabel(String),
}
