//! Shared domain types and configuration for FanPulse.
//!
//! Everything here is plain data: the sentiment label set, the source item
//! identity, stored verdicts, and the environment-driven [`AppConfig`] plus
//! the static team table loaded from `config/teams.yaml`.

pub mod app_config;
pub mod config;
pub mod error;
pub mod teams;
pub mod types;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, CoreError};
pub use teams::{load_teams, parse_teams, TeamConfig, TeamsFile};
pub use types::{
    EntityAssignment, Label, Platform, Provenance, SourceItem, SourceKey, StoredRecord, Verdict,
};
