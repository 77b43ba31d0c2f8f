use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One tracked team and the keywords that attribute text to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub name: String,
    pub slug: String,
    pub league: Option<String>,
    pub country: Option<String>,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub subreddits: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamsFile {
    pub teams: Vec<TeamConfig>,
}

impl TeamsFile {
    #[must_use]
    pub fn find(&self, slug: &str) -> Option<&TeamConfig> {
        self.teams.iter().find(|t| t.slug == slug)
    }
}

/// Load and validate the team table from a YAML file.
///
/// Order in the file is preserved; it decides keyword-match precedence.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_teams(path: &Path) -> Result<TeamsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TeamsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_teams(&content)
}

/// Parse and validate a team table from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_teams(content: &str) -> Result<TeamsFile, ConfigError> {
    let teams_file: TeamsFile = serde_yaml::from_str(content).map_err(ConfigError::TeamsFileParse)?;
    validate_teams(&teams_file)?;
    Ok(teams_file)
}

fn validate_teams(teams_file: &TeamsFile) -> Result<(), ConfigError> {
    if teams_file.teams.is_empty() {
        return Err(ConfigError::Validation(
            "at least one team must be configured".to_string(),
        ));
    }

    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for team in &teams_file.teams {
        if team.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "team name must be non-empty".to_string(),
            ));
        }

        if team.slug.is_empty()
            || !team
                .slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ConfigError::Validation(format!(
                "team '{}' has invalid slug '{}'; use lowercase ascii, digits and '-'",
                team.name, team.slug
            )));
        }

        if !seen_names.insert(team.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate team name: '{}'",
                team.name
            )));
        }

        if !seen_slugs.insert(team.slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate team slug: '{}' (from team '{}')",
                team.slug, team.name
            )));
        }

        if team.keywords.is_empty() {
            return Err(ConfigError::Validation(format!(
                "team '{}' must have at least one keyword",
                team.name
            )));
        }

        if team.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "team '{}' has an empty keyword",
                team.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "teams_test.rs"]
mod tests;
