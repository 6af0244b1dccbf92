use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Configuration keys enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Username,
    Owner,
    Repository,
    ApiBaseUrl,
}

impl ConfigKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Username => "username",
            ConfigKey::Owner => "owner",
            ConfigKey::Repository => "repository",
            ConfigKey::ApiBaseUrl => "api_base_url",
        }
    }

    /// Environment variable that overrides the file value for this key
    pub fn env_var(&self) -> &'static str {
        match self {
            ConfigKey::Username => "FAILURE_ISSUE_USERNAME",
            ConfigKey::Owner => "FAILURE_ISSUE_OWNER",
            ConfigKey::Repository => "FAILURE_ISSUE_REPOSITORY",
            ConfigKey::ApiBaseUrl => "FAILURE_ISSUE_API_URL",
        }
    }

    /// Get all config keys
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::Username,
            ConfigKey::Owner,
            ConfigKey::Repository,
            ConfigKey::ApiBaseUrl,
        ]
    }
}

/// Filename for the project-specific configuration within the config directory.
pub const PROJECT_CONFIG_FILENAME: &str = "config.json";
/// Directory name for project-specific configuration.
pub const PROJECT_CONFIG_DIR: &str = ".failure-issue";
/// Environment variable holding the GitHub password. Kept out of the config file.
pub const PASSWORD_ENV: &str = "TEST_GITHUB_PASSWORD";

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_USERNAME: &str = "r351574nc3";
pub const DEFAULT_OWNER: &str = "r351574nc3";
pub const DEFAULT_REPOSITORY: &str = "junit-minibook";

/// Parses a JSON configuration file content into a map of configuration values.
///
/// - Returns the values of every known key present in the JSON object; unknown keys are skipped.
/// - Returns an empty HashMap if the input `content` is empty or contains only whitespace.
/// - Returns an `Err` if the JSON parsing fails or the document is not an object.
pub fn parse_config(content: &[u8]) -> Result<HashMap<ConfigKey, Value>> {
    if content.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(HashMap::new());
    }

    let value: Value = serde_json::from_slice(content).context("Failed to parse config JSON")?;

    if let Value::Object(map) = &value {
        let config_map = ConfigKey::all()
            .iter()
            .filter_map(|key| map.get(key.as_str()).map(|val| (*key, val.clone())))
            .collect();
        return Ok(config_map);
    }

    Err(anyhow::anyhow!("Config must be a JSON object"))
}

/// Merges `updates` into `base_config` and returns a new configuration map.
///
/// If a key exists in both, the value from `updates` wins. Neither input is modified.
pub fn update_config(
    base_config: &HashMap<ConfigKey, Value>,
    updates: &HashMap<ConfigKey, Value>,
) -> HashMap<ConfigKey, Value> {
    let mut new_config = base_config.clone();
    for (key, value) in updates {
        new_config.insert(*key, value.clone());
    }
    new_config
}

/// Collects the configuration values set through environment variables.
///
/// `lookup` resolves a variable name, normally `std::env::var(..).ok()`.
pub fn env_overrides<F>(lookup: F) -> HashMap<ConfigKey, Value>
where
    F: Fn(&str) -> Option<String>,
{
    ConfigKey::all()
        .iter()
        .filter_map(|key| {
            lookup(key.env_var())
                .filter(|v| !v.trim().is_empty())
                .map(|v| (*key, Value::String(v)))
        })
        .collect()
}

/// Everything needed to talk to GitHub on behalf of a failing test.
#[derive(Clone, PartialEq)]
pub struct ReporterConfig {
    pub api_base_url: String,
    pub username: String,
    pub password: Option<String>,
    pub owner: String,
    pub repository: String,
}

impl fmt::Debug for ReporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterConfig")
            .field("api_base_url", &self.api_base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("owner", &self.owner)
            .field("repository", &self.repository)
            .finish()
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        ReporterConfig {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: None,
            owner: DEFAULT_OWNER.to_string(),
            repository: DEFAULT_REPOSITORY.to_string(),
        }
    }
}

impl ReporterConfig {
    /// Builds a config from parsed values, falling back to defaults per key.
    ///
    /// Values that are present but not strings are rejected.
    pub fn from_map(map: &HashMap<ConfigKey, Value>, password: Option<String>) -> Result<Self> {
        let string_value = |key: ConfigKey, default: &str| -> Result<String> {
            match map.get(&key) {
                None => Ok(default.to_string()),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(other) => Err(anyhow::anyhow!(
                    "Config value for `{}` must be a string, got {other}",
                    key.as_str()
                )),
            }
        };

        Ok(ReporterConfig {
            api_base_url: string_value(ConfigKey::ApiBaseUrl, DEFAULT_API_BASE_URL)?
                .trim_end_matches('/')
                .to_string(),
            username: string_value(ConfigKey::Username, DEFAULT_USERNAME)?,
            password: password.filter(|p| !p.is_empty()),
            owner: string_value(ConfigKey::Owner, DEFAULT_OWNER)?,
            repository: string_value(ConfigKey::Repository, DEFAULT_REPOSITORY)?,
        })
    }

    /// Loads the project file under `dir` (if any), applies overrides from `lookup`,
    /// and reads the password through `lookup`.
    pub fn load_from<F>(dir: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = dir.join(PROJECT_CONFIG_DIR).join(PROJECT_CONFIG_FILENAME);
        let file_config = if config_path.exists() {
            let content = std::fs::read(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            parse_config(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?
        } else {
            HashMap::new()
        };

        let merged = update_config(&file_config, &env_overrides(&lookup));
        Self::from_map(&merged, lookup(PASSWORD_ENV))
    }

    /// Loads the configuration from the current directory and the process environment.
    pub fn load() -> Result<Self> {
        let dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::load_from(&dir, |name| std::env::var(name).ok())
    }
}
