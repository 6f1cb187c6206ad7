// src/core/config_manager.rs
//! Configuration for the server and the admin CLI: environment variables,
//! optionally overlaid with a `config.yaml` carrying per-environment settings.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cache::CacheConfig;

pub const DEFAULT_LLM_API_URL: &str = "https://api.together.xyz/v1";
pub const DEFAULT_LLM_MODEL: &str = "Qwen/Qwen2.5-7B-Instruct-Turbo";

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment: EnvironmentConfig,
    pub llm: LlmConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentConfig {
    pub name: String,
    pub database_path: PathBuf,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_LLM_API_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout_seconds: 60,
        }
    }
}

/// One environment section of `config.yaml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct EnvironmentSection {
    database_path: Option<PathBuf>,
    port: Option<u16>,
    llm_api_url: Option<String>,
    llm_model: Option<String>,
    llm_timeout_seconds: Option<u64>,
    #[serde(default)]
    cache: Option<CacheConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    local: EnvironmentSection,
    #[serde(default)]
    production: EnvironmentSection,
}

impl ConfigManager {
    /// Load configuration from `config.yaml` (if present) and the process environment.
    /// Environment variables win over the file.
    pub fn load() -> Result<Self> {
        let env = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string());
        info!("Loading configuration for environment: {}", env);

        let section = Self::load_section(Path::new("config.yaml"), &env)?;
        Self::build(&env, section, |key| std::env::var(key).ok())
    }

    fn load_section(path: &Path, env: &str) -> Result<EnvironmentSection> {
        if !path.exists() {
            return Ok(EnvironmentSection::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse_section(&content, env)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn parse_section(content: &str, env: &str) -> Result<EnvironmentSection> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        Ok(match env {
            "production" => file.production,
            _ => file.local,
        })
    }

    fn build(
        env: &str,
        section: EnvironmentSection,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let base_dir = if env == "production" {
            PathBuf::from("/app")
        } else {
            std::env::current_dir().context("Failed to get current directory")?
        };

        let database_path = var("DATABASE_PATH")
            .map(PathBuf::from)
            .or(section.database_path)
            .unwrap_or_else(|| PathBuf::from("data/ghost_scan.db"));
        let database_path = if database_path.is_absolute() {
            database_path
        } else {
            base_dir.join(database_path)
        };

        let port = match var("ROCKET_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid ROCKET_PORT: {}", raw))?,
            None => section.port.unwrap_or(8000),
        };

        let timeout_seconds = match var("LLM_TIMEOUT_SECONDS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid LLM_TIMEOUT_SECONDS: {}", raw))?,
            None => section.llm_timeout_seconds.unwrap_or(60),
        };

        let llm = LlmConfig {
            api_key: var("TOGETHER_API_KEY").filter(|key| !key.trim().is_empty()),
            api_url: var("LLM_API_URL")
                .or(section.llm_api_url)
                .unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            model: var("LLM_MODEL")
                .or(section.llm_model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            timeout_seconds,
        };

        Ok(Self {
            environment: EnvironmentConfig {
                name: env.to_string(),
                database_path,
                port,
            },
            llm,
            cache: section.cache.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const YAML: &str = r#"
local:
  database_path: /tmp/local.db
  cache:
    ttl_days: 3
    similarity_threshold: 0.8
production:
  port: 9000
  llm_model: some/other-model
"#;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = ConfigManager::build("local", EnvironmentSection::default(), vars(&[])).unwrap();
        assert_eq!(config.environment.port, 8000);
        assert!(config.environment.database_path.ends_with("data/ghost_scan.db"));
        assert_eq!(config.llm, LlmConfig::default());
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_yaml_section_is_selected_by_environment() {
        let local = ConfigManager::parse_section(YAML, "local").unwrap();
        let config = ConfigManager::build("local", local, vars(&[])).unwrap();
        assert_eq!(config.environment.database_path, PathBuf::from("/tmp/local.db"));
        assert_eq!(config.cache.ttl_days, 3);
        assert_eq!(config.cache.similarity_threshold, 0.8);
        // Unset cache fields keep their defaults
        assert_eq!(config.cache.recent_window, 50);

        let production = ConfigManager::parse_section(YAML, "production").unwrap();
        let config = ConfigManager::build("production", production, vars(&[])).unwrap();
        assert_eq!(config.environment.port, 9000);
        assert_eq!(config.llm.model, "some/other-model");
        assert_eq!(
            config.environment.database_path,
            PathBuf::from("/app/data/ghost_scan.db")
        );
    }

    #[test]
    fn test_env_vars_override_file() {
        let section = ConfigManager::parse_section(YAML, "local").unwrap();
        let config = ConfigManager::build(
            "local",
            section,
            vars(&[
                ("DATABASE_PATH", "/srv/scans.db"),
                ("TOGETHER_API_KEY", "secret"),
                ("ROCKET_PORT", "4000"),
                ("LLM_TIMEOUT_SECONDS", "15"),
            ]),
        )
        .unwrap();

        assert_eq!(config.environment.database_path, PathBuf::from("/srv/scans.db"));
        assert_eq!(config.environment.port, 4000);
        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
        assert_eq!(config.llm.timeout_seconds, 15);
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let config = ConfigManager::build(
            "local",
            EnvironmentSection::default(),
            vars(&[("TOGETHER_API_KEY", "  ")]),
        )
        .unwrap();
        assert_eq!(config.llm.api_key, None);
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let err = ConfigManager::build(
            "local",
            EnvironmentSection::default(),
            vars(&[("ROCKET_PORT", "not-a-port")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid ROCKET_PORT"));
    }
}
