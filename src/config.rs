use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Site the schedule page and files are fetched from.
    #[serde(default = "default_base_uri")]
    pub base_uri: String,

    /// Path of the page listing the schedule files, relative to `base_uri`.
    #[serde(default = "default_schedule_page")]
    pub schedule_page: String,

    /// Number of download workers used during sync.
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// File extensions that count as schedule files when scanning the page.
    #[serde(default = "default_link_extensions")]
    pub link_extensions: Vec<String>,
}

fn default_base_uri() -> String {
    "https://patt.karelia.ru".to_string()
}

fn default_schedule_page() -> String {
    "/students/schedule/".to_string()
}

fn default_workers() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_link_extensions() -> Vec<String> {
    vec!["csv".to_string(), "xlsx".to_string(), "xls".to_string()]
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_uri: default_base_uri(),
            schedule_page: default_schedule_page(),
            workers: default_workers(),
            timeout_secs: default_timeout_secs(),
            link_extensions: default_link_extensions(),
        }
    }
}

impl NetworkConfig {
    /// Absolute URL of the schedule listing page.
    pub fn schedule_page_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_uri.trim_end_matches('/'),
            self.schedule_page.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    #[serde(default = "default_cache_path")]
    pub path: PathBuf,

    #[serde(default = "default_cache_max_size")]
    pub max_size_bytes: u64,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("lessonbook/http")
}

fn default_cache_max_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            path: default_cache_path(),
            max_size_bytes: default_cache_max_size(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lessonbook")
        .join("lessonbook.db")
}

fn default_settings_path() -> PathBuf {
    Config::config_dir().join("settings.toml")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            settings_path: default_settings_path(),
            network: NetworkConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load the config from the default location, writing a default one if
    /// none exists yet. `LESSONBOOK_CONFIG` overrides the location.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var_os("LESSONBOOK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(Self::config_path);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lessonbook")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            db_path = "/tmp/lb.db"

            [network]
            workers = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/lb.db"));
        assert_eq!(config.network.workers, 5);
        assert_eq!(config.network.base_uri, "https://patt.karelia.ru");
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_size_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.network.timeout_secs = 7;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.network.timeout_secs, 7);
    }

    #[test]
    fn test_schedule_page_url_joins_slashes() {
        let network = NetworkConfig {
            base_uri: "https://example.org/".to_string(),
            schedule_page: "/students/schedule/".to_string(),
            ..Default::default()
        };
        assert_eq!(network.schedule_page_url(), "https://example.org/students/schedule/");
    }
}
