//! Flat key-value settings persisted as TOML.
//!
//! Holds user preferences that outlive a single run: the last selected group,
//! display theme and language, and a few toggles. Theme and language are only
//! stored here; nothing in the crate applies them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SAVED_GROUP: &str = "saved_group";
pub const THEME: &str = "theme";
pub const LANGUAGE: &str = "language";
pub const TEACHER_SEARCH_ENABLED: &str = "teacher_search_enabled";
pub const CACHING_ENABLED: &str = "caching_enabled";
pub const SCHEDULE_STYLE: &str = "schedule_style";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Text(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    System,
    Day,
    Night,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::System => "system",
            Theme::Day => "day",
            Theme::Night => "night",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Theme::System),
            "day" => Some(Theme::Day),
            "night" => Some(Theme::Night),
            _ => None,
        }
    }
}

/// How a day's lessons are presented: inline below the week, or on their own page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScheduleStyle {
    #[default]
    InFragment,
    InActivity,
}

impl ScheduleStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStyle::InFragment => "in_fragment",
            ScheduleStyle::InActivity => "in_activity",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_fragment" => Some(ScheduleStyle::InFragment),
            "in_activity" => Some(ScheduleStyle::InActivity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<String, SettingValue>,
    path: Option<PathBuf>,
}

impl Settings {
    /// Settings that live only in memory and are never written out.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load settings from `path`. A missing file gives empty settings that
    /// will be written there on the first `save`.
    pub fn load(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Invalid settings {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            values,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.values)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(SettingValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(SettingValue::Bool(value)) => *value,
            _ => default,
        }
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), SettingValue::Text(value.into()));
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), SettingValue::Bool(value));
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn saved_group(&self) -> Option<&str> {
        self.get_string(SAVED_GROUP)
    }

    pub fn theme(&self) -> Theme {
        self.get_string(THEME)
            .and_then(Theme::from_str)
            .unwrap_or_default()
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.set_string(THEME, theme.as_str());
    }

    /// Language code, or `"system"` when none was chosen.
    pub fn language(&self) -> &str {
        self.get_string(LANGUAGE).unwrap_or("system")
    }

    pub fn teacher_search_enabled(&self) -> bool {
        self.get_bool(TEACHER_SEARCH_ENABLED, false)
    }

    pub fn caching_enabled(&self) -> bool {
        self.get_bool(CACHING_ENABLED, true)
    }

    pub fn schedule_style(&self) -> ScheduleStyle {
        self.get_string(SCHEDULE_STYLE)
            .and_then(ScheduleStyle::from_str)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_empty() {
        let settings = Settings::in_memory();
        assert_eq!(settings.saved_group(), None);
        assert_eq!(settings.theme(), Theme::System);
        assert_eq!(settings.language(), "system");
        assert!(settings.caching_enabled());
        assert!(!settings.teacher_search_enabled());
        assert_eq!(settings.schedule_style(), ScheduleStyle::InFragment);
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = Settings::load(&path).unwrap();
        settings.set_string(SAVED_GROUP, "ИС-21");
        settings.set_theme(Theme::Night);
        settings.set_bool(CACHING_ENABLED, false);
        settings.save().unwrap();

        let reloaded = Settings::load(&path).unwrap();
        assert_eq!(reloaded.saved_group(), Some("ИС-21"));
        assert_eq!(reloaded.theme(), Theme::Night);
        assert!(!reloaded.caching_enabled());
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let mut settings = Settings::in_memory();
        settings.set_string(THEME, "sepia");
        settings.set_string(SCHEDULE_STYLE, "grid");
        assert_eq!(settings.theme(), Theme::System);
        assert_eq!(settings.schedule_style(), ScheduleStyle::InFragment);
    }

    #[test]
    fn test_type_mismatch_uses_default() {
        let mut settings = Settings::in_memory();
        settings.set_string(CACHING_ENABLED, "yes");
        assert!(settings.caching_enabled());
        settings.set_bool(SAVED_GROUP, true);
        assert_eq!(settings.saved_group(), None);
    }

    #[test]
    fn test_remove() {
        let mut settings = Settings::in_memory();
        settings.set_string(SAVED_GROUP, "G1");
        settings.remove(SAVED_GROUP);
        assert_eq!(settings.saved_group(), None);
    }
}
