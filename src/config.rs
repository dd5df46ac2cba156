//! Application configuration. Loaded from `config.json` inside the application directory, every
//! field is optional and falls back to the defaults below.

use std::{collections::HashMap, io::ErrorKind, path::Path, time::Duration};

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::daemon::storage::entities::Category;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window_check_interval_secs: u64,
    pub input_stats_interval_secs: u64,
    pub min_activity_duration_secs: i64,
    /// Raw mouse move events that add up to one unit of mouse activity.
    pub mouse_moves_per_unit: u64,
    #[serde(with = "time_of_day")]
    pub daily_analysis_time: NaiveTime,
    pub retention_days: u32,
    /// Extra keywords appended to the built-in category rules.
    pub categories: HashMap<Category, Vec<String>>,
    /// Words masked out of window titles before they are stored.
    pub privacy_keywords: Vec<String>,
    pub ai: AiConfig,
    pub notifications: NotificationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_check_interval_secs: 5,
            input_stats_interval_secs: 60,
            min_activity_duration_secs: 3,
            mouse_moves_per_unit: 10,
            daily_analysis_time: NaiveTime::MIN,
            retention_days: 30,
            categories: HashMap::new(),
            privacy_keywords: [
                "password", "密码", "账号", "account", "银行", "bank", "支付", "payment",
                "身份证", "id card",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            ai: AiConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads the config at `path`. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = serde_json::from_str(&content)
                    .with_context(|| format!("invalid config file {}", path.display()))?;
                info!("Loaded config from {path:?}");
                Ok(config)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config at {path:?}, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    /// Writes the default config unless a file is already present. Returns whether it wrote.
    pub fn write_default(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&Self::default())?)?;
        Ok(true)
    }

    pub fn window_check_interval(&self) -> Duration {
        Duration::from_secs(self.window_check_interval_secs.max(1))
    }

    pub fn input_stats_interval(&self) -> Duration {
        Duration::from_secs(self.input_stats_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    /// Only the local rules are used.
    #[default]
    None,
    OpenAi,
    Anthropic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub model: Option<String>,
    /// Falls back to `OPENAI_API_KEY` or `ANTHROPIC_API_KEY`.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::None,
            model: None,
            api_key: None,
            base_url: None,
            timeout_secs: 30,
        }
    }
}

impl AiConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        let env_name = match self.provider {
            AiProvider::None => return None,
            AiProvider::OpenAi => "OPENAI_API_KEY",
            AiProvider::Anthropic => "ANTHROPIC_API_KEY",
        };
        let non_blank = |v: &String| !v.trim().is_empty();
        self.api_key
            .clone()
            .filter(non_blank)
            .or_else(|| std::env::var(env_name).ok().filter(non_blank))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub display_secs: u64,
    /// Application started after the report was shown, e.g. the messenger the caption is meant for.
    pub launch_after_report: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            display_secs: 15,
            launch_after_report: None,
        }
    }
}

/// `HH:MM` representation of a time of day.
mod time_of_day {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveTime;
    use tempfile::tempdir;

    use crate::daemon::storage::entities::Category;

    use super::{AiProvider, AppConfig};

    #[test]
    fn missing_file_gives_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load(&dir.path().join("config.json"))?;
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.window_check_interval_secs, 5);
        assert_eq!(config.mouse_moves_per_unit, 10);
        Ok(())
    }

    #[test]
    fn partial_file_is_merged_with_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "daily_analysis_time": "21:30",
                "categories": { "work": ["jira"] },
                "ai": { "provider": "anthropic", "timeout_secs": 5 }
            }"#,
        )?;

        let config = AppConfig::load(&path)?;
        assert_eq!(
            config.daily_analysis_time,
            NaiveTime::from_hms_opt(21, 30, 0).unwrap()
        );
        assert_eq!(config.categories[&Category::Work], vec!["jira".to_string()]);
        assert_eq!(config.ai.provider, AiProvider::Anthropic);
        assert_eq!(config.ai.timeout_secs, 5);
        assert_eq!(config.retention_days, 30);
        Ok(())
    }

    #[test]
    fn default_file_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        assert!(AppConfig::write_default(&path)?);
        assert!(!AppConfig::write_default(&path)?);
        assert_eq!(AppConfig::load(&path)?, AppConfig::default());
        Ok(())
    }

    #[test]
    fn broken_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json")?;
        assert!(AppConfig::load(&path).is_err());
        Ok(())
    }
}
