//! Static configuration for the scraping pipeline.
//!
//! Everything the core needs to know about the site lives in one immutable
//! [`AppConfig`] value that is loaded once (from YAML, every field
//! defaulted) and passed explicitly to each component.

use crate::bells::BellsConfig;
use crate::models::{Section, SourceKind};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Detail-page index URL per source kind. A kind without a URL is not indexed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindLinks {
    pub group: Option<String>,
    pub lecturer: Option<String>,
    pub room: Option<String>,
}

impl KindLinks {
    /// Configured `(kind, index url)` pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (SourceKind, &str)> {
        [
            (SourceKind::Group, self.group.as_deref()),
            (SourceKind::Lecturer, self.lecturer.as_deref()),
            (SourceKind::Room, self.room.as_deref()),
        ]
        .into_iter()
        .filter_map(|(kind, url)| url.map(|u| (kind, u)))
    }
}

/// Where the site lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL relative detail links are joined against.
    pub base: String,
    /// Landing page used for health checks.
    pub index: String,
    /// Index pages listing schedule sources.
    pub schedule: KindLinks,
    /// Index pages listing lesson-accounting sources.
    pub records: KindLinks,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let base = "http://94.72.18.202:8083";
        let page = |name: &str| Some(format!("{}/{}", base, name));
        Self {
            base: base.to_string(),
            index: format!("{}/index.htm", base),
            schedule: KindLinks {
                group: page("cg.htm"),
                lecturer: page("cp.htm"),
                room: page("ca.htm"),
            },
            records: KindLinks {
                group: page("vg.htm"),
                lecturer: page("vp.htm"),
                room: None,
            },
        }
    }
}

impl SiteConfig {
    /// Index links of one catalog section.
    pub fn links(&self, section: Section) -> &KindLinks {
        match section {
            Section::Schedule => &self.schedule,
            Section::Records => &self.records,
        }
    }
}

/// Defaults for schedule message rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Lesson name length cap; `<= 0` disables capping.
    pub truncate: i32,
    pub exclude_empty_weekends: bool,
    pub exclude_empty_days: bool,
    /// Full weekday names treated as weekend.
    pub weekend_names: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            truncate: 80,
            exclude_empty_weekends: true,
            exclude_empty_days: false,
            weekend_names: vec!["Суббота".to_string(), "Воскресенье".to_string()],
        }
    }
}

/// Network policy for page fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Extra attempts after a failed fetch.
    pub retries: usize,
    /// First backoff delay; doubles on each retry.
    pub retry_base_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            retries: 2,
            retry_base_delay_ms: 500,
        }
    }
}

/// Complete configuration of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    /// Weekday token → full weekday name.
    pub weekdays: BTreeMap<String, String>,
    /// Page title label → source kind.
    pub source_labels: BTreeMap<String, SourceKind>,
    pub bells: BellsConfig,
    pub render: RenderConfig,
    pub fetch: FetchConfig,
    /// Offset of the zone the site publishes modification times in.
    pub utc_offset_hours: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        let weekdays = [
            ("Пн", "Понедельник"),
            ("Вт", "Вторник"),
            ("Ср", "Среда"),
            ("Чт", "Четверг"),
            ("Пт", "Пятница"),
            ("Сб", "Суббота"),
            ("Вс", "Воскресенье"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let source_labels = [
            ("Группа", SourceKind::Group),
            ("Преподаватель", SourceKind::Lecturer),
            ("Аудитория", SourceKind::Room),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            site: SiteConfig::default(),
            weekdays,
            source_labels,
            bells: BellsConfig::default(),
            render: RenderConfig::default(),
            fetch: FetchConfig::default(),
            utc_offset_hours: 3,
        }
    }
}

impl AppConfig {
    /// Parse a YAML document; absent fields keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    /// Full weekday name for a day-header token.
    pub fn weekday_name(&self, token: &str) -> Option<&str> {
        self.weekdays.get(token).map(String::as_str)
    }

    /// Source kind for a page title label.
    pub fn kind_for_label(&self, label: &str) -> Option<SourceKind> {
        self.source_labels.get(label).copied()
    }

    /// The site's publishing zone; out-of-range offsets fall back to UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Load configuration from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read (including when
/// it does not exist) and [`ConfigError::Yaml`] when it is not valid.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    let config = AppConfig::from_yaml_str(&raw).map_err(|source| ConfigError::Yaml {
        path: display,
        source,
    })?;
    info!("Loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.weekdays.len(), 7);
        assert_eq!(config.weekday_name("Сб"), Some("Суббота"));
        assert_eq!(config.kind_for_label("Аудитория"), Some(SourceKind::Room));
        assert_eq!(config.kind_for_label("Кафедра"), None);
        assert!(config.render.exclude_empty_weekends);
        assert!(!config.render.exclude_empty_days);
        assert_eq!(config.site.schedule.iter().count(), 3);
        assert_eq!(config.site.records.iter().count(), 2);
        assert_eq!(config.site.index, "http://94.72.18.202:8083/index.htm");
    }

    #[test]
    fn test_from_yaml_overrides_and_keeps_defaults() {
        let yaml = r#"
site:
  base: "http://localhost:8083"
  schedule:
    group: "http://localhost:8083/cg.htm"
render:
  truncate: 40
fetch:
  timeout_secs: 2
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.site.base, "http://localhost:8083");
        assert_eq!(config.site.schedule.iter().count(), 1);
        assert_eq!(config.render.truncate, 40);
        assert!(config.render.exclude_empty_weekends);
        assert_eq!(config.fetch.timeout_secs, 2);
        assert_eq!(config.fetch.retries, 2);
        assert_eq!(config.weekday_name("Пн"), Some("Понедельник"));
    }

    #[test]
    fn test_source_labels_deserialize_lowercase_kinds() {
        let yaml = "source_labels:\n  Group: group\n  Teacher: lecturer\n";
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.kind_for_label("Teacher"), Some(SourceKind::Lecturer));
        assert_eq!(config.kind_for_label("Группа"), None);
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let config = AppConfig::from_yaml_str(include_str!("../config.example.yaml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(AppConfig::from_yaml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/kitis_schedule.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let path = std::env::temp_dir().join("kitis_schedule_invalid_config.yaml");
        std::fs::write(&path, "render: [not, a, map]").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_utc_offset() {
        let config = AppConfig::default();
        assert_eq!(config.utc_offset().local_minus_utc(), 3 * 3600);
    }

    #[test]
    fn test_utc_offset_out_of_range_falls_back_to_utc() {
        let mut config = AppConfig::default();
        config.utc_offset_hours = 30;
        assert_eq!(config.utc_offset().local_minus_utc(), 0);

        config.utc_offset_hours = i32::MAX;
        assert_eq!(config.utc_offset().local_minus_utc(), 0);

        config.utc_offset_hours = -5;
        assert_eq!(config.utc_offset().local_minus_utc(), -5 * 3600);
    }
}
