//! Publisher configuration
//!
//! `PublisherConfig` is the immutable input of the cycle orchestrator.
//! `AppConfig` is the YAML file read by the `stac-publisher` binary; it adds
//! backend selection and logging on top of `PublisherConfig`.
//!
//! ```yaml
//! publisher:
//!   id_key: properties.item_id
//!   cutoff: 5m
//!   routing_key: stac.item.aggregate
//! source:
//!   kind: sqlite
//!   path: /var/lib/stac/documents.db
//! sink:
//!   kind: jsonl
//!   directory: /var/spool/stac
//! logging:
//!   level: info
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PublisherError, Result};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "STAC_PUBLISHER_CONFIGURATION_FILE";

/// Fallback configuration file (relative to the working directory)
pub const DEFAULT_CONFIG_FILE: &str = ".stac_publisher.yml";

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_UPDATE_BATCH_SIZE: usize = 1000;

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_update_batch_size() -> usize {
    DEFAULT_UPDATE_BATCH_SIZE
}

/// Core publisher settings, fixed for the lifetime of the process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublisherConfig {
    /// Dotted path of the identifier field inside each document body
    pub id_key: String,
    /// Minimum age before a document counts as stable
    #[serde(with = "cutoff_serde")]
    pub cutoff: Duration,
    /// Routing key for every published message
    pub routing_key: String,
    /// Hits requested per search page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Identifiers per bulk status update
    #[serde(default = "default_update_batch_size")]
    pub update_batch_size: usize,
}

impl PublisherConfig {
    pub fn new(
        id_key: impl Into<String>,
        cutoff: Duration,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            id_key: id_key.into(),
            cutoff,
            routing_key: routing_key.into(),
            page_size: DEFAULT_PAGE_SIZE,
            update_batch_size: DEFAULT_UPDATE_BATCH_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_update_batch_size(mut self, update_batch_size: usize) -> Self {
        self.update_batch_size = update_batch_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id_key.trim().is_empty() {
            return Err(PublisherError::config("id_key must not be empty"));
        }
        if self.id_key.split('.').any(str::is_empty) {
            return Err(PublisherError::config(format!(
                "id_key is not a valid field path: {}",
                self.id_key
            )));
        }
        if self.routing_key.trim().is_empty() {
            return Err(PublisherError::config("routing_key must not be empty"));
        }
        if self.cutoff.is_zero() {
            return Err(PublisherError::config("cutoff must be positive"));
        }
        if self.page_size == 0 {
            return Err(PublisherError::config("page_size must be positive"));
        }
        if self.update_batch_size == 0 {
            return Err(PublisherError::config("update_batch_size must be positive"));
        }
        Ok(())
    }

    /// `now - cutoff`
    pub fn cutoff_before(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let age = chrono::Duration::from_std(self.cutoff).map_err(PublisherError::config)?;
        now.checked_sub_signed(age)
            .ok_or_else(|| PublisherError::config("cutoff reaches before the minimum timestamp"))
    }
}

/// `cutoff` accepts a humantime string (`"5m"`, `"1h 30m"`) or an integer
/// number of minutes.
mod cutoff_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Minutes(u64),
        Text(String),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Minutes(minutes) => minutes
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or_else(|| serde::de::Error::custom("cutoff overflows")),
            Raw::Text(s) => humantime::parse_duration(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// Document source backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Sqlite { path: PathBuf },
}

/// Queue sink backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// One `<routing_key>.jsonl` file per routing key inside `directory`
    Jsonl { directory: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// Application configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub publisher: PublisherConfig,
    pub source: SourceConfig,
    pub sink: SinkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        config.publisher.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PublisherError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Pick the configuration file: explicit path, then the environment
    /// value, then `DEFAULT_CONFIG_FILE`.
    pub fn resolve_path(explicit: Option<PathBuf>, from_env: Option<String>) -> PathBuf {
        explicit
            .or_else(|| {
                from_env
                    .filter(|value| !value.trim().is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
publisher:
  id_key: properties.item_id
  cutoff: 5m
  routing_key: stac.item.aggregate
source:
  kind: sqlite
  path: /tmp/documents.db
sink:
  kind: jsonl
  directory: /tmp/spool
logging:
  level: debug
"#;

    #[test]
    fn test_parse_sample() {
        let config = AppConfig::from_yaml_str(SAMPLE).unwrap();

        assert_eq!(config.publisher.id_key, "properties.item_id");
        assert_eq!(config.publisher.cutoff, Duration::from_secs(300));
        assert_eq!(config.publisher.routing_key, "stac.item.aggregate");
        assert_eq!(config.publisher.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.publisher.update_batch_size, DEFAULT_UPDATE_BATCH_SIZE);
        assert_eq!(
            config.source,
            SourceConfig::Sqlite {
                path: PathBuf::from("/tmp/documents.db")
            }
        );
        assert_eq!(
            config.sink,
            SinkConfig::Jsonl {
                directory: PathBuf::from("/tmp/spool")
            }
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cutoff_as_integer_minutes() {
        let yaml = SAMPLE.replace("cutoff: 5m", "cutoff: 15");
        let config = AppConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.publisher.cutoff, Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_logging_defaults_to_info() {
        let yaml = SAMPLE.replace("logging:\n  level: debug\n", "");
        let config = AppConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_unknown_publisher_field_rejected() {
        let yaml = SAMPLE.replace("cutoff: 5m", "cutoff: 5m\n  size: 10000");
        assert!(matches!(
            AppConfig::from_yaml_str(&yaml),
            Err(PublisherError::Yaml(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = PublisherConfig::new("item_id", Duration::from_secs(300), "rk");
        assert!(base.validate().is_ok());

        let cases = [
            PublisherConfig::new("", Duration::from_secs(300), "rk"),
            PublisherConfig::new("properties..id", Duration::from_secs(300), "rk"),
            PublisherConfig::new("item_id", Duration::from_secs(300), " "),
            PublisherConfig::new("item_id", Duration::ZERO, "rk"),
            base.clone().with_page_size(0),
            base.clone().with_update_batch_size(0),
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(PublisherError::Config(_))),
                "{:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn test_cutoff_before() {
        let config = PublisherConfig::new("item_id", Duration::from_secs(300), "rk");
        let now = Utc::now();
        assert_eq!(
            config.cutoff_before(now).unwrap(),
            now - chrono::Duration::minutes(5)
        );
    }

    #[test]
    fn test_resolve_path_precedence() {
        assert_eq!(
            AppConfig::resolve_path(Some(PathBuf::from("cli.yml")), Some("env.yml".into())),
            PathBuf::from("cli.yml")
        );
        assert_eq!(
            AppConfig::resolve_path(None, Some("env.yml".into())),
            PathBuf::from("env.yml")
        );
        assert_eq!(
            AppConfig::resolve_path(None, Some("  ".into())),
            PathBuf::from(DEFAULT_CONFIG_FILE)
        );
        assert_eq!(
            AppConfig::resolve_path(None, None),
            PathBuf::from(DEFAULT_CONFIG_FILE)
        );
    }
}
