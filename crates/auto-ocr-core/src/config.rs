use crate::error::Error;
use crate::hasher::RetryPolicy;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "processed_files.db";
pub const DEFAULT_OCR_COMMAND: &str = "ocrmypdf";
pub const DEFAULT_OCR_ARGS: &[&str] = &["--deskew", "--rotate-pages", "--force-ocr"];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input_dir: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub daemon: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Per-cycle cap; zero or negative means unlimited.
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_ocr_command")]
    pub ocr_command: String,
    /// Flags passed to `ocr_command` ahead of the input and output paths.
    #[serde(default = "default_ocr_args")]
    pub ocr_args: Vec<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

fn default_interval_secs() -> u64 {
    60
}

fn default_limit() -> i64 {
    5
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_ocr_command() -> String {
    DEFAULT_OCR_COMMAND.to_string()
}

fn default_ocr_args() -> Vec<String> {
    DEFAULT_OCR_ARGS.iter().map(|a| a.to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            output_dir: None,
            db_path: default_db_path(),
            dry_run: false,
            overwrite: false,
            daemon: false,
            interval_secs: default_interval_secs(),
            limit: default_limit(),
            retries: default_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            ocr_command: default_ocr_command(),
            ocr_args: default_ocr_args(),
        }
    }
}

/// Values supplied on the command line. `None` leaves the lower layers in effect.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub dry_run: bool,
    pub overwrite: bool,
    pub daemon: bool,
    pub interval_secs: Option<u64>,
    pub limit: Option<i64>,
    pub retries: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    pub ocr_command: Option<String>,
    pub ocr_args: Option<Vec<String>>,
}

/// Settings a reconciliation cycle needs, with both directories resolved.
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub dry_run: bool,
    pub overwrite: bool,
    pub limit: Option<usize>,
    pub retry: RetryPolicy,
    pub interval: Duration,
}

/// Layers: optional `AutoOcr` config file, then `AUTO_OCR_*` env vars, then overrides.
/// `AUTO_OCR_OCR_ARGS` is split on spaces.
pub fn load_configuration(overrides: &ConfigOverrides) -> Result<AppConfig, ConfigError> {
    let path_string = |p: &Option<PathBuf>| p.as_ref().map(|p| p.to_string_lossy().into_owned());

    let builder = Config::builder()
        .add_source(ConfigFile::with_name("AutoOcr").required(false))
        .add_source(
            Environment::with_prefix("AUTO_OCR")
                .try_parsing(true)
                .list_separator(" ")
                .with_list_parse_key("ocr_args"),
        )
        .set_override_option("input_dir", path_string(&overrides.input_dir))?
        .set_override_option("output_dir", path_string(&overrides.output_dir))?
        .set_override_option("db_path", path_string(&overrides.db_path))?
        .set_override_option("dry_run", overrides.dry_run.then_some(true))?
        .set_override_option("overwrite", overrides.overwrite.then_some(true))?
        .set_override_option("daemon", overrides.daemon.then_some(true))?
        .set_override_option("interval_secs", overrides.interval_secs.map(|v| v as i64))?
        .set_override_option("limit", overrides.limit)?
        .set_override_option("retries", overrides.retries.map(i64::from))?
        .set_override_option("retry_delay_secs", overrides.retry_delay_secs.map(|v| v as i64))?
        .set_override_option("ocr_command", overrides.ocr_command.clone())?
        .set_override_option("ocr_args", overrides.ocr_args.clone())?
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

impl AppConfig {
    pub fn reconcile_settings(&self) -> Result<ReconcileSettings, Error> {
        let input_dir = self
            .input_dir
            .clone()
            .ok_or(Error::MissingSetting("input_dir"))?;
        let output_dir = self
            .output_dir
            .clone()
            .ok_or(Error::MissingSetting("output_dir"))?;

        Ok(ReconcileSettings {
            input_dir,
            output_dir,
            dry_run: self.dry_run,
            overwrite: self.overwrite,
            limit: effective_limit(self.limit),
            retry: RetryPolicy {
                max_retries: self.retries,
                delay: Duration::from_secs(self.retry_delay_secs),
            },
            interval: Duration::from_secs(self.interval_secs),
        })
    }
}

pub fn effective_limit(limit: i64) -> Option<usize> {
    if limit > 0 {
        Some(limit as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_limit() {
        assert_eq!(effective_limit(5), Some(5));
        assert_eq!(effective_limit(0), None);
        assert_eq!(effective_limit(-3), None);
    }

    #[test]
    fn test_missing_input_dir_is_rejected() {
        let config = AppConfig {
            output_dir: Some(PathBuf::from("/tmp/out")),
            ..AppConfig::default()
        };
        match config.reconcile_settings() {
            Err(Error::MissingSetting(name)) => assert_eq!(name, "input_dir"),
            other => panic!("expected missing input_dir, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_output_dir_is_rejected() {
        let config = AppConfig {
            input_dir: Some(PathBuf::from("/tmp/in")),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.reconcile_settings(),
            Err(Error::MissingSetting("output_dir"))
        ));
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let overrides = ConfigOverrides {
            input_dir: Some(PathBuf::from("/data/in")),
            output_dir: Some(PathBuf::from("/data/out")),
            dry_run: true,
            limit: Some(0),
            retries: Some(1),
            ..ConfigOverrides::default()
        };
        let config = load_configuration(&overrides).unwrap();
        assert_eq!(config.input_dir, Some(PathBuf::from("/data/in")));
        assert!(config.dry_run);
        assert!(!config.overwrite);
        assert_eq!(config.retries, 1);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));

        let settings = config.reconcile_settings().unwrap();
        assert_eq!(settings.limit, None);
        assert_eq!(settings.retry.max_retries, 1);
        assert_eq!(settings.interval, Duration::from_secs(60));
        assert_eq!(config.ocr_args, vec!["--deskew", "--rotate-pages", "--force-ocr"]);
    }

    #[test]
    fn test_ocr_args_override_replaces_defaults() {
        let overrides = ConfigOverrides {
            ocr_args: Some(vec!["--skip-text".to_string(), "-l".to_string(), "deu".to_string()]),
            ..ConfigOverrides::default()
        };
        let config = load_configuration(&overrides).unwrap();
        assert_eq!(config.ocr_args, vec!["--skip-text", "-l", "deu"]);
    }
}
