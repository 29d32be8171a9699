//! Read-only access to the integration's key/value settings.
//!
//! Every read goes back to the underlying store; values may change between
//! publish batches without a restart.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use config::{Config, ConfigError, Environment, File, FileFormat};
use dashmap::DashMap;
use tracing::warn;

/// Environment prefix layered over the settings file (`FASTLY_CMS__FASTLY__MAX_AGE`).
pub const ENV_PREFIX: &str = "FASTLY_CMS";

/// A backing store for named settings.
pub trait SettingsSource: Send + Sync {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Narrow read interface shared by the purge and header pipelines.
#[derive(Clone)]
pub struct SettingsAccessor {
    source: Arc<dyn SettingsSource>,
}

impl SettingsAccessor {
    pub fn new(source: Arc<dyn SettingsSource>) -> Self {
        Self { source }
    }

    /// Configured value for `key`, or `default` when absent.
    pub fn get(&self, key: &str, default: &str) -> String {
        self.source
            .lookup(key)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn lookup(&self, key: &str) -> Option<String> {
        self.source.lookup(key)
    }

    /// Integer value for `key`; `None` when absent or malformed.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.source.lookup(key).as_deref().and_then(parse_i64)
    }

    /// Boolean value for `key`; `None` when absent or malformed.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.source.lookup(key).as_deref().and_then(parse_bool)
    }

    /// Non-blank value for `key`.
    pub fn get_non_blank(&self, key: &str) -> Option<String> {
        self.source.lookup(key).and_then(|value| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
    }
}

pub fn parse_i64(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Settings held in process memory. Used by embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: DashMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.values.remove(key);
    }
}

impl SettingsSource for MemorySettings {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|entry| entry.value().clone())
    }
}

/// Settings read from a TOML file with environment overrides, re-read per lookup.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
    env_prefix: Option<String>,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_prefix: Some(ENV_PREFIX.to_string()),
        }
    }

    /// Ignore environment overrides.
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Config, ConfigError> {
        let mut builder = Config::builder().add_source(
            File::from(self.path.as_path())
                .format(FileFormat::Toml)
                .required(false),
        );
        if let Some(prefix) = self.env_prefix.as_deref() {
            builder = builder.add_source(Environment::with_prefix(prefix).separator("__"));
        }
        builder.build()
    }
}

impl SettingsSource for FileSettings {
    fn lookup(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(config) => config.get_string(key).ok(),
            Err(err) => {
                warn!(
                    target = "fastly_cms::settings",
                    path = %self.path.display(),
                    key,
                    error = %err,
                    "failed to read settings file"
                );
                None
            }
        }
    }
}
