//! Installer and uninstaller for the settings file.
//!
//! Installing adds every missing key with its default and leaves existing
//! values alone. Uninstalling removes exactly those keys. Anything else in the
//! file survives both.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use toml::{Table, Value};
use tracing::info;

use super::keys::{self, INSTALLED_DEFAULTS};

#[derive(Debug, Error)]
pub enum SettingsFileError {
    #[error("failed to access `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("`{path}` is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("`{path}` has a `{section}` entry that is not a table")]
    NotATable { path: PathBuf, section: &'static str },
    #[error("failed to encode settings: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub path: PathBuf,
    pub added: Vec<&'static str>,
}

impl InstallReport {
    pub fn changed(&self) -> bool {
        !self.added.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallReport {
    pub path: PathBuf,
    pub removed: Vec<&'static str>,
}

impl UninstallReport {
    pub fn changed(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Write every missing key with its installed default.
pub fn install_defaults(path: &Path) -> Result<InstallReport, SettingsFileError> {
    let mut document = read_document(path)?;
    let section = section_mut(&mut document, path)?;

    let mut added = Vec::new();
    for (key, default) in INSTALLED_DEFAULTS {
        let field = keys::field_name(key);
        if !section.contains_key(field) {
            section.insert(field.to_string(), typed_value(default));
            added.push(key);
        }
    }

    if !added.is_empty() {
        write_document(path, &document)?;
    }

    info!(
        target = "fastly_cms::install",
        path = %path.display(),
        added = added.len(),
        "fastly settings installed"
    );
    Ok(InstallReport {
        path: path.to_path_buf(),
        added,
    })
}

/// Remove every key the installer owns.
pub fn uninstall(path: &Path) -> Result<UninstallReport, SettingsFileError> {
    if !path.exists() {
        return Ok(UninstallReport {
            path: path.to_path_buf(),
            removed: Vec::new(),
        });
    }

    let mut document = read_document(path)?;
    let mut removed = Vec::new();

    if document.contains_key(keys::SECTION) {
        let section = section_mut(&mut document, path)?;
        for (key, _) in INSTALLED_DEFAULTS {
            if section.remove(keys::field_name(key)).is_some() {
                removed.push(key);
            }
        }
        if section.is_empty() {
            document.remove(keys::SECTION);
        }
    }

    if !removed.is_empty() {
        write_document(path, &document)?;
    }

    info!(
        target = "fastly_cms::install",
        path = %path.display(),
        removed = removed.len(),
        "fastly settings removed"
    );
    Ok(UninstallReport {
        path: path.to_path_buf(),
        removed,
    })
}

/// Integers and booleans are stored typed; everything else as a string.
fn typed_value(raw: &str) -> Value {
    if let Ok(number) = raw.parse::<i64>() {
        Value::Integer(number)
    } else if let Ok(flag) = raw.parse::<bool>() {
        Value::Boolean(flag)
    } else {
        Value::String(raw.to_string())
    }
}

fn read_document(path: &Path) -> Result<Table, SettingsFileError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Table::new()),
        Err(source) => {
            return Err(SettingsFileError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&data).map_err(|source| SettingsFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn section_mut<'a>(document: &'a mut Table, path: &Path) -> Result<&'a mut Table, SettingsFileError> {
    document
        .entry(keys::SECTION)
        .or_insert_with(|| Value::Table(Table::new()))
        .as_table_mut()
        .ok_or_else(|| SettingsFileError::NotATable {
            path: path.to_path_buf(),
            section: keys::SECTION,
        })
}

fn write_document(path: &Path, document: &Table) -> Result<(), SettingsFileError> {
    let encoded = toml::to_string_pretty(document)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SettingsFileError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, encoded).map_err(|source| SettingsFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}
