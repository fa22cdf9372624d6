//! Configuration and data file helpers.
//!
//! [`Settings`] carries the handful of environment variables that tune the
//! helper layer itself. [`Data`] reads and writes JSON, YAML and BSON files
//! through a common `serde_json::Value` model so conversion wrappers can move
//! data between the formats.

use crate::env::Environment;
use crate::error::{Result, WrapError};
use crate::file;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Tracing filter variable.
pub const LOG_VAR: &str = "WRAPKIT_LOG";
/// Extra executable directories searched before PATH.
pub const PATH_VAR: &str = "WRAPKIT_PATH";
/// Disables bubblewrap sandboxing when set.
pub const NO_SANDBOX_VAR: &str = "WRAPKIT_NO_SANDBOX";
/// Set to `0` to stop searching the platform directories after PATH.
pub const SYSTEM_DIRS_VAR: &str = "WRAPKIT_SYSTEM_DIRS";

const DEFAULT_LOG_FILTER: &str = "warn";

/// Runtime settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub log_filter: String,
    pub extra_paths: Vec<PathBuf>,
    pub sandbox_enabled: bool,
    pub system_dirs: bool,
}

impl Settings {
    pub fn from_env(env: &Environment) -> Self {
        let log_filter = env
            .get_var(LOG_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let extra_paths = env
            .get_var(PATH_VAR)
            .map(|v| {
                std::env::split_paths(&v)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let sandbox_enabled = match env.get_var(NO_SANDBOX_VAR) {
            Some(v) => v.is_empty() || v == "0",
            None => true,
        };
        let system_dirs = env.get_var(SYSTEM_DIRS_VAR).is_none_or(|v| v != "0");
        Self {
            log_filter,
            extra_paths,
            sandbox_enabled,
            system_dirs,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            extra_paths: Vec::new(),
            sandbox_enabled: true,
            system_dirs: true,
        }
    }
}

/// On-disk data formats understood by [`Data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
    Bson,
}

impl DataFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(DataFormat::Json),
            "yaml" | "yml" => Some(DataFormat::Yaml),
            "bson" => Some(DataFormat::Bson),
            _ => None,
        }
    }
}

/// Structured data loaded from a JSON, YAML or BSON file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Data {
    value: Value,
}

impl Data {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    pub fn read(path: &Path) -> Result<Self> {
        let format = format_of(path)?;
        let bytes = fs::read(path).map_err(|e| WrapError::io(path, e))?;
        let value = match format {
            DataFormat::Json => {
                serde_json::from_slice(&bytes).map_err(|e| data_error(path, e))?
            }
            DataFormat::Yaml => {
                serde_yaml::from_slice(&bytes).map_err(|e| data_error(path, e))?
            }
            DataFormat::Bson => {
                let doc = bson::Document::from_reader(&mut bytes.as_slice())
                    .map_err(|e| data_error(path, e))?;
                bson::Bson::Document(doc).into_relaxed_extjson()
            }
        };
        Ok(Self { value })
    }

    /// Write in the format implied by `path`. `compact` drops JSON indentation.
    pub fn write(&self, path: &Path, compact: bool) -> Result<()> {
        let bytes = self.encode(format_of(path)?, compact, path)?;
        file::atomic_write(path, &bytes)
    }

    fn encode(&self, format: DataFormat, compact: bool, path: &Path) -> Result<Vec<u8>> {
        match format {
            DataFormat::Json => {
                let mut text = if compact {
                    serde_json::to_string(&self.value)
                } else {
                    serde_json::to_string_pretty(&self.value)
                }
                .map_err(|e| data_error(path, e))?;
                text.push('\n');
                Ok(text.into_bytes())
            }
            DataFormat::Yaml => serde_yaml::to_string(&self.value)
                .map(String::into_bytes)
                .map_err(|e| data_error(path, e)),
            DataFormat::Bson => {
                if !self.value.is_object() {
                    return Err(WrapError::Data {
                        path: path.to_path_buf(),
                        message: "BSON top level must be a document".to_string(),
                    });
                }
                let doc = bson::to_document(&self.value).map_err(|e| data_error(path, e))?;
                let mut bytes = Vec::new();
                doc.to_writer(&mut bytes).map_err(|e| data_error(path, e))?;
                Ok(bytes)
            }
        }
    }
}

fn format_of(path: &Path) -> Result<DataFormat> {
    DataFormat::from_path(path).ok_or_else(|| WrapError::Data {
        path: path.to_path_buf(),
        message: "unsupported file extension (expected .json, .yaml, .yml or .bson)".into(),
    })
}

fn data_error(path: &Path, err: impl std::fmt::Display) -> WrapError {
    WrapError::Data {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
