//! Editor configuration file.
//!
//! # Responsibility
//! - Parse the TOML settings shared by every front end.
//! - Fill unset keys with defaults and reject unusable values.
//!
//! ```toml
//! project_limit = 5        # 0 disables the limit
//!
//! [viewport]
//! width = 800
//! height = 600
//!
//! [storage]
//! database_path = "/var/lib/luminist/projects.sqlite3"
//!
//! [logging]
//! level = "info"
//! dir = "/var/log/luminist"
//! ```

use crate::model::project::Dimensions;
use crate::service::admission::{AdmissionPolicy, DEFAULT_PROJECT_LIMIT};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_VIEWPORT: Dimensions = Dimensions {
    width: 800,
    height: 600,
};

/// Configuration load failures.
#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    EmptyViewport(Dimensions),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::EmptyViewport(size) => write!(
                f,
                "viewport must be non-empty, got {}x{}",
                size.width, size.height
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::EmptyViewport(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSection {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportSection {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEWPORT.width,
            height: DEFAULT_VIEWPORT.height,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// `None` keeps projects in memory.
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Falls back to `default_log_level()`.
    pub level: Option<String>,
    /// File logging stays off when unset.
    pub dir: Option<PathBuf>,
}

/// Settings for one editor process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    pub project_limit: u32,
    pub viewport: ViewportSection,
    pub storage: StorageSection,
    pub logging: LoggingSection,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            project_limit: DEFAULT_PROJECT_LIMIT,
            viewport: ViewportSection::default(),
            storage: StorageSection::default(),
            logging: LoggingSection::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let viewport = self.viewport();
        if viewport.is_empty() {
            return Err(ConfigError::EmptyViewport(viewport));
        }
        Ok(())
    }

    pub fn viewport(&self) -> Dimensions {
        Dimensions::new(self.viewport.width, self.viewport.height)
    }

    pub fn admission(&self) -> AdmissionPolicy {
        AdmissionPolicy::from_limit(self.project_limit)
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .level
            .as_deref()
            .unwrap_or(crate::logging::default_log_level())
    }
}
