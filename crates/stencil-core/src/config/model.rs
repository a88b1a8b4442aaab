use super::consts::{DEFAULT_EXTENSION, DEFAULT_TIMEOUT_MS};
use crate::error::{RenderError, Result};
use crate::log::Logger;
use crate::path::normalize_extension;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine configuration
///
/// Loadable from TOML:
///
/// ```toml
/// extension = "html"
/// views = "templates"
/// timeout_ms = 5000
/// preload = ["index", "partials/header"]
///
/// [inject]
/// site_name = "Example"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Extension appended to names that lack it (leading dot optional)
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Base search directory; `None` means the process working directory
    #[serde(default)]
    pub views: Option<PathBuf>,

    /// Injected Globals, visible to every template
    #[serde(default)]
    pub inject: serde_json::Map<String, serde_json::Value>,

    /// Per-render execution budget
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Templates compiled eagerly at construction (best effort)
    #[serde(default)]
    pub preload: Vec<String>,

    /// Sink for load/reload notices and template `log(...)` calls
    #[serde(skip)]
    pub logger: Logger,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            views: None,
            inject: serde_json::Map::new(),
            timeout_ms: default_timeout_ms(),
            preload: Vec::new(),
            logger: Logger::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RenderError::Config(format!("failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RenderError::Config(e.to_string()))
    }

    pub fn with_views(mut self, views: impl Into<PathBuf>) -> Self {
        self.views = Some(views.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Add one Injected Global
    pub fn with_inject(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.inject.insert(name.into(), value);
        self
    }

    pub fn with_preload<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preload = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Extension without a leading dot
    pub fn extension(&self) -> &str {
        normalize_extension(&self.extension)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.extension().is_empty() {
            return Err(RenderError::Config("extension must not be empty".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(RenderError::Config("timeout_ms must be greater than 0".to_string()));
        }
        Ok(())
    }
}
