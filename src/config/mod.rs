use crate::buffer::BufferConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Threshold at which repeated tool calls in one turn should stop.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Tool assumed for JSON payloads that do not name one.
pub const DEFAULT_FALLBACK_TOOL: &str = "dc_bash";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Complete calls per turn before `should_break` fires. Default: 3.
    pub max_attempts: u32,
    /// Tool name for JSON calls with no `tool`/`name` key.
    pub fallback_tool: String,
    /// Identifiers of the tools with parameter rules.
    pub tools: ToolNames,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            fallback_tool: DEFAULT_FALLBACK_TOOL.to_string(),
            tools: ToolNames::default(),
        }
    }
}

/// Identifiers of the tools known to the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolNames {
    pub shell: String,
    pub computer: String,
    pub editor: String,
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            shell: DEFAULT_FALLBACK_TOOL.to_string(),
            computer: "dc_computer".to_string(),
            editor: "dc_str_replace_editor".to_string(),
        }
    }
}

impl Config {
    /// Default location: `<config dir>/toolcall-buffer/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("toolcall-buffer").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".toolcall-buffer/config.toml"))
    }

    /// Load from `path`, or from [`Config::default_path`] when `None`.
    ///
    /// A missing file at the default location yields the defaults. An explicit
    /// path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map_or_else(Self::default_path, Path::to_path_buf);

        if path.is_none() && !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
                path: config_path.clone(),
                source,
            })?;
        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: config_path,
                source,
            },
            other => other,
        })
    }

    /// Parse TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.fallback_tool.trim().is_empty() {
            return Err(ConfigError::Invalid("fallback_tool must not be empty".into()));
        }
        let names = [&self.tools.shell, &self.tools.computer, &self.tools.editor];
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::Invalid("tool names must not be empty".into()));
        }
        Ok(())
    }

    /// Settings for a new [`crate::buffer::StreamingToolCallBuffer`].
    pub fn buffer_config(&self) -> BufferConfig {
        BufferConfig {
            max_attempts: self.max_attempts,
            fallback_tool: self.fallback_tool.clone(),
        }
    }
}
