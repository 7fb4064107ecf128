//! Configuration data structures

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured workspace directory
pub const WORKSPACE_ENV: &str = "PHASEGATE_WORKSPACE";

/// Logging level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "info")]
    #[default]
    Info,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "trace")]
    Trace,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Directory holding one sub-directory per variant plus the audit trail
    pub workspace_dir: PathBuf,
    /// Directory of `<template>.md` prompt overrides
    pub prompts_dir: Option<PathBuf>,
    /// Logging verbosity level
    pub log_level: LogLevel,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::from("ventures"),
            prompts_dir: None,
            log_level: LogLevel::Info,
        }
    }
}

/// Where the effective workspace directory came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceSource {
    /// `--workspace` flag
    Flag,
    /// `PHASEGATE_WORKSPACE` environment variable
    Environment,
    /// Configuration file or built-in default
    Config,
}

impl Configuration {
    /// Load configuration from file, falling back to defaults when it doesn't exist
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Configuration = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Configuration::default())
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn default_config_path() -> anyhow::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("phasegate").join("config.toml"))
    }

    /// Resolve the workspace directory: flag, then environment, then config
    pub fn resolve_workspace(&self, flag: Option<PathBuf>) -> (PathBuf, WorkspaceSource) {
        self.resolve_workspace_with_env(flag, std::env::var_os(WORKSPACE_ENV).map(PathBuf::from))
    }

    pub fn resolve_workspace_with_env(
        &self,
        flag: Option<PathBuf>,
        env_value: Option<PathBuf>,
    ) -> (PathBuf, WorkspaceSource) {
        if let Some(path) = flag {
            (path, WorkspaceSource::Flag)
        } else if let Some(path) = env_value.filter(|p| !p.as_os_str().is_empty()) {
            (path, WorkspaceSource::Environment)
        } else {
            (self.workspace_dir.clone(), WorkspaceSource::Config)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.workspace_dir.as_os_str().is_empty() {
            errors.push("workspace_dir cannot be empty".to_string());
        }

        if let Some(prompts_dir) = &self.prompts_dir {
            if prompts_dir.as_os_str().is_empty() {
                errors.push("prompts_dir cannot be empty when set".to_string());
            } else if prompts_dir.exists() && !prompts_dir.is_dir() {
                errors.push(format!(
                    "prompts_dir {} is not a directory",
                    prompts_dir.display()
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
