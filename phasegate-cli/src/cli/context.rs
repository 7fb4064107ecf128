//! Per-invocation context: configuration, workspace and store

use anyhow::{Context, Result};
use phasegate_core::models::{Configuration, WorkspaceSource};
use phasegate_core::workflow::{PromptLibrary, VariantStore};
use std::path::PathBuf;

/// Everything a command handler needs from the environment
pub struct AppContext {
    pub config: Configuration,
    pub config_path: PathBuf,
    pub workspace: PathBuf,
    pub workspace_source: WorkspaceSource,
}

impl AppContext {
    /// Load configuration and resolve the workspace
    ///
    /// Precedence for the workspace: `--workspace`, then `PHASEGATE_WORKSPACE`,
    /// then the configuration file, then `./ventures`.
    pub fn load(config_flag: Option<PathBuf>, workspace_flag: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_flag {
            Some(path) => path,
            None => Configuration::default_config_path()
                .unwrap_or_else(|_| PathBuf::from("phasegate.toml")),
        };

        let config = Configuration::load_from_file(&config_path).with_context(|| {
            format!("Failed to load configuration from {}", config_path.display())
        })?;

        let (workspace, workspace_source) = config.resolve_workspace(workspace_flag);

        Ok(Self {
            config,
            config_path,
            workspace,
            workspace_source,
        })
    }

    /// Open the variant store for the resolved workspace
    pub fn store(&self) -> Result<VariantStore> {
        VariantStore::new(&self.workspace).with_context(|| {
            format!(
                "Failed to open workspace {}",
                self.workspace.display()
            )
        })
    }

    /// Prompt library honouring the configured overrides directory
    pub fn prompts(&self) -> PromptLibrary {
        PromptLibrary::new(self.config.prompts_dir.clone())
    }
}
