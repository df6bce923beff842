use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Hidden per-project directory holding the configuration and the symbol store.
pub const WORKSPACE_DIR: &str = ".srcnav";
const WORKSPACE_FILE: &str = "workspace.toml";
const SYMBOL_STORE_FILE: &str = "symbols.db";
pub const DEFAULT_DEFINES_FILE: &str = "build_options.ini";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub ignored_directories: Vec<String>,
    #[serde(default)]
    pub defines_file: Option<String>,
    #[serde(default)]
    pub fold_inactive_regions: bool,
}

impl WorkspaceConfig {
    pub fn load(root: impl AsRef<Path>) -> Result<Self, WorkspaceConfigError> {
        let path = config_path(root);
        let contents = fs::read_to_string(&path)?;
        let mut config: Self = toml::from_str(&contents)?;
        config.normalize();
        Ok(config)
    }

    pub fn load_or_default(root: impl AsRef<Path>) -> Result<Self, WorkspaceConfigError> {
        match Self::load(root) {
            Ok(config) => Ok(config),
            Err(WorkspaceConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(err) => Err(err),
        }
    }

    pub fn save(&self, root: impl AsRef<Path>) -> Result<(), WorkspaceConfigError> {
        let path = config_path(&root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        Ok(())
    }

    pub fn ignored_directories(&self) -> impl Iterator<Item = &str> {
        self.ignored_directories.iter().map(|entry| entry.as_str())
    }

    /// Location of the defines source file for this project.
    pub fn defines_path(&self, root: impl AsRef<Path>) -> PathBuf {
        let file = self
            .defines_file
            .as_deref()
            .unwrap_or(DEFAULT_DEFINES_FILE);
        root.as_ref().join(file)
    }

    fn normalize(&mut self) {
        self.ignored_directories
            .iter_mut()
            .for_each(|entry| *entry = entry.trim().to_string());
        self.ignored_directories
            .retain(|entry| !entry.is_empty());

        if self
            .defines_file
            .as_deref()
            .is_some_and(|file| file.trim().is_empty())
        {
            self.defines_file = None;
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkspaceConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse workspace configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize workspace configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

fn config_path(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref()
        .join(WORKSPACE_DIR)
        .join(WORKSPACE_FILE)
}

/// Canonical location of the symbol store for a project root.
pub fn symbol_store_path(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref()
        .join(WORKSPACE_DIR)
        .join(SYMBOL_STORE_FILE)
}

impl fmt::Display for WorkspaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WorkspaceConfig(defines_file={:?}, fold={})",
            self.defines_file, self.fold_inactive_regions
        )
    }
}
