//! Deployment settings loaded from YAML.
//!
//! Relative paths are resolved against the directory of the settings file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default settings path when neither `--config` nor `SCRIPT_DEPLOY_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "script-deploy.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Environment variable {0} is not set")]
    MissingEnv(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploySettings {
    /// Root directory of script files.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// Manifest listing the scripts (YAML or JSON).
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    #[serde(default)]
    pub target: TargetSettings,

    #[serde(default)]
    pub registration: RegistrationSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[default]
    Postgres,
    /// In-process target; nothing is persisted.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSettings {
    #[serde(default)]
    pub kind: TargetKind,

    /// Name of the environment variable holding the connection string.
    #[serde(default = "default_database_url_env")]
    pub database_url_env: String,

    #[serde(default = "default_version_table_schema")]
    pub version_table_schema: String,

    #[serde(default = "default_version_table_name")]
    pub version_table_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Key of a manifest service script used for registration. The target's
    /// built-in registration script is used when unset.
    #[serde(default)]
    pub insert_migration_script: Option<String>,
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("scripts")
}

fn default_manifest() -> PathBuf {
    PathBuf::from("scripts/manifest.yaml")
}

fn default_database_url_env() -> String {
    "DATABASE_URL".to_string()
}

fn default_version_table_schema() -> String {
    script_deploy_postgres::options::DEFAULT_SCHEMA.to_string()
}

fn default_version_table_name() -> String {
    script_deploy_postgres::options::DEFAULT_TABLE.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            kind: TargetKind::default(),
            database_url_env: default_database_url_env(),
            version_table_schema: default_version_table_schema(),
            version_table_name: default_version_table_name(),
        }
    }
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            insert_migration_script: None,
        }
    }
}

impl DeploySettings {
    /// Load settings from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_yaml(&content)?;
        Ok(settings.relative_to(path.parent().unwrap_or_else(|| Path::new("."))))
    }

    /// Load settings from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn relative_to(mut self, base: &Path) -> Self {
        if self.scripts_dir.is_relative() {
            self.scripts_dir = base.join(&self.scripts_dir);
        }
        if self.manifest.is_relative() {
            self.manifest = base.join(&self.manifest);
        }
        self
    }

    /// Connection string from the configured environment variable.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        std::env::var(&self.target.database_url_env)
            .map_err(|_| ConfigError::MissingEnv(self.target.database_url_env.clone()))
    }
}
