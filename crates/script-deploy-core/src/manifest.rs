//! Script manifests
//!
//! Declarative script definitions loaded from YAML or JSON:
//!
//! ```yaml
//! scripts:
//!   - name: DeviceTypes
//!     depends_on: CommonIdentity
//!     description: Device type lookup table
//!   - name: SetDatabaseParameters
//!     can_repeat: true
//!     order_group: -1000
//! ```
//!
//! PascalCase field names (`Name`, `DependsOn`, `CanRepeat`, ...) are accepted too.

use crate::catalog::ScriptCatalog;
use crate::error::DeployError;
use crate::script::{Script, ScriptParameters};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported manifest format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid manifest: {0}")]
    Invalid(#[from] DeployError),
}

/// One script entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptManifest {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "DependsOn")]
    pub depends_on: Option<String>,
    #[serde(default, alias = "Description")]
    pub description: Option<String>,
    #[serde(default, alias = "CanRepeat")]
    pub can_repeat: bool,
    #[serde(default, alias = "OrderGroup")]
    pub order_group: i32,
    #[serde(default, alias = "IsService")]
    pub is_service: bool,
    #[serde(default, alias = "ActualBefore")]
    pub actual_before: Option<String>,
    #[serde(default, alias = "IsInitializeTarget")]
    pub is_initialize_target: bool,
    /// Locator handed to the source. Defaults to `<name>.sql`.
    #[serde(default, alias = "Source")]
    pub source: Option<String>,
    #[serde(default, alias = "Parameters")]
    pub parameters: ScriptParameters,
}

impl ScriptManifest {
    pub fn source_locator(&self) -> String {
        self.source
            .clone()
            .unwrap_or_else(|| format!("{}.sql", self.name))
    }

    pub fn to_script(&self) -> Script {
        let mut script = Script::new(self.name.as_str(), self.source_locator());
        script.depends_on = non_blank(&self.depends_on).map(Into::into);
        script.actual_before = non_blank(&self.actual_before).map(Into::into);
        script.description = self.description.clone();
        script.can_repeat = self.can_repeat;
        script.order_group = self.order_group;
        script.is_service = self.is_service;
        script.is_initialize_target = self.is_initialize_target;
        script.script_parameters = self.parameters.clone();
        script
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Top-level manifest document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestFile {
    #[serde(default, alias = "Scripts")]
    pub scripts: Vec<ScriptManifest>,
}

impl ManifestFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Register every entry, in file order.
    pub fn into_catalog(self) -> Result<ScriptCatalog, ManifestError> {
        let mut catalog = ScriptCatalog::new();
        for entry in &self.scripts {
            catalog.register_script(entry.to_script())?;
        }
        Ok(catalog)
    }
}

/// Load a manifest, choosing the parser by file extension (`.yaml`, `.yml`, `.json`).
pub fn load_manifest(path: impl AsRef<Path>) -> Result<ManifestFile, ManifestError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let manifest = match extension.as_str() {
        "yaml" | "yml" => ManifestFile::from_yaml(&content)?,
        "json" => ManifestFile::from_json(&content)?,
        other => return Err(ManifestError::UnsupportedFormat(other.to_string())),
    };

    tracing::debug!(
        path = %path.display(),
        scripts = manifest.scripts.len(),
        "Loaded script manifest"
    );
    Ok(manifest)
}
