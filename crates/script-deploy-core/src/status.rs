use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of evaluating one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployScriptStatus {
    #[default]
    Unknown,
    /// The script's `actual_before` key is already deployed.
    NotActual,
    /// Source returned no content or empty content.
    WrongContent,
    AlreadyDeployed,
    Deployed,
    /// The script's `depends_on` key is not deployed.
    DependencyMissing,
}

impl DeployScriptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::NotActual => "not_actual",
            Self::WrongContent => "wrong_content",
            Self::AlreadyDeployed => "already_deployed",
            Self::Deployed => "deployed",
            Self::DependencyMissing => "dependency_missing",
        }
    }

    /// Statuses that stop the run after being recorded.
    pub fn is_run_ending(&self) -> bool {
        matches!(self, Self::WrongContent | Self::DependencyMissing)
    }

    /// Human-readable reason used in run error messages.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unknown => "status could not be determined",
            Self::NotActual => "script is superseded by an already deployed script",
            Self::WrongContent => "script content is missing or empty",
            Self::AlreadyDeployed => "script is already deployed",
            Self::Deployed => "script was deployed",
            Self::DependencyMissing => "required dependency is not deployed",
        }
    }
}

impl fmt::Display for DeployScriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
