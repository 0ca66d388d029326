use crate::script::ScriptKey;
use crate::status::DeployScriptStatus;
use thiserror::Error;

/// Errors produced by the deployment engine.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Cyclic dependency detected for script: {0}")]
    CyclicDependency(ScriptKey),

    #[error("Duplicate script key: {0}")]
    DuplicateScriptKey(ScriptKey),

    #[error("Invalid script: {0}")]
    InvalidScript(String),

    #[error("{0} must be set")]
    MissingComponent(&'static str),

    #[error("Registration script '{key}' has no content")]
    EmptyRegistrationScript { key: ScriptKey },

    #[error("Script '{key}' was executed but could not be registered: {message}")]
    RegistrationFailed { key: ScriptKey, message: String },

    #[error("Script '{key}' stopped the deployment: {}", status.reason())]
    ScriptRejected {
        key: ScriptKey,
        status: DeployScriptStatus,
    },

    #[error("deployment cancelled before script '{0}'")]
    Cancelled(ScriptKey),

    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl DeployError {
    /// Structural errors are raised before any script executes.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::CyclicDependency(_) | Self::DuplicateScriptKey(_) | Self::InvalidScript(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_script() {
        let err = DeployError::CyclicDependency(ScriptKey::from("Script2"));
        assert_eq!(err.to_string(), "Cyclic dependency detected for script: Script2");

        let err = DeployError::ScriptRejected {
            key: ScriptKey::from("Script3"),
            status: DeployScriptStatus::DependencyMissing,
        };
        assert_eq!(
            err.to_string(),
            "Script 'Script3' stopped the deployment: required dependency is not deployed"
        );

        let err = DeployError::Cancelled(ScriptKey::from("A"));
        assert_eq!(err.to_string(), "deployment cancelled before script 'A'");
    }

    #[test]
    fn test_collaborator_error_is_transparent() {
        let err: DeployError = anyhow::anyhow!("connection refused").into();
        assert_eq!(err.to_string(), "connection refused");
        assert!(!err.is_structural());
    }
}
