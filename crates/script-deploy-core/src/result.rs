use crate::script::ScriptKey;
use crate::status::DeployScriptStatus;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

const UNDESCRIBED_FAILURE: &str = "deployment failed without an error message";

/// Outcome of one deployment run.
///
/// Statuses cover every non-service script evaluated up to and including the
/// first failure. A failed run keeps the statuses recorded before it stopped.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentResult {
    run_id: Uuid,
    error_message: Option<String>,
    deploy_script_statuses: HashMap<ScriptKey, DeployScriptStatus>,
    deployment_order: Vec<ScriptKey>,
}

impl DeploymentResult {
    pub(crate) fn started(run_id: Uuid) -> Self {
        Self {
            run_id,
            error_message: None,
            deploy_script_statuses: HashMap::new(),
            deployment_order: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, key: ScriptKey, status: DeployScriptStatus) {
        if self.deploy_script_statuses.insert(key.clone(), status).is_none() {
            self.deployment_order.push(key);
        }
    }

    /// Mark the run failed. A blank message is replaced.
    pub(crate) fn fail(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.error_message = Some(if message.trim().is_empty() {
            UNDESCRIBED_FAILURE.to_string()
        } else {
            message
        });
        self
    }

    pub fn is_success(&self) -> bool {
        self.error_message.is_none()
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn deploy_script_statuses(&self) -> &HashMap<ScriptKey, DeployScriptStatus> {
        &self.deploy_script_statuses
    }

    /// Keys in the order they were evaluated.
    pub fn deployment_order(&self) -> &[ScriptKey] {
        &self.deployment_order
    }

    pub fn status_of(&self, key: impl Into<ScriptKey>) -> Option<DeployScriptStatus> {
        self.deploy_script_statuses.get(&key.into()).copied()
    }

    /// Number of scripts with the given status.
    pub fn count(&self, status: DeployScriptStatus) -> usize {
        self.deploy_script_statuses
            .values()
            .filter(|s| **s == status)
            .count()
    }
}
