//! Collaborator ports.
//!
//! The orchestrator only talks to the outside world through these two traits.
//! Adapters return `anyhow::Result`; the orchestrator turns any error into a
//! failed [`crate::DeploymentResult`].

use crate::cancel::CancellationToken;
use crate::script::{DeployedInfo, Script, ScriptKey};
use async_trait::async_trait;

/// Where script text comes from.
#[async_trait]
pub trait DeploySource: Send + Sync {
    /// Fetch the content behind `locator`. A missing script is `Ok(None)`.
    async fn get_script_content(
        &self,
        locator: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<String>>;
}

/// The system scripts are deployed into.
#[async_trait]
pub trait DeployTarget: Send + Sync {
    /// Called once at the start of every run, before ordering.
    async fn prepare_to_deploy(&self, _cancel: &CancellationToken) -> anyhow::Result<()> {
        Ok(()) // Default: nothing to prepare
    }

    /// Latest deployment record for `key`, if any.
    async fn get_deployed_info(
        &self,
        key: &ScriptKey,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<DeployedInfo>>;

    /// Execute `script`. Must return an error when execution fails.
    ///
    /// Also used to run the registration script.
    async fn deploy_script(
        &self,
        script: &Script,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()>;
}
