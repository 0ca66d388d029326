//! Deployment Orchestrator
//!
//! Drives one run: prepare the target, resolve order, evaluate scripts one at a
//! time, stop on the first run-ending status. Never panics on collaborator
//! failure; every error becomes a failed [`DeploymentResult`] that keeps the
//! statuses recorded so far.

use crate::cancel::CancellationToken;
use crate::decision::ScriptEvaluator;
use crate::error::DeployError;
use crate::options::DeploymentOptions;
use crate::ports::{DeploySource, DeployTarget};
use crate::resolver;
use crate::result::DeploymentResult;
use crate::script::Script;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

pub struct DeploymentService {
    source: Arc<dyn DeploySource>,
    target: Arc<dyn DeployTarget>,
    options: DeploymentOptions,
}

impl DeploymentService {
    pub fn new(
        source: Arc<dyn DeploySource>,
        target: Arc<dyn DeployTarget>,
        options: DeploymentOptions,
    ) -> Self {
        Self {
            source,
            target,
            options,
        }
    }

    pub fn options(&self) -> &DeploymentOptions {
        &self.options
    }

    /// Deploy `scripts`. Content and hashes are filled in place.
    pub async fn deploy(
        &self,
        scripts: &mut [Script],
        cancel: &CancellationToken,
    ) -> DeploymentResult {
        let run_id = Uuid::now_v7();
        let span = info_span!("deployment", %run_id, scripts = scripts.len());

        let mut result = DeploymentResult::started(run_id);
        match self.run(scripts, cancel, &mut result).instrument(span).await {
            Ok(()) => {
                info!(
                    %run_id,
                    evaluated = result.deployment_order().len(),
                    "Deployment completed"
                );
                result
            }
            Err(e) => {
                let message = format!("{e:#}");
                if e.is_structural() {
                    error!(%run_id, error = %message, "Deployment rejected before execution");
                } else {
                    error!(%run_id, error = %message, "Deployment failed");
                }
                result.fail(message)
            }
        }
    }

    async fn run(
        &self,
        scripts: &mut [Script],
        cancel: &CancellationToken,
        result: &mut DeploymentResult,
    ) -> Result<(), DeployError> {
        info!("Prepare to deploy");
        self.target.prepare_to_deploy(cancel).await?;
        debug!("Prepare completed");

        let order = resolver::resolve_order(scripts)?;
        if order.is_empty() {
            info!("No scripts to deploy");
            return Ok(());
        }
        debug!(count = order.len(), "Resolved deployment order");

        let mut evaluator = ScriptEvaluator::new(
            self.source.as_ref(),
            self.target.as_ref(),
            self.options.clone(),
        );

        for idx in order {
            let script = &mut scripts[idx];
            if cancel.is_cancelled() {
                return Err(DeployError::Cancelled(script.script_key.clone()));
            }

            let status = evaluator.evaluate(script, cancel).await?;
            result.record(script.script_key.clone(), status);

            if status.is_run_ending() {
                return Err(DeployError::ScriptRejected {
                    key: script.script_key.clone(),
                    status,
                });
            }
        }

        Ok(())
    }
}
