//! Deployment Decision State Machine
//!
//! Evaluates one script against the target. Checks run in fixed priority and
//! short-circuit on the first decisive outcome:
//!
//! 1. Actuality: `actual_before` already deployed -> `NotActual`
//! 2. Content: missing or empty -> `WrongContent`; hash repeatable scripts
//! 3. Already deployed: run-once, or repeatable with an unchanged hash -> `AlreadyDeployed`
//! 4. Dependency gate: `depends_on` not deployed -> `DependencyMissing`
//! 5. Execution
//! 6. Migration registration
//! 7. `Deployed`

use crate::cancel::CancellationToken;
use crate::error::DeployError;
use crate::hashing::{content_hash, hashes_match};
use crate::options::{DeploymentOptions, CONTENTS_HASH_PARAMETER, SCRIPT_KEY_PARAMETER};
use crate::ports::{DeploySource, DeployTarget};
use crate::script::Script;
use crate::status::DeployScriptStatus;
use tracing::{debug, info, warn};

/// Run-scoped evaluator. Owns the run's copy of [`DeploymentOptions`], so the
/// registration-disabled flag only ever flips false -> true within one run.
pub struct ScriptEvaluator<'a> {
    source: &'a dyn DeploySource,
    target: &'a dyn DeployTarget,
    options: DeploymentOptions,
}

impl<'a> ScriptEvaluator<'a> {
    pub fn new(
        source: &'a dyn DeploySource,
        target: &'a dyn DeployTarget,
        options: DeploymentOptions,
    ) -> Self {
        Self {
            source,
            target,
            options,
        }
    }

    pub fn registration_enabled(&self) -> bool {
        !self.options.disable_registration_of_migrations
    }

    /// Decide and, if warranted, execute `script`. Fills in its content and hash.
    pub async fn evaluate(
        &mut self,
        script: &mut Script,
        cancel: &CancellationToken,
    ) -> Result<DeployScriptStatus, DeployError> {
        let key = script.script_key.clone();

        if let Some(actual_before) = &script.actual_before {
            if self
                .target
                .get_deployed_info(actual_before, cancel)
                .await?
                .is_some()
            {
                info!(script_key = %key, actual_before = %actual_before, "Script is not actual");
                return Ok(DeployScriptStatus::NotActual);
            }
        }

        let content = self
            .source
            .get_script_content(&script.source, cancel)
            .await?
            .filter(|c| !c.is_empty());
        let Some(content) = content else {
            warn!(script_key = %key, source = %script.source, "Script content is empty");
            return Ok(DeployScriptStatus::WrongContent);
        };
        if script.can_repeat {
            script.contents_hash = Some(content_hash(&content));
        }
        script.content = Some(content);

        if let Some(deployed) = self.target.get_deployed_info(&key, cancel).await? {
            if !script.can_repeat {
                info!(script_key = %key, "Script is already deployed");
                return Ok(DeployScriptStatus::AlreadyDeployed);
            }
            if hashes_match(
                deployed.contents_hash.as_deref(),
                script.contents_hash.as_deref(),
            ) {
                info!(script_key = %key, "Repeatable script is unchanged");
                return Ok(DeployScriptStatus::AlreadyDeployed);
            }
            debug!(script_key = %key, "Repeatable script changed, deploying again");
        }

        if let Some(depends_on) = script.depends_on.as_ref().filter(|k| !k.is_empty()) {
            if self
                .target
                .get_deployed_info(depends_on, cancel)
                .await?
                .is_none()
            {
                warn!(script_key = %key, depends_on = %depends_on, "Dependency is not deployed");
                return Ok(DeployScriptStatus::DependencyMissing);
            }
        }

        info!(script_key = %key, "Deploying script");
        self.target.deploy_script(script, cancel).await?;

        self.register(script).await?;

        info!(script_key = %key, "Script deployed");
        Ok(DeployScriptStatus::Deployed)
    }

    /// Record a deployed script through the registration service script.
    ///
    /// Runs detached from the caller's cancellation: once a script has executed
    /// its registration must not be abandoned halfway.
    async fn register(&mut self, script: &Script) -> Result<(), DeployError> {
        if script.is_initialize_target || self.options.disable_registration_of_migrations {
            return Ok(());
        }

        let Some(registration) = self.options.insert_migration_script.as_mut() else {
            warn!(
                script_key = %script.script_key,
                "No migration registration script configured; registration disabled for this run"
            );
            self.options.disable_registration_of_migrations = true;
            return Ok(());
        };

        let detached = CancellationToken::none();

        if !registration.has_content() {
            let content = self
                .source
                .get_script_content(&registration.source, &detached)
                .await?
                .filter(|c| !c.is_empty())
                .ok_or_else(|| DeployError::EmptyRegistrationScript {
                    key: registration.script_key.clone(),
                })?;
            registration.content = Some(content);
        }

        registration.script_parameters.insert(
            SCRIPT_KEY_PARAMETER.to_string(),
            Some(script.script_key.to_string()),
        );
        registration.script_parameters.insert(
            CONTENTS_HASH_PARAMETER.to_string(),
            script.contents_hash.clone(),
        );

        self.target
            .deploy_script(registration, &detached)
            .await
            .map_err(|e| DeployError::RegistrationFailed {
                key: script.script_key.clone(),
                message: format!("{e:#}"),
            })?;

        debug!(script_key = %script.script_key, "Migration registered");
        Ok(())
    }
}
