use crate::error::DeployError;
use crate::options::DeploymentOptions;
use crate::ports::{DeploySource, DeployTarget};
use crate::service::DeploymentService;
use std::sync::Arc;

/// Assembles a [`DeploymentService`] from its collaborators.
#[derive(Default)]
pub struct DeployBuilder {
    source: Option<Arc<dyn DeploySource>>,
    target: Option<Arc<dyn DeployTarget>>,
    options: DeploymentOptions,
}

impl DeployBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: impl DeploySource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn shared_source(mut self, source: Arc<dyn DeploySource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn target(mut self, target: impl DeployTarget + 'static) -> Self {
        self.target = Some(Arc::new(target));
        self
    }

    pub fn shared_target(mut self, target: Arc<dyn DeployTarget>) -> Self {
        self.target = Some(target);
        self
    }

    pub fn options(mut self, options: DeploymentOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<DeploymentService, DeployError> {
        Ok(DeploymentService::new(
            self.source.ok_or(DeployError::MissingComponent("Source"))?,
            self.target.ok_or(DeployError::MissingComponent("Target"))?,
            self.options,
        ))
    }
}
