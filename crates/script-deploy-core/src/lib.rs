//! script-deploy core
//!
//! Decides which scripts must run against a deployment target, in what order,
//! and records what ran. The crate is storage-agnostic: scripts are fetched
//! through a [`DeploySource`] and executed through a [`DeployTarget`], and
//! concrete adapters live in their own modules or crates.
//!
//! A run flows through three stages:
//!
//! 1. [`resolver`] orders the non-service scripts (grouped topological sort).
//! 2. [`decision`] evaluates one script at a time against the target.
//! 3. [`service`] drives the run and aggregates a [`DeploymentResult`].

pub mod builder;
pub mod cancel;
pub mod catalog;
pub mod decision;
pub mod error;
pub mod hashing;
pub mod manifest;
pub mod options;
pub mod ports;
pub mod render;
pub mod resolver;
pub mod result;
pub mod script;
pub mod service;
pub mod sources;
pub mod status;
pub mod targets;

pub use builder::DeployBuilder;
pub use cancel::{CancellationSource, CancellationToken};
pub use catalog::ScriptCatalog;
pub use error::DeployError;
pub use options::DeploymentOptions;
pub use ports::{DeploySource, DeployTarget};
pub use result::DeploymentResult;
pub use script::{DeployedInfo, Script, ScriptKey, ScriptParameters};
pub use service::DeploymentService;
pub use status::DeployScriptStatus;

/// Key of the bootstrap record a target writes when it creates its version table.
pub const INITIALIZE_VERSION: &str = "INITIALIZE_VERSION";

/// Re-exports of commonly used types
pub mod prelude {
    pub use crate::builder::DeployBuilder;
    pub use crate::cancel::{CancellationSource, CancellationToken};
    pub use crate::catalog::ScriptCatalog;
    pub use crate::error::DeployError;
    pub use crate::options::DeploymentOptions;
    pub use crate::ports::{DeploySource, DeployTarget};
    pub use crate::result::DeploymentResult;
    pub use crate::script::{DeployedInfo, Script, ScriptKey, ScriptParameters};
    pub use crate::service::DeploymentService;
    pub use crate::sources::{EmbeddedSource, FileSystemSource};
    pub use crate::status::DeployScriptStatus;
    pub use crate::targets::MemoryTarget;
}
