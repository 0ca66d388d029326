//! PostgreSQL deployment target for script-deploy.
//!
//! Keeps one row per registration in a version table and executes scripts with
//! `sqlx::raw_sql`, one transaction per script.
//!
//! All queries are runtime-checked (`sqlx::query`, not `sqlx::query!`): the
//! version table is created by this crate at deploy time.

pub mod error;
pub mod options;
pub mod target;

pub use error::PgTargetError;
pub use options::PgTargetOptions;
pub use target::{DeploymentRecord, PgTarget};
