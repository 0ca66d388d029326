use script_deploy_core::ScriptKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PgTargetError {
    #[error("Invalid identifier '{0}': expected lowercase letters, digits and underscores, at most 63 characters")]
    InvalidIdentifier(String),

    #[error("Script '{0}' has no content to execute")]
    MissingContent(ScriptKey),

    #[error("Operation cancelled: {0}")]
    Cancelled(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
