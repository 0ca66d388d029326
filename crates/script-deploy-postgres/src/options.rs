use crate::error::PgTargetError;
use script_deploy_core::ScriptParameters;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_TABLE: &str = "script_migrations";

/// Location of the version table.
///
/// Identifiers are interpolated into SQL unquoted, so only lowercase
/// `[a-z_][a-z0-9_]*` names are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgTargetOptions {
    pub schema: String,
    pub table: String,
}

impl Default for PgTargetOptions {
    fn default() -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl PgTargetOptions {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Result<Self, PgTargetError> {
        let options = Self {
            schema: schema.into(),
            table: table.into(),
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), PgTargetError> {
        validate_identifier(&self.schema)?;
        validate_identifier(&self.table)
    }

    /// `schema.table`
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Tokens available to the target's own SQL templates.
    pub(crate) fn template_parameters(&self) -> ScriptParameters {
        ScriptParameters::from([
            ("VersionTableSchema".to_string(), Some(self.schema.clone())),
            ("VersionTableName".to_string(), Some(self.table.clone())),
            ("VersionTable".to_string(), Some(self.qualified_table())),
        ])
    }
}

fn validate_identifier(ident: &str) -> Result<(), PgTargetError> {
    let mut chars = ident.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid_start && valid_rest && ident.len() <= 63 {
        Ok(())
    } else {
        Err(PgTargetError::InvalidIdentifier(ident.to_string()))
    }
}
