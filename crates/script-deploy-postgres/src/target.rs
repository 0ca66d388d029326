//! PostgreSQL Deploy Target
//!
//! - `prepare_to_deploy` creates the version schema/table when absent and
//!   records the `INITIALIZE_VERSION` bootstrap row
//! - `get_deployed_info` reads the latest row for a key (case-insensitive)
//! - `deploy_script` renders `{{Name}}` tokens and runs the script in its own
//!   transaction; a cancelled run rolls back the script in flight. Initialize
//!   target scripts write their own version row in that transaction

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use script_deploy_core::render::{render_parameters, ParameterQuoting};
use script_deploy_core::{
    CancellationToken, DeployTarget, DeployedInfo, Script, ScriptKey, INITIALIZE_VERSION,
};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};

use crate::error::PgTargetError;
use crate::options::PgTargetOptions;

const CREATE_VERSION_TABLE: &str = include_str!("../sql/create_version_table.sql");
const INSERT_MIGRATION: &str = include_str!("../sql/insert_migration.sql");

/// Key of the built-in registration script.
pub const INSERT_MIGRATION_KEY: &str = "InsertMigration";

#[derive(Debug, Clone, FromRow)]
struct DeployedRow {
    script_key: String,
    contents_hash: Option<String>,
}

/// One row of the version table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DeploymentRecord {
    pub id: i64,
    pub script_key: String,
    pub contents_hash: Option<String>,
    pub deployed_at: DateTime<Utc>,
}

pub struct PgTarget {
    pool: PgPool,
    options: PgTargetOptions,
}

impl PgTarget {
    pub fn new(pool: PgPool, options: PgTargetOptions) -> Result<Self, PgTargetError> {
        options.validate()?;
        Ok(Self { pool, options })
    }

    pub async fn connect(
        database_url: &str,
        options: PgTargetOptions,
    ) -> Result<Self, PgTargetError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Self::new(pool, options)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn options(&self) -> &PgTargetOptions {
        &self.options
    }

    /// Registration service script writing into this target's version table.
    pub fn insert_migration_script(&self) -> Script {
        Script::service(INSERT_MIGRATION_KEY, INSERT_MIGRATION_KEY).with_content(INSERT_MIGRATION)
    }

    /// Every row of the version table, oldest first.
    pub async fn history(&self) -> Result<Vec<DeploymentRecord>, PgTargetError> {
        let sql = format!(
            "SELECT id, script_key, contents_hash, deployed_at FROM {} ORDER BY id",
            self.options.qualified_table()
        );
        Ok(sqlx::query_as::<_, DeploymentRecord>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    fn record_sql(&self) -> String {
        format!(
            "INSERT INTO {} (script_key, contents_hash) VALUES ($1, $2)",
            self.options.qualified_table()
        )
    }

    async fn version_table_exists(&self) -> Result<bool, PgTargetError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = $1 AND table_name = $2
            )
            "#,
        )
        .bind(&self.options.schema)
        .bind(&self.options.table)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_version_table(&self) -> Result<(), PgTargetError> {
        let ddl = render_template(CREATE_VERSION_TABLE, &self.options);
        let mut tx = self.pool.begin().await?;
        sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(&ddl)).await?;
        sqlx::query(&self.record_sql())
            .bind(INITIALIZE_VERSION)
            .bind(None::<&str>)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(table = %self.options.qualified_table(), "Version table created");
        Ok(())
    }
}

/// Substitute the target's own table tokens, verbatim.
fn render_template(sql: &str, options: &PgTargetOptions) -> String {
    render_parameters(sql, &options.template_parameters(), ParameterQuoting::Raw)
}

/// Final SQL for `script`: table tokens first, then the script's own
/// parameters as SQL literals.
pub fn render_script(script: &Script, options: &PgTargetOptions) -> Result<String, PgTargetError> {
    let content = script
        .content
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| PgTargetError::MissingContent(script.script_key.clone()))?;

    let with_table = render_template(content, options);
    Ok(render_parameters(
        &with_table,
        &script.script_parameters,
        ParameterQuoting::Sql,
    ))
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    operation: &'static str,
    fut: impl Future<Output = Result<T, PgTargetError>>,
) -> Result<T, PgTargetError> {
    tokio::select! {
        result = fut => result,
        _ = cancel.cancelled() => Err(PgTargetError::Cancelled(operation)),
    }
}

#[async_trait]
impl DeployTarget for PgTarget {
    async fn prepare_to_deploy(&self, cancel: &CancellationToken) -> anyhow::Result<()> {
        cancellable(cancel, "prepare_to_deploy", async {
            if self.version_table_exists().await? {
                debug!(table = %self.options.qualified_table(), "Version table exists");
            } else {
                self.create_version_table().await?;
            }
            Ok::<_, PgTargetError>(())
        })
        .await?;
        Ok(())
    }

    async fn get_deployed_info(
        &self,
        key: &ScriptKey,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<DeployedInfo>> {
        let sql = format!(
            "SELECT script_key, contents_hash FROM {} \
             WHERE lower(script_key) = lower($1) ORDER BY id DESC LIMIT 1",
            self.options.qualified_table()
        );

        let row = cancellable(cancel, "get_deployed_info", async {
            Ok::<_, PgTargetError>(
                sqlx::query_as::<_, DeployedRow>(&sql)
                    .bind(key.as_str())
                    .fetch_optional(&self.pool)
                    .await?,
            )
        })
        .await?;

        Ok(row.map(|r| DeployedInfo::new(r.script_key, r.contents_hash)))
    }

    async fn deploy_script(
        &self,
        script: &Script,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let sql = render_script(script, &self.options)?;
        debug!(script_key = %script.script_key, bytes = sql.len(), "Executing script");

        cancellable(cancel, "deploy_script", async {
            let mut tx = self.pool.begin().await?;
            sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(&sql)).await?;
            // Bootstrap scripts bypass generic registration and record themselves.
            if script.is_initialize_target {
                sqlx::query(&self.record_sql())
                    .bind(script.script_key.as_str())
                    .bind(script.contents_hash.as_deref())
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
            Ok::<_, PgTargetError>(())
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use script_deploy_core::options::{CONTENTS_HASH_PARAMETER, SCRIPT_KEY_PARAMETER};

    #[test]
    fn test_registration_sql() {
        let options = PgTargetOptions::default();
        let script = Script::service(INSERT_MIGRATION_KEY, INSERT_MIGRATION_KEY)
            .with_content(INSERT_MIGRATION)
            .with_parameter(SCRIPT_KEY_PARAMETER, Some("Device'Types".into()))
            .with_parameter(CONTENTS_HASH_PARAMETER, None);

        let sql = render_script(&script, &options).unwrap();
        assert!(sql.contains("INSERT INTO public.script_migrations"));
        assert!(sql.contains("VALUES ('Device''Types', NULL)"));
    }

    #[test]
    fn test_create_table_template() {
        let options = PgTargetOptions::new("deploy", "versions").unwrap();
        let ddl = render_template(CREATE_VERSION_TABLE, &options);
        assert!(ddl.contains("CREATE SCHEMA IF NOT EXISTS deploy;"));
        assert!(ddl.contains("CREATE TABLE IF NOT EXISTS deploy.versions"));
        assert!(ddl.contains("versions_script_key_idx"));
        assert!(!ddl.contains("{{"));
    }

    #[tokio::test]
    async fn test_record_sql_targets_version_table() {
        let options = PgTargetOptions::new("deploy", "versions").unwrap();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/unused")
            .unwrap();
        let target = PgTarget::new(pool, options).unwrap();
        assert_eq!(
            target.record_sql(),
            "INSERT INTO deploy.versions (script_key, contents_hash) VALUES ($1, $2)"
        );
    }

    #[test]
    fn test_missing_content() {
        let err =
            render_script(&Script::new("A", "a.sql"), &PgTargetOptions::default()).unwrap_err();
        assert!(matches!(err, PgTargetError::MissingContent(key) if key.as_str() == "A"));
    }

    #[test]
    fn test_user_parameters_are_literals() {
        let script = Script::new("A", "a.sql")
            .with_content("SELECT {{Name}} FROM {{VersionTable}}")
            .with_parameter("Name", Some("x".into()));
        let sql = render_script(&script, &PgTargetOptions::default()).unwrap();
        assert_eq!(sql, "SELECT 'x' FROM public.script_migrations");
    }
}
