//! Command implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use script_deploy_core::hashing::content_hash;
use script_deploy_core::manifest::load_manifest;
use script_deploy_core::prelude::*;
use script_deploy_core::resolver::sort_scripts;
use script_deploy_postgres::{PgTarget, PgTargetOptions};

use crate::settings::{DeploySettings, TargetKind};
use crate::OutputFormat;

/// Registration script used with the in-memory target.
const MEMORY_REGISTRATION: &str = "-- register {{ScriptKey}} {{ContentsHash}}";

/// A connected target plus what the commands need to know about it.
struct TargetHandle {
    target: Arc<dyn DeployTarget>,
    /// Built-in registration script of the target.
    registration: Script,
    pg: Option<Arc<PgTarget>>,
}

async fn connect_target(settings: &DeploySettings) -> Result<TargetHandle> {
    match settings.target.kind {
        TargetKind::Memory => Ok(TargetHandle {
            target: Arc::new(MemoryTarget::new()),
            registration: Script::service("InsertMigration", "InsertMigration")
                .with_content(MEMORY_REGISTRATION),
            pg: None,
        }),
        TargetKind::Postgres => {
            let options = PgTargetOptions::new(
                settings.target.version_table_schema.clone(),
                settings.target.version_table_name.clone(),
            )?;
            let url = settings.database_url()?;
            let pg = Arc::new(
                PgTarget::connect(&url, options)
                    .await
                    .context("Failed to connect to PostgreSQL")?,
            );
            Ok(TargetHandle {
                target: pg.clone(),
                registration: pg.insert_migration_script(),
                pg: Some(pg),
            })
        }
    }
}

fn load_scripts(settings: &DeploySettings) -> Result<Vec<Script>> {
    let catalog = load_manifest(&settings.manifest)?.into_catalog()?;
    Ok(catalog.build()?)
}

/// Pick the registration script: a manifest service script when configured,
/// otherwise the target's built-in one.
fn deployment_options(
    settings: &DeploySettings,
    scripts: &[Script],
    builtin: Script,
) -> Result<DeploymentOptions> {
    if !settings.registration.enabled {
        return Ok(DeploymentOptions::new().without_registration());
    }

    let registration = match &settings.registration.insert_migration_script {
        None => builtin,
        Some(key) => {
            let key = ScriptKey::from(key.as_str());
            let Some(script) = scripts.iter().find(|s| s.script_key == key) else {
                bail!("Registration script '{key}' is not in the manifest");
            };
            if !script.is_service {
                bail!("Registration script '{key}' must be a service script");
            }
            script.clone()
        }
    };

    Ok(DeploymentOptions::new().with_insert_migration_script(registration))
}

// =============================================================================
// plan
// =============================================================================

pub fn cmd_plan(settings: &DeploySettings, format: OutputFormat) -> Result<()> {
    let scripts = load_scripts(settings)?;
    let ordered = sort_scripts(&scripts)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "success": true,
                "count": ordered.len(),
                "scripts": ordered.iter().map(|s| serde_json::json!({
                    "script_key": s.script_key,
                    "order_group": s.order_group,
                    "depends_on": s.depends_on,
                    "actual_before": s.actual_before,
                    "can_repeat": s.can_repeat,
                    "source": s.source,
                    "description": s.description,
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text | OutputFormat::Pretty => {
            println!(
                "{} {} script(s) in deployment order",
                "OK".green().bold(),
                ordered.len()
            );
            for (i, script) in ordered.iter().enumerate() {
                let mut line = format!(
                    "{:>4}. [{}] {}",
                    i + 1,
                    script.order_group,
                    script.script_key
                );
                if let Some(dep) = &script.depends_on {
                    line.push_str(&format!(" <- {dep}"));
                }
                if script.can_repeat {
                    line.push_str(" (repeatable)");
                }
                println!("{line}");
                if let Some(description) = &script.description {
                    if format == OutputFormat::Pretty {
                        println!("        {}", description.dimmed());
                    }
                }
            }
        }
    }

    Ok(())
}

// =============================================================================
// deploy
// =============================================================================

pub async fn cmd_deploy(
    settings: &DeploySettings,
    format: OutputFormat,
    cancel: CancellationToken,
) -> Result<()> {
    let mut scripts = load_scripts(settings)?;
    let handle = connect_target(settings).await?;
    let options = deployment_options(settings, &scripts, handle.registration)?;

    let service = DeployBuilder::new()
        .source(FileSystemSource::new(&settings.scripts_dir))
        .shared_target(handle.target)
        .options(options)
        .build()?;

    let result = service.deploy(&mut scripts, &cancel).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text | OutputFormat::Pretty => print_result(&result, format),
    }

    match result.error_message() {
        None => Ok(()),
        Some(message) => bail!("{message}"),
    }
}

fn print_result(result: &DeploymentResult, format: OutputFormat) {
    for key in result.deployment_order() {
        let Some(status) = result.status_of(key) else { continue };
        let label = match (format, status) {
            (OutputFormat::Text, s) => s.as_str().normal(),
            (_, DeployScriptStatus::Deployed) => status.as_str().green().bold(),
            (_, DeployScriptStatus::AlreadyDeployed | DeployScriptStatus::NotActual) => {
                status.as_str().dimmed()
            }
            (_, s) if s.is_run_ending() => s.as_str().red().bold(),
            (_, s) => s.as_str().yellow(),
        };
        println!("  {:<40} {}", key.to_string(), label);
    }

    if result.is_success() {
        println!(
            "{} {} deployed, {} skipped (run {})",
            "OK".green().bold(),
            result.count(DeployScriptStatus::Deployed),
            result.deployment_order().len() - result.count(DeployScriptStatus::Deployed),
            result.run_id()
        );
    }
}

// =============================================================================
// status
// =============================================================================

pub async fn cmd_status(
    settings: &DeploySettings,
    format: OutputFormat,
    history: bool,
) -> Result<()> {
    let handle = connect_target(settings).await?;

    if history {
        let Some(pg) = &handle.pg else {
            bail!("--history requires a postgres target");
        };
        let records = pg.history().await?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
            OutputFormat::Text | OutputFormat::Pretty => {
                for record in &records {
                    println!(
                        "{:>6}  {}  {:<40} {}",
                        record.id,
                        record.deployed_at.format("%Y-%m-%d %H:%M:%S"),
                        record.script_key,
                        record.contents_hash.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        return Ok(());
    }

    let scripts = load_scripts(settings)?;
    let cancel = CancellationToken::none();
    let mut rows = Vec::new();
    for script in sort_scripts(&scripts)? {
        let info = handle
            .target
            .get_deployed_info(&script.script_key, &cancel)
            .await?;
        rows.push((script.script_key.clone(), info));
    }

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = rows
                .iter()
                .map(|(key, info)| {
                    serde_json::json!({
                        "script_key": key,
                        "deployed": info.is_some(),
                        "contents_hash": info.as_ref().and_then(|i| i.contents_hash.clone()),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text | OutputFormat::Pretty => {
            let deployed = rows.iter().filter(|(_, info)| info.is_some()).count();
            for (key, info) in &rows {
                let state = match (info, format) {
                    (Some(_), OutputFormat::Pretty) => "deployed".green(),
                    (None, OutputFormat::Pretty) => "pending".yellow(),
                    (Some(_), _) => "deployed".normal(),
                    (None, _) => "pending".normal(),
                };
                println!("  {:<40} {}", key.to_string(), state);
            }
            println!("{deployed}/{} deployed", rows.len());
        }
    }

    Ok(())
}

// =============================================================================
// hash
// =============================================================================

pub fn cmd_hash(file: &Path, format: OutputFormat) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let hash = content_hash(&content);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "file": file.display().to_string(), "hash": hash });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text | OutputFormat::Pretty => println!("{hash}"),
    }
    Ok(())
}
