//! Database migration phase
//!
//! Migrations are plain `sqlx` migration directories (`<version>_<name>.sql`).
//! `${key}` placeholders are substituted into each script before it runs.
//! MySQL schemas are created on demand before migrating; Postgres schemas
//! must already exist.

use crate::context::SchedulerSettings;
use crate::error::{DeploymentError, MigrationError, Result};
use crate::logging::logged;
use crate::PhaseResult;
use async_trait::async_trait;
use pushapps_scheduler::{operation_fn, OperationScheduler, WorkQueue};
use pushapps_types::{DatabaseDriver, Migration};
use sqlx::migrate::Migrator;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Applies one migration directory to one schema
#[async_trait]
pub trait SchemaMigrator: Send + Sync {
    async fn migrate(&self, migration: &Migration) -> std::result::Result<(), MigrationError>;
}

/// `sqlx`-backed migrator for MySQL and Postgres
#[derive(Debug, Default)]
pub struct SqlxMigrator;

impl SqlxMigrator {
    pub fn new() -> Self {
        Self
    }

    async fn create_mysql_database(migration: &Migration) -> std::result::Result<(), MigrationError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_with(mysql_options(migration)?)
            .await?;
        let statement = format!("CREATE DATABASE IF NOT EXISTS `{}`", migration.schema);
        if let Err(e) = sqlx::query(&statement).execute(&pool).await {
            error!(schema = %migration.schema, error = %e, "Unable to create database");
        }
        pool.close().await;
        Ok(())
    }

    fn configure(migrator: &mut Migrator, migration: &Migration) {
        if migration.repair {
            debug!(schema = %migration.schema, "Ignoring applied migrations missing from disk");
            migrator.set_ignore_missing(true);
        }
        apply_placeholders(migrator, &migration.placeholders);
    }
}

#[async_trait]
impl SchemaMigrator for SqlxMigrator {
    async fn migrate(&self, migration: &Migration) -> std::result::Result<(), MigrationError> {
        check_migration_dir(&migration.migration_dir).await?;

        let mut migrator = Migrator::new(Path::new(&migration.migration_dir)).await?;
        Self::configure(&mut migrator, migration);

        match migration.driver {
            DatabaseDriver::MySql => {
                Self::create_mysql_database(migration).await?;
                let pool = MySqlPoolOptions::new()
                    .max_connections(1)
                    .connect_with(mysql_options(migration)?.database(&migration.schema))
                    .await?;
                let applied = migrator.run(&pool).await;
                pool.close().await;
                applied?;
            }
            DatabaseDriver::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(pg_options(migration)?)
                    .await?;
                let applied = migrator.run(&pool).await;
                pool.close().await;
                applied?;
            }
        }
        Ok(())
    }
}

fn port(migration: &Migration) -> std::result::Result<u16, MigrationError> {
    migration
        .port
        .trim()
        .parse()
        .map_err(|_| MigrationError::InvalidPort(migration.port.clone()))
}

/// Server connection without a database selected
fn mysql_options(migration: &Migration) -> std::result::Result<MySqlConnectOptions, MigrationError> {
    Ok(MySqlConnectOptions::new()
        .host(&migration.host)
        .port(port(migration)?)
        .username(&migration.user)
        .password(&migration.password))
}

fn pg_options(migration: &Migration) -> std::result::Result<PgConnectOptions, MigrationError> {
    Ok(PgConnectOptions::new()
        .host(&migration.host)
        .port(port(migration)?)
        .username(&migration.user)
        .password(&migration.password)
        .database(&migration.schema))
}

/// Replaces `${key}` in every loaded script. Checksums stay those of the
/// files on disk.
fn apply_placeholders(migrator: &mut Migrator, placeholders: &BTreeMap<String, String>) {
    if placeholders.is_empty() {
        return;
    }

    let substituted: Vec<_> = migrator
        .migrations
        .iter()
        .map(|script| {
            let mut script = script.clone();
            let sql = placeholders
                .iter()
                .fold(script.sql.to_string(), |sql, (key, value)| {
                    sql.replace(&format!("${{{key}}}"), value)
                });
            script.sql = Cow::Owned(sql);
            script
        })
        .collect();
    migrator.migrations = Cow::Owned(substituted);
}

/// Fails unless `dir` exists and holds at least one `.sql` file
pub async fn check_migration_dir(dir: &str) -> std::result::Result<(), MigrationError> {
    if tokio::fs::metadata(dir).await.is_err() {
        return Err(MigrationError::MissingDirectory(dir.to_string()));
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.path().extension().is_some_and(|ext| ext == "sql") {
            return Ok(());
        }
    }
    Err(MigrationError::NoMigrations(dir.to_string()))
}

/// Runs every configured migration, each bounded by the migration timeout
pub struct DatabaseMigrator {
    migrator: Arc<dyn SchemaMigrator>,
    settings: SchedulerSettings,
    timeout_minutes: u64,
}

impl DatabaseMigrator {
    pub fn new(
        migrator: Arc<dyn SchemaMigrator>,
        settings: SchedulerSettings,
        timeout_minutes: u64,
    ) -> Self {
        Self {
            migrator,
            settings,
            timeout_minutes,
        }
    }

    #[instrument(skip_all, fields(migrations = migrations.len()))]
    pub async fn migrate(&self, migrations: Vec<Migration>) -> Result<Vec<PhaseResult<Migration>>> {
        if migrations.is_empty() {
            return Ok(Vec::new());
        }

        let schemas: Vec<&str> = migrations.iter().map(|m| m.schema.as_str()).collect();
        info!("Running migrations for schemas: {}", schemas.join(", "));

        let migrator = Arc::clone(&self.migrator);
        let minutes = self.timeout_minutes;
        let operation = operation_fn(move |migration: Migration| {
            let migrator = Arc::clone(&migrator);
            async move {
                let description = migration_description(&migration);
                logged(&description, async {
                    let limit = Duration::from_secs(minutes * 60);
                    match tokio::time::timeout(limit, migrator.migrate(&migration)).await {
                        Ok(result) => result.map_err(DeploymentError::from),
                        Err(_) => Err(DeploymentError::Timeout {
                            operation: description.clone(),
                            minutes,
                        }),
                    }
                })
                .await
            }
        });

        let report = OperationScheduler::builder(WorkQueue::from_items(migrations), operation)
            .action("Migrating databases")
            .max_in_flight(self.settings.max_in_flight)
            .retries(self.settings.retries)
            .description(migration_description)
            .build()?
            .run()
            .await?;

        Ok(report.results)
    }
}

fn migration_description(migration: &Migration) -> String {
    format!("Migrating {} schema {}.", migration.driver, migration.schema)
}
