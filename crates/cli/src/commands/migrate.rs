//! Brings the conversation log schema up to date and reports what changed.

use codbot_core::config::{AppConfig, LoadOptions};
use codbot_db::{connect_with_settings, migrations, DbPool};
use serde_json::json;

use crate::commands::CommandResult;

pub const CONVERSATION_TABLE: &str = "conversation_message";

#[derive(Debug)]
struct MigrationReport {
    applied_versions: Vec<i64>,
    newly_applied: Vec<i64>,
}

#[derive(Debug)]
struct MigrateFailure {
    error_class: &'static str,
    message: String,
    exit_code: u8,
}

impl MigrateFailure {
    fn new(error_class: &'static str, message: impl Into<String>, exit_code: u8) -> Self {
        Self { error_class, message: message.into(), exit_code }
    }
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| MigrateFailure::new("db_connectivity", error.to_string(), 4))?;

        let report = migrate_and_verify(&pool).await;
        pool.close().await;
        report
    });

    match result {
        Ok(report) => {
            let message = match report.newly_applied.len() {
                0 => "schema already up to date".to_string(),
                count => format!("applied {count} pending migration(s)"),
            };
            CommandResult::success_with_detail(
                "migrate",
                message,
                json!({
                    "database_url": config.database.url,
                    "applied_versions": report.applied_versions,
                    "newly_applied": report.newly_applied,
                    "conversation_table": CONVERSATION_TABLE,
                }),
            )
        }
        Err(failure) => CommandResult::failure(
            "migrate",
            failure.error_class,
            failure.message,
            failure.exit_code,
        ),
    }
}

async fn migrate_and_verify(pool: &DbPool) -> Result<MigrationReport, MigrateFailure> {
    let before = migrations::applied_versions(pool)
        .await
        .map_err(|error| MigrateFailure::new("migration", error.to_string(), 5))?;

    migrations::run_pending(pool)
        .await
        .map_err(|error| MigrateFailure::new("migration", error.to_string(), 5))?;

    let applied_versions = migrations::applied_versions(pool)
        .await
        .map_err(|error| MigrateFailure::new("migration", error.to_string(), 5))?;

    let has_table = migrations::table_exists(pool, CONVERSATION_TABLE)
        .await
        .map_err(|error| MigrateFailure::new("schema_verification", error.to_string(), 5))?;
    if !has_table {
        return Err(MigrateFailure::new(
            "schema_verification",
            format!("table `{CONVERSATION_TABLE}` missing after migration"),
            5,
        ));
    }

    let newly_applied =
        applied_versions.iter().copied().filter(|version| !before.contains(version)).collect();
    Ok(MigrationReport { applied_versions, newly_applied })
}
