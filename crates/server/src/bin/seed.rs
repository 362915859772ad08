use anyhow::Context;
use config::Settings;
use db::DBService;
use services::services::seed::{ADMIN_EMAIL, seed_database};
use tracing_subscriber::{EnvFilter, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn,seed=info,services=info,db=info"))
        .context("Failed to create tracing filter")?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let settings = Settings::from_env();
    let db = DBService::new(&settings.database_url)
        .await
        .with_context(|| format!("Failed to open {}", settings.database_url))?;

    let report = seed_database(&db.pool, settings.default_theme_status()).await?;
    tracing::info!(
        admin_created = report.admin_created,
        teams = report.teams,
        project_types = report.project_types,
        task_types = report.task_types,
        theme_created = report.theme_created,
        "Seeding finished"
    );
    if report.admin_created {
        tracing::info!(email = ADMIN_EMAIL, "Default admin account is ready");
    }
    Ok(())
}
