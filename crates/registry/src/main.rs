//! `fitreg-verify`: audit every scope of a registry database.
//!
//! Exits non-zero when any scope breaks the ordering rules. Pass
//! `--migrate` to apply pending migrations first, and `--json` to print the
//! per-scope reports to stdout.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fitreg_registry::{Registry, RegistryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fitreg_registry=info,fitreg_db=info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = RegistryConfig::from_env()?;
    let database_url = config
        .database_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;
    tracing::info!(
        on_delete = %config.on_delete,
        on_asset_delete = %config.on_asset_delete,
        "Loaded registry configuration"
    );

    // --- Database ---
    let pool = fitreg_db::create_pool(&database_url, config.max_connections).await?;
    fitreg_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--migrate") {
        fitreg_db::run_migrations(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    // --- Audit ---
    let reports = Registry::new(pool, config).verify_all().await?;
    if args.iter().any(|arg| arg == "--json") {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    let failing: Vec<_> = reports.iter().filter(|r| !r.is_ok()).collect();
    for report in &failing {
        tracing::error!(
            scope = %report.scope,
            violation = report.violation.as_deref().unwrap_or_default(),
            "Ordering violation"
        );
    }

    if failing.is_empty() {
        tracing::info!(scopes = reports.len(), "All scopes densely ranked");
        Ok(())
    } else {
        anyhow::bail!("{} of {} scopes violate the ordering rules", failing.len(), reports.len())
    }
}
