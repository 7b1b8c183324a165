//! HelpChain engine
//!
//! Main application entry point. Prepares the database and keeps the
//! operator informed about overdue payment matches until shut down.

use anyhow::Context;
use std::time::Duration;
use tracing::{error, info, warn};

use HelpChain::{
    config::Settings,
    utils::{helpers::format_amount, logging},
    database::{create_pool, run_migrations, DatabaseService, PoolConfig},
    services::ServiceFactory,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("loading configuration")?;
    settings.validate().context("validating configuration")?;

    // Initialize logging
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", HelpChain::info());

    // Initialize database connection
    info!("Connecting to database...");
    let db_pool = create_pool(&PoolConfig::from(&settings.database))
        .await
        .context("connecting to database")?;

    // Run database migrations
    info!("Running database migrations...");
    run_migrations(&db_pool).await?;

    let services = ServiceFactory::with_defaults(DatabaseService::new(db_pool), &settings);

    let health = services.health_check().await;
    for issue in health.get_issues() {
        warn!(issue = %issue, "Health check issue");
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(settings.engine.overdue_scan_interval_seconds));
    info!(
        interval_seconds = settings.engine.overdue_scan_interval_seconds,
        "Overdue scan running, press Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = scan(&services).await {
                    error!(error = %e, "Overdue scan failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("HelpChain engine has been shut down.");
    Ok(())
}

/// Report state for the operator; never acts on what it finds
async fn scan(services: &ServiceFactory) -> HelpChain::Result<()> {
    let stats = services.engine_stats().await?;
    info!(
        pending_receivers = stats.pending_receivers,
        pending_givers = stats.pending_givers,
        live_matches = stats.live_matches,
        overdue_matches = stats.overdue_matches,
        active_bans = stats.active_bans,
        "Engine stats"
    );

    for view in services.deadline_monitor.overdue_matches().await? {
        let m = &view.payment_match;
        warn!(
            match_id = m.id,
            giver_id = m.giver_id,
            receiver_id = m.receiver_id,
            amount = %format_amount(m.amount),
            status = m.status.as_str(),
            "Payment match {}",
            view.deadline_status.describe()
        );
    }

    Ok(())
}
