//! Workforce Tracker
//!
//! HTTP API for time tracking against work queues, with a daily sweep that
//! closes tasks left open past end of business.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use workforce_tracker::api::{AppState, start_server};
use workforce_tracker::cli::{AddUserArgs, Cli, Command};
use workforce_tracker::clock::{Clock, SystemClock};
use workforce_tracker::config::{Config, ConfigLoader, ConfigPaths};
use workforce_tracker::db::Database;
use workforce_tracker::logging::{self, LogDestination};
use workforce_tracker::queues::QueueCatalog;
use workforce_tracker::referrals::ReferralService;
use workforce_tracker::tracking::{TaskService, spawn_daily_sweep};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogDestination::parse(&cli.log), cli.verbose)?;

    let mut loader = match &cli.config {
        Some(path) => ConfigLoader::load_file(ConfigPaths::discover(), PathBuf::from(path))?,
        None => ConfigLoader::load()?,
    };
    if let Some(path) = loader.config_path() {
        info!("Using config file {}", path.display());
    }

    // CLI overrides sit above every config tier
    let config = loader.config_mut();
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let config = loader.into_config();

    match cli.command {
        Some(Command::Sweep) => run_sweep_once(&config)?,
        Some(Command::AddUser(args)) => run_add_user(&config, &args)?,
        Some(Command::Serve) | None => run_server(config).await?,
    }

    Ok(())
}

fn open_database(config: &Config) -> Result<Arc<Database>> {
    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path).with_context(|| {
        format!(
            "Failed to open database {}",
            config.server.db_path.display()
        )
    })?;
    Ok(Arc::new(db))
}

fn build_services(config: &Config, db: Arc<Database>) -> Result<(Arc<TaskService>, Arc<ReferralService>)> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.clock.zone()?));
    let queues = Arc::new(QueueCatalog::from_config(&config.queues));

    let tasks = Arc::new(TaskService::new(
        Arc::clone(&db),
        Arc::clone(&clock),
        queues,
        config.workday.clone(),
    ));
    let referrals = Arc::new(ReferralService::new(
        db,
        clock,
        config.referrals.stale_after_days,
    ));
    Ok((tasks, referrals))
}

fn run_sweep_once(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let (tasks, _) = build_services(config, db)?;
    let report = tasks.run_sweep()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_add_user(config: &Config, args: &AddUserArgs) -> Result<()> {
    let db = open_database(config)?;
    let zone = config.clock.zone()?;
    let user = db.create_user(&args.to_new_user(), SystemClock::new(zone).now())?;
    info!(user_id = %user.id, role = user.role.as_str(), "User created");
    println!("id:    {}", user.id);
    println!("token: {}", user.api_token);
    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    let db = open_database(&config)?;
    let (tasks, referrals) = build_services(&config, db)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweep = if config.workday.sweep_enabled {
        Some(spawn_daily_sweep(Arc::clone(&tasks), shutdown_rx.clone()))
    } else {
        info!("Scheduled sweep disabled");
        None
    };

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Dropping the sender would stop the server, so keep it alive.
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
                drop(shutdown_tx);
            }
        }
    });

    let state = AppState::new(tasks, referrals);
    start_server(state, &config.server.host, config.server.port, shutdown_rx).await?;

    if let Some(handle) = sweep {
        let _ = handle.await;
    }
    Ok(())
}
