use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use quiz_persistence::DatabaseManager;
use quiz_persistence::repositories::{
    JobRepository, ParticipantRepository, ResponseRepository, SessionRepository,
};
use quiz_server::{
    auth::AuthService,
    broadcast::BroadcastHub,
    config::Config,
    create_routes,
    scheduler::{AdvancementQueue, AdvancementWorkers},
    session_service::SessionService,
};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting live quiz server...");

    let config = Config::from_env().context("invalid configuration")?;

    let database = DatabaseManager::connect_and_migrate(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    let db = database.get_connection().clone();

    let auth_service = if config.auth_dev_mode {
        info!("Starting in development authentication mode - JWT validation disabled");
        Arc::new(AuthService::new_dev_mode())
    } else {
        let secret = config
            .jwt_secret
            .as_deref()
            .context("JWT_SECRET is required outside dev mode")?;
        Arc::new(AuthService::new(secret))
    };

    let hub = Arc::new(BroadcastHub::new(config.broadcast_capacity));
    let queue = AdvancementQueue::new(JobRepository::new(db.clone()));

    let session_service = Arc::new(
        SessionService::new(
            SessionRepository::new(db.clone()).with_lock_retries(config.lock_retry_attempts),
            ParticipantRepository::new(db.clone()).with_lock_retries(config.lock_retry_attempts),
            ResponseRepository::new(db.clone()).with_lock_retries(config.lock_retry_attempts),
            hub.clone(),
            queue.clone(),
        )
        .with_leaderboard_on_answer(config.leaderboard_on_answer),
    );

    let workers = Arc::new(AdvancementWorkers::new(
        &queue,
        session_service.clone(),
        config.scheduler.clone(),
    ));
    workers
        .recover()
        .await
        .context("failed to recover stalled jobs")?;
    session_service
        .rearm_live_sessions()
        .await
        .context("failed to re-arm live sessions")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handles = workers.spawn(shutdown_rx);
    info!("Started {} advancement workers", worker_handles.len());

    // Periodic housekeeping
    let cleanup_workers = workers.clone();
    let cleanup_hub = hub.clone();
    let cleanup_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = cleanup_workers.purge_finished().await {
                warn!("Failed to purge finished jobs: {}", e);
            }
            let pruned = cleanup_hub.prune_idle();
            if pruned > 0 {
                info!("Pruned {} idle broadcast channels", pruned);
            }
        }
    });

    let routes = create_routes(session_service, auth_service, hub);

    let ip: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("invalid HOST {}", config.host))?;
    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown((ip, config.port), shutdown_signal())
        .context("failed to bind listener")?;

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;

    info!("Stopping advancement workers...");
    cleanup_task.abort();
    let _ = shutdown_tx.send(true);
    for handle in worker_handles {
        if let Err(e) = handle.await {
            error!("Advancement worker panicked: {}", e);
        }
    }

    info!("Server shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    // Wait for SIGINT (Ctrl+C) or SIGTERM
    #[cfg(unix)]
    {
        let sigint = signal::unix::signal(signal::unix::SignalKind::interrupt());
        let sigterm = signal::unix::signal(signal::unix::SignalKind::terminate());

        match (sigint, sigterm) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {
                        info!("Received SIGINT, shutting down gracefully...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down gracefully...");
                    }
                }
            }
            _ => {
                warn!("Unix signal handlers unavailable, falling back to Ctrl+C");
                if let Err(e) = signal::ctrl_c().await {
                    error!("Failed to listen for ctrl+c: {}", e);
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    }
}
