use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::info;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://live_quiz.db?mode=rwc";

pub async fn connect_to_url(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_string());
    options
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(false);

    // SQLite only allows one writer; a single pooled connection turns
    // concurrent write transactions into a queue instead of busy errors.
    if database_url.starts_with("sqlite:") {
        options.max_connections(1);
    }

    info!("Connecting to database");
    Database::connect(options).await
}

pub async fn connect_to_memory_database() -> Result<DatabaseConnection, DbErr> {
    connect_to_url("sqlite::memory:").await
}
