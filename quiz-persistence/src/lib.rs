pub mod connection;
pub mod entities;
pub mod error;
mod mapping;
pub mod repositories;
pub mod retry;

pub use error::SessionError;

use migration::{Migrator, MigratorTrait};
use sea_orm::{DatabaseConnection, DbErr};

pub struct DatabaseManager {
    connection: DatabaseConnection,
}

impl DatabaseManager {
    pub async fn connect(database_url: &str) -> Result<Self, DbErr> {
        let connection = connection::connect_to_url(database_url).await?;
        Ok(Self { connection })
    }

    /// Connects and brings the schema up to date before handing out the pool.
    pub async fn connect_and_migrate(database_url: &str) -> Result<Self, DbErr> {
        let manager = Self::connect(database_url).await?;
        Migrator::up(&manager.connection, None).await?;
        Ok(manager)
    }

    pub fn get_connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}
