
/// CRUD operations tests for the account and catalog models
pub mod crud_tests;


use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// Fresh in-memory SQLite with every migration applied.
pub(crate) async fn memory_db() -> anyhow::Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}
