#![cfg(test)]
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// Fresh in-memory SQLite database with every migration applied.
///
/// A single pooled connection keeps the in-memory database alive and shared
/// for the whole test.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Insert a user straight through the model layer.
pub async fn seed_user(db: &DatabaseConnection, email: &str) -> Result<models::user::Model, anyhow::Error> {
    let new = models::user::NewUser {
        email: email.to_string(),
        first_name: "Test".into(),
        last_name: "User".into(),
        phone_no: "9876543210".into(),
        ..Default::default()
    };
    Ok(models::user::create(db, new).await?)
}
