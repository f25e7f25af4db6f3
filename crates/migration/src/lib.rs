//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_users;
mod m20240101_000002_create_user_credentials;
mod m20240101_000003_create_roles;
mod m20240101_000004_create_confirmations;
mod m20240101_000005_create_sessions;
mod m20240101_000006_create_addresses;
mod m20240101_000007_create_catalog;
mod m20240101_000008_create_coupons;
mod m20240101_000009_create_carts;
mod m20240101_000010_create_orders;
mod m20240101_000011_create_reviews;
mod m20240101_000012_create_order_items;
mod m20240101_000099_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users::Migration),
            Box::new(m20240101_000002_create_user_credentials::Migration),
            Box::new(m20240101_000003_create_roles::Migration),
            Box::new(m20240101_000004_create_confirmations::Migration),
            Box::new(m20240101_000005_create_sessions::Migration),
            Box::new(m20240101_000006_create_addresses::Migration),
            Box::new(m20240101_000007_create_catalog::Migration),
            Box::new(m20240101_000008_create_coupons::Migration),
            Box::new(m20240101_000009_create_carts::Migration),
            Box::new(m20240101_000010_create_orders::Migration),
            Box::new(m20240101_000011_create_reviews::Migration),
            Box::new(m20240101_000012_create_order_items::Migration),
            // Indexes should always be applied last
            Box::new(m20240101_000099_add_indexes::Migration),
        ]
    }
}
