//! Create `users` table.
//!
//! Accounts are deactivated through `active`, never removed.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(uuid(Users::Id).primary_key())
                    .col(string_len(Users::Email, 255).unique_key().not_null())
                    .col(string_len(Users::FirstName, 80).not_null())
                    .col(string_len(Users::LastName, 80).not_null())
                    .col(string_len(Users::PhoneNo, 16).not_null())
                    .col(date_null(Users::Dob))
                    .col(string_len(Users::Gender, 16).not_null())
                    .col(boolean(Users::Active).default(true))
                    .col(timestamp_with_time_zone(Users::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Users::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Users::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Users { Table, Id, Email, FirstName, LastName, PhoneNo, Dob, Gender, Active, CreatedAt, UpdatedAt }
