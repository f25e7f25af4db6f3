//! Create `addresses` owned by users.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Addresses::Table)
                    .if_not_exists()
                    .col(uuid(Addresses::Id).primary_key())
                    .col(uuid(Addresses::UserId).not_null())
                    .col(string_len(Addresses::AddressType, 16).not_null())
                    .col(string_len(Addresses::AddressLine1, 255).not_null())
                    .col(string_len_null(Addresses::AddressLine2, 255))
                    .col(string_len(Addresses::City, 80).not_null())
                    .col(string_len(Addresses::State, 80).not_null())
                    .col(string_len(Addresses::Country, 80).not_null())
                    .col(boolean(Addresses::Active).default(true))
                    .col(timestamp_with_time_zone(Addresses::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Addresses::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_address_user")
                            .from(Addresses::Table, Addresses::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Addresses::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Addresses {
    Table,
    Id,
    UserId,
    AddressType,
    #[sea_orm(iden = "address_line_1")]
    AddressLine1,
    #[sea_orm(iden = "address_line_2")]
    AddressLine2,
    City,
    State,
    Country,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users { Table, Id }
