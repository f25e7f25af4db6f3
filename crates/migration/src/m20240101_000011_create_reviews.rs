//! Create `reviews`; one active review per (product, user) is enforced by the service.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(uuid(Reviews::Id).primary_key())
                    .col(uuid(Reviews::ProductId).not_null())
                    .col(uuid(Reviews::UserId).not_null())
                    .col(small_integer(Reviews::Ratings).not_null())
                    .col(text_null(Reviews::Comments))
                    .col(boolean(Reviews::Active).default(true))
                    .col(timestamp_with_time_zone(Reviews::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Reviews::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_product")
                            .from(Reviews::Table, Reviews::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_user")
                            .from(Reviews::Table, Reviews::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Reviews::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Reviews { Table, Id, ProductId, UserId, Ratings, Comments, Active, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Products { Table, Id }

#[derive(DeriveIden)]
enum Users { Table, Id }
