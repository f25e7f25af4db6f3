//! Create `user_confirmations`; the id is the 32-hex token mailed to the user.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserConfirmations::Table)
                    .if_not_exists()
                    .col(string_len(UserConfirmations::Id, 32).primary_key())
                    .col(uuid(UserConfirmations::UserId).not_null())
                    .col(big_integer(UserConfirmations::ExpireAt).not_null())
                    .col(boolean(UserConfirmations::Confirmed).default(false))
                    .col(timestamp_with_time_zone(UserConfirmations::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_confirmation_user")
                            .from(UserConfirmations::Table, UserConfirmations::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserConfirmations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserConfirmations { Table, Id, UserId, ExpireAt, Confirmed, CreatedAt }

#[derive(DeriveIden)]
enum Users { Table, Id }
