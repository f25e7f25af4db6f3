//! Create `user_sessions` and their refresh tokens.
//!
//! A session may exist before login (anonymous cart), so `user_id` is nullable.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserSessions::Table)
                    .if_not_exists()
                    .col(uuid(UserSessions::Id).primary_key())
                    .col(uuid_null(UserSessions::UserId))
                    .col(string_len(UserSessions::Ip, 64).not_null())
                    .col(string_len(UserSessions::SessionType, 16).not_null())
                    .col(boolean(UserSessions::Active).default(true))
                    .col(timestamp_with_time_zone(UserSessions::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(UserSessions::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_user")
                            .from(UserSessions::Table, UserSessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserSessionTokens::Table)
                    .if_not_exists()
                    .col(uuid(UserSessionTokens::Id).primary_key())
                    .col(uuid(UserSessionTokens::SessionId).not_null())
                    .col(text(UserSessionTokens::RefreshToken).not_null())
                    .col(boolean(UserSessionTokens::Active).default(true))
                    .col(timestamp_with_time_zone(UserSessionTokens::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(UserSessionTokens::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_token_session")
                            .from(UserSessionTokens::Table, UserSessionTokens::SessionId)
                            .to(UserSessions::Table, UserSessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserSessionTokens::Table).to_owned())
            .await?;
        manager.drop_table(Table::drop().table(UserSessions::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum UserSessions { Table, Id, UserId, Ip, SessionType, Active, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum UserSessionTokens { Table, Id, SessionId, RefreshToken, Active, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Users { Table, Id }
