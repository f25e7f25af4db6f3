//! Create `user_roles` and the `user_role_assignments` join table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserRoles::Table)
                    .if_not_exists()
                    .col(uuid(UserRoles::Id).primary_key())
                    .col(string_len(UserRoles::Role, 64).unique_key().not_null())
                    .col(boolean(UserRoles::Active).default(true))
                    .col(timestamp_with_time_zone(UserRoles::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(UserRoles::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserRoleAssignments::Table)
                    .if_not_exists()
                    .col(uuid(UserRoleAssignments::UserId).not_null())
                    .col(uuid(UserRoleAssignments::RoleId).not_null())
                    .col(timestamp_with_time_zone(UserRoleAssignments::CreatedAt).not_null())
                    .primary_key(
                        Index::create()
                            .col(UserRoleAssignments::UserId)
                            .col(UserRoleAssignments::RoleId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_assignment_user")
                            .from(UserRoleAssignments::Table, UserRoleAssignments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_assignment_role")
                            .from(UserRoleAssignments::Table, UserRoleAssignments::RoleId)
                            .to(UserRoles::Table, UserRoles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserRoleAssignments::Table).to_owned())
            .await?;
        manager.drop_table(Table::drop().table(UserRoles::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum UserRoles { Table, Id, Role, Active, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum UserRoleAssignments { Table, UserId, RoleId, CreatedAt }

#[derive(DeriveIden)]
enum Users { Table, Id }
