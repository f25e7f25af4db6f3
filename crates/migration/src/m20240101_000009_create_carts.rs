//! Create `carts` and `cart_items`.
//!
//! A cart belongs to a user, a session, or both. Items are hard-deleted.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Carts::Table)
                    .if_not_exists()
                    .col(uuid(Carts::Id).primary_key())
                    .col(uuid_null(Carts::UserId))
                    .col(uuid_null(Carts::SessionId))
                    .col(uuid_null(Carts::CouponId))
                    .col(big_integer(Carts::Total).default(0))
                    .col(boolean(Carts::Active).default(true))
                    .col(timestamp_with_time_zone(Carts::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Carts::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cart_user")
                            .from(Carts::Table, Carts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cart_session")
                            .from(Carts::Table, Carts::SessionId)
                            .to(UserSessions::Table, UserSessions::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cart_coupon")
                            .from(Carts::Table, Carts::CouponId)
                            .to(Coupons::Table, Coupons::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CartItems::Table)
                    .if_not_exists()
                    .col(uuid(CartItems::Id).primary_key())
                    .col(uuid(CartItems::CartId).not_null())
                    .col(uuid(CartItems::ProductId).not_null())
                    .col(uuid_null(CartItems::AttrOptionId))
                    .col(integer(CartItems::Quantity).not_null())
                    .col(timestamp_with_time_zone(CartItems::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(CartItems::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cart_item_cart")
                            .from(CartItems::Table, CartItems::CartId)
                            .to(Carts::Table, Carts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cart_item_product")
                            .from(CartItems::Table, CartItems::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cart_item_option")
                            .from(CartItems::Table, CartItems::AttrOptionId)
                            .to(ProductAttributeOptions::Table, ProductAttributeOptions::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CartItems::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Carts::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Carts { Table, Id, UserId, SessionId, CouponId, Total, Active, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum CartItems { Table, Id, CartId, ProductId, AttrOptionId, Quantity, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Users { Table, Id }

#[derive(DeriveIden)]
enum UserSessions { Table, Id }

#[derive(DeriveIden)]
enum Coupons { Table, Id }

#[derive(DeriveIden)]
enum Products { Table, Id }

#[derive(DeriveIden)]
enum ProductAttributeOptions { Table, Id }
