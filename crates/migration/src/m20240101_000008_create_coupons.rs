//! Create `coupons` and the `coupon_products` mapping.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Coupons::Table)
                    .if_not_exists()
                    .col(uuid(Coupons::Id).primary_key())
                    .col(string_len(Coupons::Code, 64).unique_key().not_null())
                    .col(string_len(Coupons::CouponType, 16).not_null())
                    .col(big_integer(Coupons::Value).not_null())
                    .col(big_integer_null(Coupons::MaxValue))
                    .col(timestamp_with_time_zone(Coupons::StartAt).not_null())
                    .col(timestamp_with_time_zone(Coupons::ExpireAt).not_null())
                    .col(boolean(Coupons::Active).default(true))
                    .col(timestamp_with_time_zone(Coupons::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Coupons::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CouponProducts::Table)
                    .if_not_exists()
                    .col(uuid(CouponProducts::CouponId).not_null())
                    .col(uuid(CouponProducts::ProductId).not_null())
                    .primary_key(
                        Index::create()
                            .col(CouponProducts::CouponId)
                            .col(CouponProducts::ProductId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_coupon_products_coupon")
                            .from(CouponProducts::Table, CouponProducts::CouponId)
                            .to(Coupons::Table, Coupons::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_coupon_products_product")
                            .from(CouponProducts::Table, CouponProducts::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CouponProducts::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Coupons::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Coupons { Table, Id, Code, CouponType, Value, MaxValue, StartAt, ExpireAt, Active, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum CouponProducts { Table, CouponId, ProductId }

#[derive(DeriveIden)]
enum Products { Table, Id }
