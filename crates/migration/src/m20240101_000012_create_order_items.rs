//! Create `order_items`, the priced lines frozen when an order is placed,
//! and count payment attempts on `orders`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(uuid(OrderItems::Id).primary_key())
                    .col(uuid(OrderItems::OrderId).not_null())
                    .col(uuid(OrderItems::ProductId).not_null())
                    .col(uuid_null(OrderItems::AttrOptionId))
                    .col(string_len(OrderItems::ProductSlug, 255).not_null())
                    .col(string_len(OrderItems::ProductName, 255).not_null())
                    .col(integer(OrderItems::Quantity).not_null())
                    .col(big_integer(OrderItems::UnitPrice).not_null())
                    .col(big_integer(OrderItems::LinePrice).not_null())
                    .col(timestamp_with_time_zone(OrderItems::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_item_order")
                            .from(OrderItems::Table, OrderItems::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Orders::Table)
                    .add_column(integer(Orders::PaymentAttempts).default(0))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(Table::alter().table(Orders::Table).drop_column(Orders::PaymentAttempts).to_owned())
            .await?;
        manager.drop_table(Table::drop().table(OrderItems::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    ProductId,
    AttrOptionId,
    ProductSlug,
    ProductName,
    Quantity,
    UnitPrice,
    LinePrice,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Orders { Table, Id, PaymentAttempts }
