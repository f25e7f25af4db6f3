//! Create `order_receivers`, `orders` and the `order_addresses` join table.
//!
//! `orders.cart_id` is unique: a cart can be checked out once.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderReceivers::Table)
                    .if_not_exists()
                    .col(uuid(OrderReceivers::Id).primary_key())
                    .col(uuid(OrderReceivers::UserId).not_null())
                    .col(string_len(OrderReceivers::FirstName, 80).not_null())
                    .col(string_len(OrderReceivers::LastName, 80).not_null())
                    .col(string_len(OrderReceivers::PhoneNo, 16).not_null())
                    .col(boolean(OrderReceivers::Active).default(true))
                    .col(timestamp_with_time_zone(OrderReceivers::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(OrderReceivers::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_receiver_user")
                            .from(OrderReceivers::Table, OrderReceivers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(uuid(Orders::Id).primary_key())
                    .col(uuid(Orders::UserId).not_null())
                    .col(uuid(Orders::CartId).unique_key().not_null())
                    .col(uuid(Orders::OrderReceiverId).not_null())
                    .col(string_len(Orders::Status, 16).not_null())
                    .col(string_len(Orders::PaymentStatus, 16).not_null())
                    .col(string_len_null(Orders::PaymentReference, 255))
                    .col(big_integer(Orders::ShippingCost).default(0))
                    .col(big_integer(Orders::Total).not_null())
                    .col(boolean(Orders::Active).default(true))
                    .col(timestamp_with_time_zone(Orders::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Orders::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_user")
                            .from(Orders::Table, Orders::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_cart")
                            .from(Orders::Table, Orders::CartId)
                            .to(Carts::Table, Carts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_receiver")
                            .from(Orders::Table, Orders::OrderReceiverId)
                            .to(OrderReceivers::Table, OrderReceivers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderAddresses::Table)
                    .if_not_exists()
                    .col(uuid(OrderAddresses::OrderId).not_null())
                    .col(uuid(OrderAddresses::AddressId).not_null())
                    .primary_key(
                        Index::create()
                            .col(OrderAddresses::OrderId)
                            .col(OrderAddresses::AddressId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_addresses_order")
                            .from(OrderAddresses::Table, OrderAddresses::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_addresses_address")
                            .from(OrderAddresses::Table, OrderAddresses::AddressId)
                            .to(Addresses::Table, Addresses::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(OrderAddresses::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Orders::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(OrderReceivers::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum OrderReceivers { Table, Id, UserId, FirstName, LastName, PhoneNo, Active, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    UserId,
    CartId,
    OrderReceiverId,
    Status,
    PaymentStatus,
    PaymentReference,
    ShippingCost,
    Total,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrderAddresses { Table, OrderId, AddressId }

#[derive(DeriveIden)]
enum Users { Table, Id }

#[derive(DeriveIden)]
enum Carts { Table, Id }

#[derive(DeriveIden)]
enum Addresses { Table, Id }
