//! Create the catalog tables: categories, products, attributes, attribute
//! options and product images.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductCategories::Table)
                    .if_not_exists()
                    .col(uuid(ProductCategories::Id).primary_key())
                    .col(string_len(ProductCategories::Name, 80).not_null())
                    .col(string_len_null(ProductCategories::Value, 255))
                    .col(uuid_null(ProductCategories::ParentId))
                    .col(boolean(ProductCategories::Active).default(true))
                    .col(timestamp_with_time_zone(ProductCategories::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(ProductCategories::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_parent")
                            .from(ProductCategories::Table, ProductCategories::ParentId)
                            .to(ProductCategories::Table, ProductCategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(uuid(Products::Id).primary_key())
                    .col(string_len(Products::Name, 255).not_null())
                    .col(text_null(Products::Description))
                    .col(string_len(Products::Slug, 255).unique_key().not_null())
                    .col(big_integer(Products::Price).not_null())
                    .col(uuid_null(Products::CategoryId))
                    .col(boolean(Products::Active).default(true))
                    .col(timestamp_with_time_zone(Products::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Products::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_category")
                            .from(Products::Table, Products::CategoryId)
                            .to(ProductCategories::Table, ProductCategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductAttributes::Table)
                    .if_not_exists()
                    .col(uuid(ProductAttributes::Id).primary_key())
                    .col(uuid(ProductAttributes::ProductId).not_null())
                    .col(string_len(ProductAttributes::Name, 80).not_null())
                    .col(string_len_null(ProductAttributes::Value, 255))
                    .col(boolean(ProductAttributes::Active).default(true))
                    .col(timestamp_with_time_zone(ProductAttributes::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(ProductAttributes::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attribute_product")
                            .from(ProductAttributes::Table, ProductAttributes::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductAttributeOptions::Table)
                    .if_not_exists()
                    .col(uuid(ProductAttributeOptions::Id).primary_key())
                    .col(uuid(ProductAttributeOptions::AttributeId).not_null())
                    .col(string_len(ProductAttributeOptions::Name, 80).not_null())
                    .col(string_len_null(ProductAttributeOptions::Value, 255))
                    .col(big_integer(ProductAttributeOptions::PriceChange).default(0))
                    .col(boolean(ProductAttributeOptions::Active).default(true))
                    .col(timestamp_with_time_zone(ProductAttributeOptions::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(ProductAttributeOptions::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_option_attribute")
                            .from(ProductAttributeOptions::Table, ProductAttributeOptions::AttributeId)
                            .to(ProductAttributes::Table, ProductAttributes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductImages::Table)
                    .if_not_exists()
                    .col(uuid(ProductImages::Id).primary_key())
                    .col(string_len(ProductImages::ProductSlug, 255).not_null())
                    .col(string_len(ProductImages::ImageName, 255).not_null())
                    .col(boolean(ProductImages::Active).default(true))
                    .col(timestamp_with_time_zone(ProductImages::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(ProductImages::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ProductImages::Table).to_owned()).await?;
        manager
            .drop_table(Table::drop().table(ProductAttributeOptions::Table).to_owned())
            .await?;
        manager.drop_table(Table::drop().table(ProductAttributes::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Products::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ProductCategories::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ProductCategories { Table, Id, Name, Value, ParentId, Active, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Products { Table, Id, Name, Description, Slug, Price, CategoryId, Active, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum ProductAttributes { Table, Id, ProductId, Name, Value, Active, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum ProductAttributeOptions { Table, Id, AttributeId, Name, Value, PriceChange, Active, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum ProductImages { Table, Id, ProductSlug, ImageName, Active, CreatedAt, UpdatedAt }
