use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// (index name, table, columns)
const INDEXES: &[(&str, &str, &[&str])] = &[
    ("idx_session_user_type", "user_sessions", &["user_id", "session_type"]),
    ("idx_session_token_session", "user_session_tokens", &["session_id"]),
    ("idx_confirmation_user", "user_confirmations", &["user_id"]),
    ("idx_address_user", "addresses", &["user_id"]),
    ("idx_category_parent_name", "product_categories", &["parent_id", "name"]),
    ("idx_product_category", "products", &["category_id"]),
    ("idx_attribute_product", "product_attributes", &["product_id"]),
    ("idx_option_attribute", "product_attribute_options", &["attribute_id"]),
    ("idx_image_slug", "product_images", &["product_slug"]),
    ("idx_cart_user", "carts", &["user_id"]),
    ("idx_cart_session", "carts", &["session_id"]),
    ("idx_cart_item_cart", "cart_items", &["cart_id"]),
    ("idx_order_user", "orders", &["user_id"]),
    ("idx_order_item_order", "order_items", &["order_id"]),
    ("idx_receiver_user", "order_receivers", &["user_id"]),
    ("idx_review_product_user", "reviews", &["product_id", "user_id"]),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, cols) in INDEXES {
            let mut index = Index::create();
            index.name(*name).table(Alias::new(*table));
            for col in cols.iter() {
                index.col(Alias::new(*col));
            }
            manager.create_index(index.to_owned()).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, _) in INDEXES.iter().rev() {
            manager
                .drop_index(Index::drop().name(*name).table(Alias::new(*table)).to_owned())
                .await?;
        }
        Ok(())
    }
}
