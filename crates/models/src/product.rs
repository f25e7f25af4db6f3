use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::product_category;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(unique)]
    pub slug: String,
    /// Minor currency units.
    pub price: i64,
    pub category_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Category }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Category => Entity::belongs_to(product_category::Entity)
                .from(Column::CategoryId)
                .to(product_category::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_price(price: i64) -> Result<(), ModelError> {
    if price <= 0 {
        return Err(ModelError::Validation("price must be greater than zero".into()));
    }
    Ok(())
}

/// Lowercase ASCII slug: alphanumerics kept, every other run collapsed into one `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
