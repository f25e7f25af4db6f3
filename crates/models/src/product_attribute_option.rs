use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::product_attribute;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_attribute_options")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub attribute_id: Uuid,
    pub name: String,
    pub value: Option<String>,
    /// Added to the product price when this option is selected.
    pub price_change: i64,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Attribute }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Attribute => Entity::belongs_to(product_attribute::Entity)
                .from(Column::AttributeId)
                .to(product_attribute::Column::Id)
                .into(),
        }
    }
}

impl Related<product_attribute::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attribute.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_price_change(price_change: i64) -> Result<(), ModelError> {
    if price_change < 0 {
        return Err(ModelError::Validation("price_change must not be negative".into()));
    }
    Ok(())
}
