use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::{cart, product, product_attribute_option};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub attr_option_id: Option<Uuid>,
    pub quantity: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Cart,
    Product,
    AttrOption,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Cart => Entity::belongs_to(cart::Entity)
                .from(Column::CartId)
                .to(cart::Column::Id)
                .into(),
            Relation::Product => Entity::belongs_to(product::Entity)
                .from(Column::ProductId)
                .to(product::Column::Id)
                .into(),
            Relation::AttrOption => Entity::belongs_to(product_attribute_option::Entity)
                .from(Column::AttrOptionId)
                .to(product_attribute_option::Column::Id)
                .into(),
        }
    }
}

impl Related<product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_quantity(quantity: i32) -> Result<(), ModelError> {
    if quantity <= 0 {
        return Err(ModelError::Validation("quantity must be greater than zero".into()));
    }
    Ok(())
}
