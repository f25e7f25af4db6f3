use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{coupon, product};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupon_products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub coupon_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Coupon,
    Product,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Coupon => Entity::belongs_to(coupon::Entity)
                .from(Column::CouponId)
                .to(coupon::Column::Id)
                .into(),
            Relation::Product => Entity::belongs_to(product::Entity)
                .from(Column::ProductId)
                .to(product::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
