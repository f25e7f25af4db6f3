use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{address, order};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_addresses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub address_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Order,
    Address,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Order => Entity::belongs_to(order::Entity)
                .from(Column::OrderId)
                .to(order::Column::Id)
                .into(),
            Relation::Address => Entity::belongs_to(address::Entity)
                .from(Column::AddressId)
                .to(address::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
