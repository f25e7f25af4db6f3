use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub value: Option<String>,
    /// `None` for top-level categories.
    pub parent_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Parent }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Parent => Entity::belongs_to(Entity)
                .from(Column::ParentId)
                .to(Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    let len = name.trim().chars().count();
    if len == 0 || len > 80 {
        return Err(ModelError::Validation("category name must be 1..=80 characters".into()));
    }
    Ok(())
}
