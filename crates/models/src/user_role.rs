use chrono::Utc;
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

pub const ADMIN: &str = "admin";
pub const SHOP_KEEPER: &str = "shop_keeper";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub role: String,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create<C: ConnectionTrait>(db: &C, role: &str) -> Result<Model, ModelError> {
    let role = role.trim();
    if role.is_empty() || role.len() > 64 {
        return Err(ModelError::Validation("role must be 1..=64 characters".into()));
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        role: Set(role.to_string()),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_name<C: ConnectionTrait>(db: &C, role: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Role.eq(role.trim())).one(db).await?)
}
