use chrono::Utc;
use sea_orm::{entity::prelude::*, ConnectionTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::user;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    #[default]
    #[sea_orm(string_value = "web")]
    Web,
    #[sea_orm(string_value = "mobile")]
    Mobile,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub ip: String,
    pub session_type: SessionType,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    user_id: Option<Uuid>,
    ip: &str,
    session_type: SessionType,
) -> Result<Model, ModelError> {
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        ip: Set(ip.to_string()),
        session_type: Set(session_type),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

/// Newest active session of the given type for a user.
pub async fn find_active<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    session_type: SessionType,
) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::SessionType.eq(session_type))
        .filter(Column::Active.eq(true))
        .order_by_desc(Column::CreatedAt)
        .one(db)
        .await?)
}
