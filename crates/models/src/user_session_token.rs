use chrono::Utc;
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::user_session;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_session_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub session_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub refresh_token: String,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Session }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Session => Entity::belongs_to(user_session::Entity)
                .from(Column::SessionId)
                .to(user_session::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create<C: ConnectionTrait>(db: &C, session_id: Uuid, refresh_token: &str) -> Result<Model, ModelError> {
    if refresh_token.is_empty() {
        return Err(ModelError::Validation("refresh token required".into()));
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        session_id: Set(session_id),
        refresh_token: Set(refresh_token.to_string()),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn count_active<C: ConnectionTrait>(db: &C, session_id: Uuid) -> Result<u64, ModelError> {
    Ok(Entity::find()
        .filter(Column::SessionId.eq(session_id))
        .filter(Column::Active.eq(true))
        .count(db)
        .await?)
}
