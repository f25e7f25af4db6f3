use chrono::Utc;
use sea_orm::{entity::prelude::*, ConnectionTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_confirmations")]
pub struct Model {
    /// 32 lowercase hex characters, mailed to the user.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: Uuid,
    /// Unix seconds.
    pub expire_at: i64,
    pub confirmed: bool,
    pub created_at: DateTimeWithTimeZone,
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

impl Model {
    pub fn is_expired(&self, now_secs: i64) -> bool {
        now_secs > self.expire_at
    }
}

pub async fn create<C: ConnectionTrait>(db: &C, user_id: Uuid, ttl_secs: i64) -> Result<Model, ModelError> {
    if ttl_secs <= 0 {
        return Err(ModelError::Validation("confirmation ttl must be positive".into()));
    }
    let now = Utc::now();
    let am = ActiveModel {
        id: Set(Uuid::new_v4().simple().to_string()),
        user_id: Set(user_id),
        expire_at: Set(now.timestamp() + ttl_secs),
        confirmed: Set(false),
        created_at: Set(now.into()),
    };
    Ok(am.insert(db).await?)
}

/// The confirmation that expires last is the one that counts.
pub async fn most_recent<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::UserId.eq(user_id))
        .order_by_desc(Column::ExpireAt)
        .one(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_strictly_after_deadline() {
        let m = Model {
            id: "a".repeat(32),
            user_id: Uuid::new_v4(),
            expire_at: 100,
            confirmed: false,
            created_at: Utc::now().into(),
        };
        assert!(!m.is_expired(100));
        assert!(m.is_expired(101));
    }
}
