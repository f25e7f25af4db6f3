use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{coupon, user, user_session};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "carts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub coupon_id: Option<Uuid>,
    /// Recomputed after every mutation; never negative.
    pub total: i64,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    User,
    Session,
    Coupon,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
            Relation::Session => Entity::belongs_to(user_session::Entity)
                .from(Column::SessionId)
                .to(user_session::Column::Id)
                .into(),
            Relation::Coupon => Entity::belongs_to(coupon::Entity)
                .from(Column::CouponId)
                .to(coupon::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
