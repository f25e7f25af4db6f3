use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{cart, order_item, order_receiver, user};

/// Shipping lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "placed")]
    Placed,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Placed, Shipped) | (Shipped, Delivered) | (Placed, Cancelled) | (Shipped, Cancelled)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "initiated")]
    Initiated,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl PaymentStatus {
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Initiated) | (Failed, Initiated) | (Initiated, Paid) | (Initiated, Failed)
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(unique)]
    pub cart_id: Uuid,
    pub order_receiver_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    /// Incremented each time a charge is started; part of the idempotency key.
    pub payment_attempts: i32,
    pub shipping_cost: i64,
    pub total: i64,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    User,
    Cart,
    Receiver,
    Items,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
            Relation::Cart => Entity::belongs_to(cart::Entity)
                .from(Column::CartId)
                .to(cart::Column::Id)
                .into(),
            Relation::Receiver => Entity::belongs_to(order_receiver::Entity)
                .from(Column::OrderReceiverId)
                .to(order_receiver::Column::Id)
                .into(),
            Relation::Items => Entity::has_many(order_item::Entity).into(),
        }
    }
}

impl Related<order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_transitions() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Initiated));
        assert!(Failed.can_transition_to(Initiated));
        assert!(Initiated.can_transition_to(Paid));
        assert!(Initiated.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Initiated));
        assert!(!Paid.can_transition_to(Failed));
    }

    #[test]
    fn shipping_transitions() {
        use OrderStatus::*;
        assert!(Placed.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Placed.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Placed.can_transition_to(Delivered));
        assert!(!Cancelled.can_transition_to(Placed));
    }
}
